//! MQTT Broker Adapter
//!
//! - `client`: event-loop driver and publish handle
//! - `reconnect`: poll backoff after connection failures
//! - `state`: connection state tracker for probes
//! - `tls`: mutual-TLS session options

pub mod client;
pub mod reconnect;
pub mod state;
pub mod tls;

pub use client::{BrokerClient, BrokerConnection, BrokerError, BrokerEvent, connect};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use state::{BrokerStatus, BrokerStatusSnapshot, ConnectionState};
