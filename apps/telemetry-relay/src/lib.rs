#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Telemetry Relay - MQTT to Browser Bridge
//!
//! Subscribes to sensor, alert and usage topics on an MQTT broker, keeps the
//! latest reading per field, records fired alerts, notifies SNS and pushes
//! every event to connected WebSocket clients. Clients send control commands
//! back, which are republished to the broker.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Topics, payloads, readings, alerts and control keys
//!   - `topic`: Inbound topic table and routing
//!   - `reading`: Latest-value store
//!   - `alert`: Alert records and log
//!   - `control`: Control key to broker topic mapping
//!   - `state`: Shared relay state
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Broker publisher, notifier and push publisher interfaces
//!   - `services`: Message handling, alert evaluation, control intake
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `mqtt`: `rumqttc` event loop, TLS and backoff
//!   - `push`: Broadcast hub and WebSocket sessions
//!   - `notification`: SNS publisher
//!   - `http`: REST API, push upgrade and probes
//!   - `config`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//!                    ┌──────────────┐     ┌─────────────┐
//! MQTT broker ──────►│ RelayService │────►│   PushHub   │──► WS clients
//!      ▲             └──────┬───────┘     └─────────────┘        │
//!      │                    ├──► RelayState ◄── GET /alerts       │
//!      │                    └──► SNS                              │
//!      └──────────── ControlIntake ◄──── control_update ─────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Relay types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::alert::{AlertLog, AlertRecord};
pub use domain::reading::{ReadingField, ReadingStore, ReadingValue};
pub use domain::state::{RelayState, SharedRelayState};
pub use domain::topic::InboundTopic;

// Application services and ports
pub use application::ports::{BrokerPublisher, Notifier, PushEvent, PushPublisher};
pub use application::services::{ControlIntake, ControlReport, MessageOutcome, RelayService};

// Infrastructure config
pub use infrastructure::config::{ConfigError, RelayConfig};

// HTTP server
pub use infrastructure::http::{ApiServer, ApiState, HttpServerError};

// Push hub
pub use infrastructure::push::{PushHub, SharedPushHub};

// Broker
pub use infrastructure::mqtt::{BrokerError, BrokerEvent, BrokerStatus};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
