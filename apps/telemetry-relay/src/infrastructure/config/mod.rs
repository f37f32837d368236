//! Configuration Module
//!
//! Configuration loading for the relay service.

mod settings;

pub use settings::{
    AwsCredentials, BrokerSettings, ConfigError, DEFAULT_ALERT_LOCATION,
    DEFAULT_PUSH_CHANNEL_CAPACITY, NotificationSettings, ReconnectSettings, RelayConfig,
    ServerSettings, TlsMaterial,
};
