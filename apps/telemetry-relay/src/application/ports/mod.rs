//! Port Interfaces
//!
//! Contracts the relay services depend on, implemented by infrastructure
//! adapters.
//!
//! ## Driven Ports (Outbound)
//!
//! - `BrokerPublisher`: non-blocking publish onto the MQTT broker
//! - `Notifier`: one-shot alert notification (SNS)
//! - `PushPublisher`: fan-out of named events to live clients

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::alert::AlertRecord;

// =============================================================================
// Broker
// =============================================================================

/// Broker publish failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PublishError {
    /// The broker client refused the request (queue full or closed).
    #[error("publish to {topic} rejected: {reason}")]
    Rejected {
        /// Destination topic.
        topic: String,
        /// Client error text.
        reason: String,
    },
}

/// Publishes payloads onto the broker.
///
/// Implementations must not wait for broker acknowledgement.
#[cfg_attr(test, mockall::automock)]
pub trait BrokerPublisher: Send + Sync {
    /// Enqueue a publish.
    ///
    /// # Errors
    ///
    /// Returns `PublishError` if the request could not be enqueued.
    fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError>;
}

// =============================================================================
// Notification
// =============================================================================

/// Notification failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NotifyError {
    /// The notification service rejected or failed the request.
    #[error("notification service error: {0}")]
    Service(String),
}

/// Sends a notification for a fired alert.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification. Called once per alert; never retried.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if delivery failed.
    async fn notify(&self, record: &AlertRecord) -> Result<(), NotifyError>;
}

// =============================================================================
// Push Channel
// =============================================================================

/// Events pushed to live clients.
///
/// Serialized as `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    /// Fan status changed.
    FanStatus {
        /// Lower-cased status.
        status: String,
    },
    /// Light status changed.
    LightStatus {
        /// Lower-cased status.
        status: String,
    },
    /// An alert fired.
    AlertBlink {
        /// Alert topic.
        topic: String,
        /// Always `on`.
        status: String,
    },
    /// Any broker message, verbatim.
    MqttMessage {
        /// Broker topic.
        topic: String,
        /// Payload text.
        message: String,
    },
}

impl PushEvent {
    /// Event name on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FanStatus { .. } => "fan_status",
            Self::LightStatus { .. } => "light_status",
            Self::AlertBlink { .. } => "alert_blink",
            Self::MqttMessage { .. } => "mqtt_message",
        }
    }
}

/// Fans events out to every connected client.
#[cfg_attr(test, mockall::automock)]
pub trait PushPublisher: Send + Sync {
    /// Broadcast an event. Returns the number of clients it reached.
    fn broadcast(&self, event: PushEvent) -> usize;
}
