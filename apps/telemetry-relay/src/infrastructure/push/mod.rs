//! Push Channel
//!
//! Fans relay events out to live WebSocket clients over a tokio broadcast
//! channel and takes `control_update` commands back.
//!
//! # Architecture
//!
//! One `PushHub` holds the broadcast sender. Every socket subscribes on
//! connect, so clients only see events sent after they joined. A client that
//! falls more than the channel capacity behind skips the missed events.

mod socket;

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::application::ports::{PushEvent, PushPublisher};
use crate::infrastructure::config::DEFAULT_PUSH_CHANNEL_CAPACITY;

pub use socket::handle_socket;

// =============================================================================
// Inbound Events
// =============================================================================

/// Events accepted from live clients.
///
/// Wire format mirrors outbound events: `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Device control command.
    ControlUpdate(Map<String, Value>),
}

impl ClientEvent {
    /// Parse a text frame.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for unknown events or malformed frames.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

// =============================================================================
// Push Hub
// =============================================================================

/// Broadcast hub for push events.
#[derive(Debug)]
pub struct PushHub {
    tx: broadcast::Sender<PushEvent>,
}

/// Shared push hub.
pub type SharedPushHub = Arc<PushHub>;

impl PushHub {
    /// Create a hub with the given buffer size (at least 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity.max(1)).0,
        }
    }

    /// Create a hub with the default buffer size.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_PUSH_CHANNEL_CAPACITY)
    }

    /// Get a new receiver.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.tx.subscribe()
    }

    /// Number of connected clients.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for PushHub {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PushPublisher for PushHub {
    fn broadcast(&self, event: PushEvent) -> usize {
        // `send` only fails when nobody is listening.
        self.tx.send(event).unwrap_or(0)
    }
}
