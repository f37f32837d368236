//! Broker Connection State Tracker
//!
//! Shared view of the broker session for health and readiness probes.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Broker session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not yet connected.
    Disconnected,
    /// Session established and subscriptions requested.
    Connected,
    /// Waiting before the next poll after a failure.
    Reconnecting,
}

/// Point-in-time copy of [`BrokerStatus`].
#[derive(Debug, Clone, Serialize)]
pub struct BrokerStatusSnapshot {
    /// Current state.
    pub state: ConnectionState,
    /// Last successful connect.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Last connection error.
    pub last_error: Option<String>,
    /// Failed polls since the last connect.
    pub reconnect_attempts: u32,
    /// Messages received since startup.
    pub messages_received: u64,
}

/// Tracks the broker session.
#[derive(Debug)]
pub struct BrokerStatus {
    state: parking_lot::RwLock<ConnectionState>,
    last_connected_at: parking_lot::RwLock<Option<DateTime<Utc>>>,
    last_error: parking_lot::RwLock<Option<String>>,
    reconnect_attempts: AtomicU32,
    messages_received: AtomicU64,
}

impl Default for BrokerStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerStatus {
    /// Create a tracker in the disconnected state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: parking_lot::RwLock::new(ConnectionState::Disconnected),
            last_connected_at: parking_lot::RwLock::new(None),
            last_error: parking_lot::RwLock::new(None),
            reconnect_attempts: AtomicU32::new(0),
            messages_received: AtomicU64::new(0),
        }
    }

    /// Mark the session connected.
    pub fn mark_connected(&self) {
        *self.state.write() = ConnectionState::Connected;
        *self.last_connected_at.write() = Some(Utc::now());
        *self.last_error.write() = None;
        self.reconnect_attempts.store(0, Ordering::Relaxed);
    }

    /// Mark the session lost.
    pub fn mark_disconnected(&self) {
        *self.state.write() = ConnectionState::Disconnected;
    }

    /// Record a pending reconnect.
    pub fn mark_reconnecting(&self, attempt: u32) {
        *self.state.write() = ConnectionState::Reconnecting;
        self.reconnect_attempts.store(attempt, Ordering::Relaxed);
    }

    /// Record a connection error.
    pub fn set_error(&self, message: String) {
        *self.last_error.write() = Some(message);
    }

    /// Count a received message.
    pub fn increment_messages(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Whether the session is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Copy the current status.
    #[must_use]
    pub fn snapshot(&self) -> BrokerStatusSnapshot {
        BrokerStatusSnapshot {
            state: self.state(),
            last_connected_at: *self.last_connected_at.read(),
            last_error: self.last_error.read().clone(),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
        }
    }
}
