//! Relay State
//!
//! The reading store and the alert log live together behind a single
//! mutex. Broker messages are applied by one consumer task; HTTP handlers
//! take the same lock to read or clear alerts. The lock is never held
//! across an `.await`.

use std::sync::Arc;

use parking_lot::Mutex;

use super::alert::{AlertLog, AlertRecord};
use super::reading::ReadingStore;

/// Mutable relay state.
#[derive(Debug, Default)]
pub struct RelayState {
    /// Latest reading per field.
    pub readings: ReadingStore,
    /// Fired alerts since the last clear.
    pub alerts: AlertLog,
}

impl RelayState {
    /// Create empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Shared handle to the relay state.
pub type SharedRelayState = Arc<Mutex<RelayState>>;

/// Create a fresh shared state handle.
#[must_use]
pub fn shared() -> SharedRelayState {
    Arc::new(Mutex::new(RelayState::new()))
}

/// Snapshot of the alert log.
#[must_use]
pub fn alert_snapshot(state: &SharedRelayState) -> Vec<AlertRecord> {
    state.lock().alerts.records().to_vec()
}

/// Snapshot of the reading store.
#[must_use]
pub fn reading_snapshot(state: &SharedRelayState) -> ReadingStore {
    state.lock().readings.clone()
}
