//! Domain Layer - Telemetry types and relay rules.
//!
//! This layer holds the topic routing table, the reading store, the alert
//! log and the control-key mapping. Nothing here touches the network; all
//! types are plain Rust with serialization support.

/// Broker topics and their routing.
pub mod topic;

/// Payload parsing with raw-text fallback.
pub mod payload;

/// Latest-value store for sensor and status readings.
pub mod reading;

/// Alert records and the in-memory alert log.
pub mod alert;

/// Control command keys and their outbound topics.
pub mod control;

/// Shared relay state (readings + alerts behind one lock).
pub mod state;
