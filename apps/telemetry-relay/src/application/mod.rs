//! Application Layer - Relay use cases and port definitions.
//!
//! This layer contains the message handler, alert evaluator and control
//! intake, plus the port interfaces they use to reach the broker, the
//! notification service and live clients.

/// Port interfaces for external systems (broker, notifier, push channel).
pub mod ports;

/// Application services for message handling and control intake.
pub mod services;
