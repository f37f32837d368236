//! Control Intake
//!
//! Republishes control commands from live clients onto the broker. Publish
//! failures are logged and counted; the sender never hears about them.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::application::ports::BrokerPublisher;
use crate::domain::control;
use crate::infrastructure::metrics;

/// Result of one control command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlReport {
    /// Publishes enqueued.
    pub published: usize,
    /// Publishes the broker client rejected.
    pub failed: usize,
    /// Keys that were not recognized.
    pub ignored: Vec<String>,
}

/// Turns client commands into broker publishes.
pub struct ControlIntake {
    publisher: Arc<dyn BrokerPublisher>,
}

impl ControlIntake {
    /// Create a control intake.
    #[must_use]
    pub fn new(publisher: Arc<dyn BrokerPublisher>) -> Self {
        Self { publisher }
    }

    /// Publish every recognized key in `command`.
    pub fn handle_command(&self, command: &Map<String, Value>) -> ControlReport {
        let mut report = ControlReport {
            ignored: control::unrecognized_keys(command)
                .into_iter()
                .map(str::to_string)
                .collect(),
            ..ControlReport::default()
        };

        if !report.ignored.is_empty() {
            tracing::debug!(keys = ?report.ignored, "Ignoring unrecognized control keys");
        }

        for publish in control::plan_publishes(command) {
            let topic = publish.topic();
            match self.publisher.publish(topic, &publish.payload) {
                Ok(()) => {
                    report.published += 1;
                    metrics::record_publish(topic, true);
                    tracing::info!(topic, payload = %publish.payload, "Control command published");
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::record_publish(topic, false);
                    tracing::warn!(topic, error = %e, "Control publish failed");
                }
            }
        }

        report
    }
}
