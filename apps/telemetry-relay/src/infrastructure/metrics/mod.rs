//! Prometheus Metrics Module
//!
//! Exposes relay metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Messages**: broker messages received, readings updated, alerts fired
//! - **Outbound**: notifications, control publishes, push events
//! - **Connections**: broker link state, reconnects, live push clients
//! - **Latency**: per-message handling time
//!
//! Recording is a no-op until [`init_metrics`] installs the recorder.
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the HTTP server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::domain::reading::ReadingField;
use crate::domain::topic::InboundTopic;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Repeated calls return the handle created by the first one.
///
/// # Panics
///
/// Panics if another global recorder was installed first.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "telemetry_relay_messages_received_total",
        "Broker messages received by topic"
    );
    describe_counter!(
        "telemetry_relay_readings_updated_total",
        "Latest-reading updates by field"
    );
    describe_counter!(
        "telemetry_relay_alerts_total",
        "Alerts recorded by alert topic"
    );
    describe_counter!(
        "telemetry_relay_notifications_total",
        "Alert notifications by outcome"
    );
    describe_counter!(
        "telemetry_relay_publishes_total",
        "Control publishes by topic and outcome"
    );
    describe_counter!(
        "telemetry_relay_push_events_total",
        "Events broadcast to push clients by event name"
    );
    describe_counter!(
        "telemetry_relay_broker_reconnects_total",
        "Broker reconnection attempts"
    );

    describe_gauge!(
        "telemetry_relay_push_clients",
        "Number of connected push clients"
    );
    describe_gauge!(
        "telemetry_relay_broker_connected",
        "1 when the broker session is up, 0 otherwise"
    );

    describe_histogram!(
        "telemetry_relay_message_processing_seconds",
        "Time to handle one broker message"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Outcome label for alert notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Delivered to the notification service.
    Sent,
    /// Delivery failed or could not be scheduled.
    Failed,
}

impl NotificationOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

const fn outcome_label(ok: bool) -> &'static str {
    if ok { "ok" } else { "error" }
}

/// Record a message received from the broker. Unknown topics count as `other`.
pub fn record_message_received(topic: Option<InboundTopic>) {
    let label = topic.map_or("other", InboundTopic::as_str);
    counter!(
        "telemetry_relay_messages_received_total",
        "topic" => label
    )
    .increment(1);
}

/// Record a latest-reading update.
pub fn record_reading_updated(field: ReadingField) {
    counter!(
        "telemetry_relay_readings_updated_total",
        "field" => field.as_str()
    )
    .increment(1);
}

/// Record a fired alert.
pub fn record_alert(topic: InboundTopic) {
    counter!(
        "telemetry_relay_alerts_total",
        "topic" => topic.as_str()
    )
    .increment(1);
}

/// Record a notification attempt.
pub fn record_notification(outcome: NotificationOutcome) {
    counter!(
        "telemetry_relay_notifications_total",
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Record a control publish.
pub fn record_publish(topic: &'static str, ok: bool) {
    counter!(
        "telemetry_relay_publishes_total",
        "topic" => topic,
        "outcome" => outcome_label(ok)
    )
    .increment(1);
}

/// Record a push broadcast and how many clients it reached.
pub fn record_push_event(event: &'static str, receivers: usize) {
    counter!(
        "telemetry_relay_push_events_total",
        "event" => event
    )
    .increment(1);
    set_push_clients(receivers);
}

/// Update the live push client count.
#[allow(clippy::cast_precision_loss)]
pub fn set_push_clients(count: usize) {
    gauge!("telemetry_relay_push_clients").set(count as f64);
}

/// Update the broker link state.
pub fn set_broker_connected(connected: bool) {
    gauge!("telemetry_relay_broker_connected").set(if connected { 1.0 } else { 0.0 });
}

/// Record a broker reconnection attempt.
pub fn record_reconnect() {
    counter!("telemetry_relay_broker_reconnects_total").increment(1);
}

/// Record message processing duration.
pub fn record_processing_duration(duration: Duration) {
    histogram!("telemetry_relay_message_processing_seconds").record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_outcome_as_str() {
        assert_eq!(NotificationOutcome::Sent.as_str(), "sent");
        assert_eq!(NotificationOutcome::Failed.as_str(), "failed");
    }

    #[test]
    fn publish_outcome_labels() {
        assert_eq!(outcome_label(true), "ok");
        assert_eq!(outcome_label(false), "error");
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_message_received(None);
        record_message_received(Some(InboundTopic::ALL[0]));
        record_reconnect();
        set_broker_connected(true);
        record_processing_duration(Duration::from_millis(3));
    }
}
