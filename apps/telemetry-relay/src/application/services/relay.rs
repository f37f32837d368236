//! Message Handler and Alert Evaluator
//!
//! Applies one broker message to the relay state and emits the matching
//! push events. Called from a single consumer task, so readings and alerts
//! have exactly one writer.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local, TimeZone};

use crate::application::ports::{Notifier, PushEvent, PushPublisher};
use crate::domain::alert::{self, AlertRecord};
use crate::domain::payload::Payload;
use crate::domain::reading::{ReadingField, ReadingValue};
use crate::domain::state::SharedRelayState;
use crate::domain::topic::{InboundTopic, Route, StatusEvent};
use crate::infrastructure::metrics::{self, NotificationOutcome};

/// What handling a message did. Returned for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// A reading was overwritten.
    ReadingUpdated {
        /// Field written.
        field: ReadingField,
        /// New value.
        value: ReadingValue,
    },
    /// A reading topic carried no usable value; the store is unchanged.
    ReadingSkipped {
        /// Field that was not written.
        field: ReadingField,
    },
    /// An alert fired and was recorded.
    AlertRecorded(AlertRecord),
    /// An alert topic resolved to a status other than `on`.
    AlertInactive {
        /// The derived status.
        status: String,
    },
    /// The topic is not one the relay routes; only forwarded.
    Unrouted,
}

/// Handles broker messages.
pub struct RelayService {
    state: SharedRelayState,
    push: Arc<dyn PushPublisher>,
    notifier: Arc<dyn Notifier>,
    location: String,
}

impl RelayService {
    /// Create a relay service.
    #[must_use]
    pub fn new(
        state: SharedRelayState,
        push: Arc<dyn PushPublisher>,
        notifier: Arc<dyn Notifier>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            state,
            push,
            notifier,
            location: location.into(),
        }
    }

    /// Shared state handle.
    #[must_use]
    pub const fn state(&self) -> &SharedRelayState {
        &self.state
    }

    /// Handle a message stamped with the host's local time.
    pub fn handle_message(&self, topic: &str, payload: &str) -> MessageOutcome {
        self.handle_message_at(topic, payload, &Local::now())
    }

    /// Handle a message with an explicit timestamp for alert records.
    pub fn handle_message_at<Tz>(
        &self,
        topic: &str,
        raw: &str,
        now: &DateTime<Tz>,
    ) -> MessageOutcome
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let started = Instant::now();
        let inbound = InboundTopic::parse(topic);
        metrics::record_message_received(inbound);

        let payload = Payload::parse(raw);
        if !payload.is_structured() {
            tracing::warn!(topic, payload = %payload.raw(), "Payload is not JSON, using raw text");
        }

        let outcome = match inbound {
            Some(inbound) => match inbound.route() {
                Route::Reading { field, push } => self.apply_reading(field, push, &payload),
                Route::Alert { sensor } => self.evaluate_alert(inbound, sensor, &payload, now),
            },
            None => {
                tracing::debug!(topic, "Unrouted topic, forwarding only");
                MessageOutcome::Unrouted
            }
        };

        self.emit(PushEvent::MqttMessage {
            topic: topic.to_string(),
            message: raw.to_string(),
        });

        metrics::record_processing_duration(started.elapsed());
        outcome
    }

    fn apply_reading(
        &self,
        field: ReadingField,
        push: Option<StatusEvent>,
        payload: &Payload,
    ) -> MessageOutcome {
        let Some(value) = field.extract(payload) else {
            tracing::debug!(%field, "No usable value in payload, reading unchanged");
            return MessageOutcome::ReadingSkipped { field };
        };

        self.state.lock().readings.set(field, value.clone());
        metrics::record_reading_updated(field);
        tracing::debug!(%field, %value, "Reading updated");

        if let Some(event) = push {
            let status = value.to_string();
            self.emit(match event {
                StatusEvent::Fan => PushEvent::FanStatus { status },
                StatusEvent::Light => PushEvent::LightStatus { status },
            });
        }

        MessageOutcome::ReadingUpdated { field, value }
    }

    fn evaluate_alert<Tz>(
        &self,
        topic: InboundTopic,
        sensor: ReadingField,
        payload: &Payload,
        now: &DateTime<Tz>,
    ) -> MessageOutcome
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let status = payload.status();
        if !alert::is_active(&status) {
            tracing::info!(%topic, status = %status, "Alert not active, nothing recorded");
            return MessageOutcome::AlertInactive { status };
        }

        let record = {
            let mut state = self.state.lock();
            let value = state
                .readings
                .get(sensor)
                .cloned()
                .unwrap_or_else(|| ReadingValue::Text(payload.raw().to_string()));
            let record = AlertRecord::new(topic, value, now, self.location.clone());
            state.alerts.push(record.clone());
            record
        };

        metrics::record_alert(topic);
        tracing::info!(
            %topic,
            value = %record.value(),
            date = record.date(),
            time = record.time(),
            location = record.location(),
            "Alert recorded"
        );

        self.dispatch_notification(record.clone());
        self.emit(PushEvent::AlertBlink {
            topic: topic.as_str().to_string(),
            status: alert::ACTIVE_STATUS.to_string(),
        });

        MessageOutcome::AlertRecorded(record)
    }

    /// Fire-and-forget notification. Failures are logged and dropped.
    fn dispatch_notification(&self, record: AlertRecord) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(topic = record.topic(), "No runtime, notification dropped");
            metrics::record_notification(NotificationOutcome::Failed);
            return;
        };

        let notifier = Arc::clone(&self.notifier);
        runtime.spawn(async move {
            match notifier.notify(&record).await {
                Ok(()) => {
                    metrics::record_notification(NotificationOutcome::Sent);
                    tracing::debug!(topic = record.topic(), "Notification sent");
                }
                Err(e) => {
                    metrics::record_notification(NotificationOutcome::Failed);
                    tracing::warn!(topic = record.topic(), error = %e, "Notification failed");
                }
            }
        });
    }

    fn emit(&self, event: PushEvent) {
        let name = event.name();
        let receivers = self.push.broadcast(event);
        metrics::record_push_event(name, receivers);
    }
}
