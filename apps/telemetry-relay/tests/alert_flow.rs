//! Alert Flow Integration Tests
//!
//! Drives broker messages through the relay service with a real push hub
//! and a recording notifier.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{FixedOffset, TimeZone};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;

use telemetry_relay::application::ports::NotifyError;
use telemetry_relay::domain::state;
use telemetry_relay::{
    AlertRecord, MessageOutcome, Notifier, PushEvent, PushHub, ReadingField, ReadingValue,
    RelayService, SharedRelayState,
};

/// Forwards every notified record to a channel.
struct RecordingNotifier {
    tx: mpsc::UnboundedSender<AlertRecord>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, record: &AlertRecord) -> Result<(), NotifyError> {
        self.tx.send(record.clone()).unwrap();
        Ok(())
    }
}

/// Always fails.
struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _record: &AlertRecord) -> Result<(), NotifyError> {
        Err(NotifyError::Service("throttled".into()))
    }
}

struct Harness {
    relay: RelayService,
    state: SharedRelayState,
    events: broadcast::Receiver<PushEvent>,
    notified: mpsc::UnboundedReceiver<AlertRecord>,
}

fn harness() -> Harness {
    let state = state::shared();
    let hub = Arc::new(PushHub::new(64));
    let events = hub.subscribe();
    let (tx, notified) = mpsc::unbounded_channel();
    let relay = RelayService::new(
        Arc::clone(&state),
        hub,
        Arc::new(RecordingNotifier { tx }),
        "Greenhouse 3",
    );
    Harness {
        relay,
        state,
        events,
        notified,
    }
}

fn at(hour: u32, minute: u32) -> chrono::DateTime<FixedOffset> {
    FixedOffset::east_opt(2 * 3600)
        .unwrap()
        .with_ymd_and_hms(2026, 10, 19, hour, minute, 0)
        .unwrap()
}

fn drain(events: &mut broadcast::Receiver<PushEvent>) -> Vec<PushEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test]
async fn temperature_alert_uses_last_known_reading() {
    let mut h = harness();

    h.relay
        .handle_message_at("sensors/temperature", r#"{"temperature": 34.2}"#, &at(14, 3));
    let outcome = h
        .relay
        .handle_message_at("Alert_temp", r#"{"status": "ON"}"#, &at(14, 5));

    let MessageOutcome::AlertRecorded(record) = outcome else {
        panic!("expected an alert, got {outcome:?}");
    };
    assert_eq!(record.topic(), "Alert_temp");
    assert_eq!(record.value(), &ReadingValue::Number(34.2));
    assert_eq!(record.date(), "10/19/2026");
    assert_eq!(record.time(), "14:05");
    assert_eq!(record.location(), "Greenhouse 3");

    assert_eq!(state::alert_snapshot(&h.state), vec![record.clone()]);

    let notified = timeout(Duration::from_secs(1), h.notified.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notified, record);

    let events = drain(&mut h.events);
    assert!(events.contains(&PushEvent::AlertBlink {
        topic: "Alert_temp".into(),
        status: "on".into(),
    }));
}

#[tokio::test]
async fn alert_without_reading_falls_back_to_raw_payload() {
    let mut h = harness();

    let outcome = h.relay.handle_message_at("Alert_darkness", "ON", &at(22, 0));

    let MessageOutcome::AlertRecorded(record) = outcome else {
        panic!("expected an alert, got {outcome:?}");
    };
    assert_eq!(record.value(), &ReadingValue::Text("ON".into()));
    assert!(
        timeout(Duration::from_secs(1), h.notified.recv())
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn inactive_alert_records_nothing() {
    let mut h = harness();

    let outcome = h
        .relay
        .handle_message_at("Alert_humidity", r#"{"status": "off"}"#, &at(9, 0));

    assert_eq!(
        outcome,
        MessageOutcome::AlertInactive {
            status: "off".into()
        }
    );
    assert!(state::alert_snapshot(&h.state).is_empty());
    assert!(
        timeout(Duration::from_millis(100), h.notified.recv())
            .await
            .is_err()
    );

    let events = drain(&mut h.events);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, PushEvent::AlertBlink { .. }))
    );
}

#[tokio::test]
async fn every_message_is_forwarded_verbatim() {
    let mut h = harness();

    h.relay
        .handle_message_at("sensors/fan", r#"{"status":"ON"}"#, &at(8, 0));
    h.relay.handle_message_at("garden/valve", "open", &at(8, 1));

    let events = drain(&mut h.events);
    assert_eq!(
        events,
        vec![
            PushEvent::FanStatus {
                status: "on".into()
            },
            PushEvent::MqttMessage {
                topic: "sensors/fan".into(),
                message: r#"{"status":"ON"}"#.into(),
            },
            PushEvent::MqttMessage {
                topic: "garden/valve".into(),
                message: "open".into(),
            },
        ]
    );
}

#[tokio::test]
async fn later_readings_replace_earlier_ones() {
    let h = harness();

    h.relay
        .handle_message_at("sensors/humidity", r#"{"humidity": 40}"#, &at(7, 0));
    h.relay
        .handle_message_at("sensors/humidity", r#"{"value": "55.5"}"#, &at(7, 1));
    h.relay
        .handle_message_at("sensors/humidity", "not json", &at(7, 2));

    let readings = state::reading_snapshot(&h.state);
    assert_eq!(
        readings.get(ReadingField::Humidity),
        Some(&ReadingValue::Number(55.5))
    );
}

#[tokio::test]
async fn clearing_resets_the_log_between_alerts() {
    let h = harness();

    h.relay.handle_message_at("Alert_temp", "on", &at(1, 0));
    h.relay.handle_message_at("Alert_temp", "on", &at(1, 1));
    assert_eq!(state::alert_snapshot(&h.state).len(), 2);

    assert_eq!(h.state.lock().alerts.clear(), 2);
    h.relay.handle_message_at("Alert_humidity", "on", &at(1, 2));

    let alerts = state::alert_snapshot(&h.state);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].topic(), "Alert_humidity");
}

#[tokio::test]
async fn notification_failure_does_not_block_recording() {
    let state = state::shared();
    let relay = RelayService::new(
        Arc::clone(&state),
        Arc::new(PushHub::new(8)),
        Arc::new(FailingNotifier),
        "Lab",
    );

    relay.handle_message_at("Alert_temp", r#"{"status":"on"}"#, &at(3, 0));
    tokio::task::yield_now().await;
    relay.handle_message_at("Alert_temp", r#"{"status":"on"}"#, &at(3, 1));

    assert_eq!(state::alert_snapshot(&state).len(), 2);
}
