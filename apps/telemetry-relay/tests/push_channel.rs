//! Push Channel Integration Tests
//!
//! Runs the HTTP server on a random port and talks to `/ws` with a real
//! WebSocket client.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

use telemetry_relay::application::ports::PublishError;
use telemetry_relay::domain::state;
use telemetry_relay::{
    ApiServer, ApiState, BrokerPublisher, BrokerStatus, ControlIntake, PushEvent, PushHub,
    PushPublisher,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Records every publish.
#[derive(Default)]
struct RecordingPublisher {
    published: Mutex<Vec<(String, String)>>,
}

impl BrokerPublisher for RecordingPublisher {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        self.published
            .lock()
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

struct TestServer {
    url: String,
    hub: Arc<PushHub>,
    publisher: Arc<RecordingPublisher>,
    cancel: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn start_server() -> TestServer {
    let hub = Arc::new(PushHub::new(64));
    let publisher = Arc::new(RecordingPublisher::default());
    let cancel = CancellationToken::new();

    let api = Arc::new(ApiState::new(
        "test".into(),
        state::shared(),
        Arc::clone(&hub),
        Arc::new(ControlIntake::new(Arc::clone(&publisher) as Arc<dyn BrokerPublisher>)),
        Arc::new(BrokerStatus::new()),
    ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = ApiServer::new(
        addr.port(),
        "http://localhost:3000".into(),
        api,
        cancel.clone(),
    );
    tokio::spawn(async move {
        server.serve(listener).await.unwrap();
    });

    TestServer {
        url: format!("ws://{addr}/ws"),
        hub,
        publisher,
        cancel,
    }
}

async fn connect(server: &TestServer, expected_clients: usize) -> Client {
    let (client, _) = connect_async(server.url.as_str()).await.unwrap();
    // The socket subscribes to the hub after the upgrade completes.
    timeout(Duration::from_secs(2), async {
        while server.hub.receiver_count() < expected_clients {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    client
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(2), client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn wait_for_publishes(publisher: &RecordingPublisher, count: usize) -> Vec<(String, String)> {
    timeout(Duration::from_secs(2), async {
        loop {
            {
                let published = publisher.published.lock();
                if published.len() >= count {
                    return published.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn control_update_is_republished_to_the_broker() {
    let server = start_server().await;
    let mut client = connect(&server, 1).await;

    let frame = json!({
        "event": "control_update",
        "data": { "fan": "on", "Alert_darkness": "off" }
    });
    client
        .send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();

    let mut published = wait_for_publishes(&server.publisher, 2).await;
    published.sort();
    assert_eq!(
        published,
        vec![
            ("Alert_darkness".to_string(), "\"off\"".to_string()),
            ("manual_status_fan".to_string(), "\"on\"".to_string()),
        ]
    );
}

#[tokio::test]
async fn malformed_frames_are_ignored() {
    let server = start_server().await;
    let mut client = connect(&server, 1).await;

    client
        .send(Message::Text("definitely not json".into()))
        .await
        .unwrap();
    client
        .send(Message::Text(
            json!({ "event": "reboot", "data": {} }).to_string().into(),
        ))
        .await
        .unwrap();
    client
        .send(Message::Text(
            json!({ "event": "control_update", "data": { "led": "off" } })
                .to_string()
                .into(),
        ))
        .await
        .unwrap();

    let published = wait_for_publishes(&server.publisher, 1).await;
    assert_eq!(
        published,
        vec![("manual_status_led".to_string(), "\"off\"".to_string())]
    );
}

#[tokio::test]
async fn broadcast_events_reach_every_client() {
    let server = start_server().await;
    let mut first = connect(&server, 1).await;
    let mut second = connect(&server, 2).await;

    let sent = server.hub.broadcast(PushEvent::AlertBlink {
        topic: "Alert_temp".into(),
        status: "on".into(),
    });
    assert_eq!(sent, 2);

    let expected = json!({
        "event": "alert_blink",
        "data": { "topic": "Alert_temp", "status": "on" }
    });
    assert_eq!(next_json(&mut first).await, expected);
    assert_eq!(next_json(&mut second).await, expected);
}

#[tokio::test]
async fn disconnect_releases_the_subscription() {
    let server = start_server().await;
    let mut client = connect(&server, 1).await;

    client.close(None).await.unwrap();

    timeout(Duration::from_secs(2), async {
        while server.hub.receiver_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}
