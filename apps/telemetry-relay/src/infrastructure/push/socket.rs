//! Per-connection WebSocket loop.

use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use super::{ClientEvent, PushHub};
use crate::application::services::ControlIntake;
use crate::infrastructure::metrics;

/// Serve one upgraded socket until either side closes.
///
/// Outbound: every hub event as a JSON text frame. Inbound: `control_update`
/// frames go to the control intake; anything else is logged and dropped.
pub async fn handle_socket(socket: WebSocket, hub: Arc<PushHub>, control: Arc<ControlIntake>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let mut rx = hub.subscribe();
    metrics::set_push_clients(hub.receiver_count());
    tracing::info!(conn_id = %conn_id, clients = hub.receiver_count(), "Push client connected");

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(conn_id = %sender_conn_id, skipped, "Push client lagging");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(event = event.name(), error = %e, "Failed to encode push event");
                    continue;
                }
            };

            if sink.send(Message::Text(Utf8Bytes::from(text))).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "Push sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => handle_frame(&conn_id, text.as_str(), &control),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "Push receive error");
                break;
            }
        }
    }

    send_task.abort();
    drop(send_task.await);
    metrics::set_push_clients(hub.receiver_count());
    tracing::info!(conn_id = %conn_id, "Push client disconnected");
}

fn handle_frame(conn_id: &str, text: &str, control: &ControlIntake) {
    match ClientEvent::parse(text) {
        Ok(ClientEvent::ControlUpdate(command)) => {
            let report = control.handle_command(&command);
            tracing::debug!(
                conn_id,
                published = report.published,
                failed = report.failed,
                "Control update handled"
            );
        }
        Err(e) => {
            tracing::warn!(conn_id, error = %e, "Ignoring unrecognized client frame");
        }
    }
}
