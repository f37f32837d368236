//! Broker Client
//!
//! Drives the `rumqttc` event loop: subscribes to every topic group on each
//! ConnAck, forwards inbound publishes as [`BrokerEvent`]s and paces polls
//! after failures. [`BrokerClient`] is the publish handle.

use rumqttc::{AsyncClient, Event, EventLoop, Packet, QoS, SubscribeFilter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use super::tls;
use crate::application::ports::{BrokerPublisher, PublishError};
use crate::domain::topic::TopicGroup;
use crate::infrastructure::config::BrokerSettings;

/// Bound on requests queued for the event loop.
const REQUEST_CAPACITY: usize = 64;

// =============================================================================
// Error Type
// =============================================================================

/// Errors from the broker adapter.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// A subscribe request could not be handed to the event loop.
    #[error("subscribe to {group} topics failed: {source}")]
    Subscribe {
        /// Topic group name.
        group: &'static str,
        /// Client error.
        #[source]
        source: rumqttc::ClientError,
    },

    /// The event consumer went away.
    #[error("broker event channel closed")]
    ChannelClosed,
}

// =============================================================================
// Events
// =============================================================================

/// Events emitted by the broker connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    /// ConnAck received and subscriptions requested.
    Connected,
    /// A poll failed; the session is down.
    Disconnected,
    /// Waiting before the next poll.
    Reconnecting {
        /// Failures since the last connect.
        attempt: u32,
    },
    /// Inbound publish.
    Message {
        /// Topic.
        topic: String,
        /// Payload decoded as lossy UTF-8.
        payload: String,
    },
    /// Connection error text.
    Error(String),
}

// =============================================================================
// Publish Handle
// =============================================================================

/// Publish handle onto the broker session.
#[derive(Clone)]
pub struct BrokerClient {
    client: AsyncClient,
}

impl BrokerClient {
    /// Wrap an existing client.
    #[must_use]
    pub const fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

impl BrokerPublisher for BrokerClient {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())
            .map_err(|e| PublishError::Rejected {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }
}

// =============================================================================
// Connection
// =============================================================================

/// Owns the event loop for one broker session.
pub struct BrokerConnection {
    client: AsyncClient,
    eventloop: EventLoop,
    reconnect: ReconnectConfig,
    event_tx: mpsc::Sender<BrokerEvent>,
    cancel: CancellationToken,
}

/// Build the publish handle and the connection driver.
///
/// No network I/O happens until [`BrokerConnection::run`] polls.
#[must_use]
pub fn connect(
    settings: &BrokerSettings,
    reconnect: ReconnectConfig,
    event_tx: mpsc::Sender<BrokerEvent>,
    cancel: CancellationToken,
) -> (BrokerClient, BrokerConnection) {
    let (client, eventloop) = AsyncClient::new(tls::mqtt_options(settings), REQUEST_CAPACITY);
    let connection = BrokerConnection {
        client: client.clone(),
        eventloop,
        reconnect,
        event_tx,
        cancel,
    };
    (BrokerClient::new(client), connection)
}

impl BrokerConnection {
    /// Poll the event loop until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::ChannelClosed` if the event receiver is dropped.
    pub async fn run(mut self) -> Result<(), BrokerError> {
        let mut policy = ReconnectPolicy::new(self.reconnect.clone());
        let mut subscriptions: Option<JoinHandle<()>> = None;

        let result = loop {
            let polled = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    tracing::info!("Broker connection cancelled");
                    let _ = self.client.try_disconnect();
                    break Ok(());
                }
                polled = self.eventloop.poll() => polled,
            };

            match polled {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    policy.reset();
                    tracing::info!(code = ?ack.code, "Connected to MQTT broker");
                    if let Some(previous) = subscriptions.take() {
                        previous.abort();
                    }
                    subscriptions = Some(spawn_subscriptions(self.client.clone()));
                    if let Err(e) = emit(&self.event_tx, BrokerEvent::Connected).await {
                        break Err(e);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let payload = String::from_utf8_lossy(&publish.payload).into_owned();
                    let event = BrokerEvent::Message {
                        topic: publish.topic,
                        payload,
                    };
                    if let Err(e) = emit(&self.event_tx, event).await {
                        break Err(e);
                    }
                }
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    tracing::debug!(pkid = ack.pkid, codes = ?ack.return_codes, "Subscription acknowledged");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "MQTT connection error");
                    let delay = policy.next_delay();
                    let attempt = policy.attempt_count();
                    if let Err(e) = report_failure(&self.event_tx, e.to_string(), attempt).await {
                        break Err(e);
                    }
                    tracing::info!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        "Reconnecting to MQTT broker"
                    );

                    tokio::select! {
                        () = self.cancel.cancelled() => {
                            tracing::info!("Broker connection cancelled during reconnect delay");
                            break Ok(());
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        };

        if let Some(task) = subscriptions {
            task.abort();
        }
        result
    }
}

/// Request every topic group from a separate task.
///
/// The awaiting `subscribe_many` waits for room in the request queue, which
/// only drains while the event loop keeps polling.
fn spawn_subscriptions(client: AsyncClient) -> JoinHandle<()> {
    tokio::spawn(async move {
        for group in TopicGroup::ALL {
            match subscribe_group(&client, group).await {
                Ok(()) => tracing::info!(group = group.as_str(), "Subscribed to topic group"),
                Err(e) => tracing::warn!(error = %e, "Subscription request failed"),
            }
        }
    })
}

async fn subscribe_group(client: &AsyncClient, group: TopicGroup) -> Result<(), BrokerError> {
    let filters = group
        .topics()
        .into_iter()
        .map(|topic| SubscribeFilter::new(topic.as_str().to_string(), QoS::AtMostOnce));

    client
        .subscribe_many(filters)
        .await
        .map_err(|source| BrokerError::Subscribe {
            group: group.as_str(),
            source,
        })
}

async fn report_failure(
    tx: &mpsc::Sender<BrokerEvent>,
    error: String,
    attempt: u32,
) -> Result<(), BrokerError> {
    emit(tx, BrokerEvent::Error(error)).await?;
    emit(tx, BrokerEvent::Disconnected).await?;
    emit(tx, BrokerEvent::Reconnecting { attempt }).await
}

async fn emit(tx: &mpsc::Sender<BrokerEvent>, event: BrokerEvent) -> Result<(), BrokerError> {
    tx.send(event).await.map_err(|_| BrokerError::ChannelClosed)
}
