//! Telemetry Relay Binary
//!
//! Starts the MQTT relay, the HTTP API and the push channel.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin telemetry-relay
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `MQTT_HOST`: Broker host
//! - `MQTT_CA_CERT_PATH`: CA certificate (PEM)
//! - `MQTT_CLIENT_CERT_PATH`: Client certificate (PEM)
//! - `MQTT_CLIENT_KEY_PATH`: Client private key (PEM)
//!
//! ## Optional
//! - `MQTT_PORT`: Broker port (default: 8883)
//! - `MQTT_CLIENT_ID`: Client id (default: telemetry-relay)
//! - `MQTT_KEEP_ALIVE_SECS`: Keep-alive (default: 30)
//! - `MQTT_RECONNECT_DELAY_INITIAL_MS` / `MQTT_RECONNECT_DELAY_MAX_SECS`: Poll backoff
//! - `RELAY_PORT`: HTTP and WebSocket port (default: 5000)
//! - `FRONTEND_ORIGIN`: Allowed CORS origin (default: <http://localhost:3000>)
//! - `SNS_TOPIC_ARN`: Alert notification topic (unset disables notifications)
//! - `AWS_REGION`: SNS region (default: us-east-1)
//! - `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`: Static SNS credentials
//! - `ALERT_LOCATION`: Location label on alerts (default: Unknown location)
//! - `PUSH_CHANNEL_CAPACITY`: Push buffer size (default: 1024)
//! - `OTEL_ENABLED`: Enable OpenTelemetry export (default: false)
//! - `LOG_FORMAT`: `full` or `compact` console output (default: full)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use telemetry_relay::infrastructure::http::{ApiServer, ApiState};
use telemetry_relay::infrastructure::mqtt::{self, BrokerEvent, BrokerStatus, ReconnectConfig};
use telemetry_relay::infrastructure::notification::build_notifier;
use telemetry_relay::infrastructure::push::PushHub;
use telemetry_relay::infrastructure::{metrics, telemetry};
use telemetry_relay::{
    ControlIntake, PushPublisher, RelayConfig, RelayService, domain::state, init_metrics,
};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Buffer between the broker event loop and the message handler.
const BROKER_EVENT_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    let telemetry_guard = telemetry::init();

    tracing::info!(
        span_export = telemetry_guard.is_exporting(),
        "Starting Telemetry Relay"
    );

    let _metrics_handle = init_metrics();

    let config = RelayConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let relay_state = state::shared();
    let push_hub = Arc::new(PushHub::new(config.push_channel_capacity));
    let broker_status = Arc::new(BrokerStatus::new());
    let notifier = build_notifier(&config.notification).await;

    let push: Arc<dyn PushPublisher> = Arc::clone(&push_hub) as Arc<dyn PushPublisher>;
    let relay = RelayService::new(
        Arc::clone(&relay_state),
        push,
        notifier,
        config.alert_location.clone(),
    );

    let (broker_tx, broker_rx) = mpsc::channel::<BrokerEvent>(BROKER_EVENT_CAPACITY);
    let (broker_client, broker_connection) = mqtt::connect(
        &config.broker,
        ReconnectConfig::from_settings(&config.reconnect),
        broker_tx,
        shutdown_token.clone(),
    );

    let control = Arc::new(ControlIntake::new(Arc::new(broker_client)));

    // Single consumer for everything the broker sends.
    let handler_status = Arc::clone(&broker_status);
    tokio::spawn(async move {
        handle_broker_events(broker_rx, relay, handler_status).await;
    });

    tokio::spawn(async move {
        if let Err(e) = broker_connection.run().await {
            tracing::error!(error = %e, "Broker connection error");
        }
    });

    let api_state = Arc::new(ApiState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        Arc::clone(&relay_state),
        Arc::clone(&push_hub),
        control,
        Arc::clone(&broker_status),
    ));
    let api_server = ApiServer::new(
        config.server.port,
        config.server.frontend_origin.clone(),
        api_state,
        shutdown_token.clone(),
    );

    let server_shutdown = shutdown_token.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = api_server.run().await {
            tracing::error!(error = %e, "HTTP server error");
            server_shutdown.cancel();
        }
    });

    tracing::info!("Telemetry relay ready");

    await_shutdown(shutdown_token).await;

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, server_handle)
        .await
        .is_err()
    {
        tracing::warn!("HTTP server did not drain before the shutdown timeout");
    }

    tracing::info!("Telemetry relay stopped");
    drop(telemetry_guard);
    Ok(())
}

/// Handle events from the broker connection.
async fn handle_broker_events(
    mut rx: mpsc::Receiver<BrokerEvent>,
    relay: RelayService,
    status: Arc<BrokerStatus>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            BrokerEvent::Connected => {
                status.mark_connected();
                metrics::set_broker_connected(true);
                tracing::info!("Broker session up");
            }
            BrokerEvent::Disconnected => {
                status.mark_disconnected();
                metrics::set_broker_connected(false);
                tracing::warn!("Broker session down");
            }
            BrokerEvent::Reconnecting { attempt } => {
                status.mark_reconnecting(attempt);
                metrics::record_reconnect();
                tracing::info!(attempt, "Broker reconnecting");
            }
            BrokerEvent::Message { topic, payload } => {
                status.increment_messages();
                let outcome = relay.handle_message(&topic, &payload);
                tracing::debug!(%topic, ?outcome, "Message handled");
            }
            BrokerEvent::Error(msg) => {
                tracing::error!(error = %msg, "Broker error");
                status.set_error(msg);
            }
        }
    }
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &RelayConfig) {
    tracing::info!(
        broker_host = %config.broker.host,
        broker_port = config.broker.port,
        client_id = %config.broker.client_id,
        http_port = config.server.port,
        frontend_origin = %config.server.frontend_origin,
        notifications = config.notification.is_enabled(),
        alert_location = %config.alert_location,
        "Configuration loaded"
    );
    tracing::debug!(
        tls = ?config.broker.tls,
        reconnect = ?config.reconnect,
        push_channel_capacity = config.push_channel_capacity,
        "Broker session settings"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT) or an internal cancel.
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = shutdown_token.cancelled() => {
            tracing::warn!("Internal failure, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
