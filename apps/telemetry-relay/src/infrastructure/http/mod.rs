//! HTTP API, Push Upgrade and Health Endpoints
//!
//! One axum server carries the query surface, the push channel upgrade and
//! the operational probes.
//!
//! # Endpoints
//!
//! - `GET /alerts` - Full alert log as `{"alerts": [...]}`
//! - `POST /clear_alerts` - Empties the alert log
//! - `GET /readings` - Latest value per sensor field
//! - `GET /ws` - WebSocket upgrade for the push channel
//! - `GET /health` - JSON health status
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (broker session up)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::WebSocketUpgrade;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router, extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::application::services::ControlIntake;
use crate::domain::alert::AlertRecord;
use crate::domain::reading::ReadingStore;
use crate::domain::state::{self, SharedRelayState};
use crate::infrastructure::metrics::get_metrics_handle;
use crate::infrastructure::mqtt::{BrokerStatus, BrokerStatusSnapshot};
use crate::infrastructure::push::{self, SharedPushHub};

// =============================================================================
// Response Types
// =============================================================================

/// `GET /alerts` body.
#[derive(Debug, Clone, Serialize)]
pub struct AlertsResponse {
    /// Every recorded alert, oldest first.
    pub alerts: Vec<AlertRecord>,
}

/// `POST /clear_alerts` body.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// Human-readable result.
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Relay version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Broker session.
    pub broker: BrokerStatusSnapshot,
    /// Connected push clients.
    pub push_clients: usize,
    /// Alerts currently in the log.
    pub alerts_recorded: usize,
    /// Fields with a known reading.
    pub readings_known: usize,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Broker session up.
    Healthy,
    /// Serving HTTP, broker session down.
    Degraded,
}

impl HealthStatus {
    const fn from_broker(connected: bool) -> Self {
        if connected {
            Self::Healthy
        } else {
            Self::Degraded
        }
    }
}

// =============================================================================
// Server State
// =============================================================================

/// Shared state for every handler.
pub struct ApiState {
    version: String,
    started_at: Instant,
    relay: SharedRelayState,
    push_hub: SharedPushHub,
    control: Arc<ControlIntake>,
    broker: Arc<BrokerStatus>,
}

impl ApiState {
    /// Create new server state.
    #[must_use]
    pub fn new(
        version: String,
        relay: SharedRelayState,
        push_hub: SharedPushHub,
        control: Arc<ControlIntake>,
        broker: Arc<BrokerStatus>,
    ) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            relay,
            push_hub,
            control,
            broker,
        }
    }
}

/// Build the router with CORS for `frontend_origin` and request tracing.
///
/// # Errors
///
/// Returns `HttpServerError::InvalidOrigin` if the origin is not a valid
/// header value.
pub fn router(state: Arc<ApiState>, frontend_origin: &str) -> Result<Router, HttpServerError> {
    let origin = frontend_origin
        .parse::<HeaderValue>()
        .map_err(|e| HttpServerError::InvalidOrigin(frontend_origin.to_string(), e.to_string()))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Ok(Router::new()
        .route("/alerts", get(alerts_handler))
        .route("/clear_alerts", post(clear_alerts_handler))
        .route("/readings", get(readings_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

// =============================================================================
// API Server
// =============================================================================

/// HTTP server for the API and push channel.
pub struct ApiServer {
    port: u16,
    frontend_origin: String,
    state: Arc<ApiState>,
    cancel: CancellationToken,
}

impl ApiServer {
    /// Create a new server.
    #[must_use]
    pub const fn new(
        port: u16,
        frontend_origin: String,
        state: Arc<ApiState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            port,
            frontend_origin,
            state,
            cancel,
        }
    }

    /// Bind and serve until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError` if the origin is invalid, binding fails or
    /// the server hits a fatal error.
    pub async fn run(self) -> Result<(), HttpServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HttpServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "HTTP server listening");
        self.serve(listener).await
    }

    /// Serve on an already bound listener until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError` if the origin is invalid or the server hits
    /// a fatal error.
    pub async fn serve(self, listener: TcpListener) -> Result<(), HttpServerError> {
        let app = router(self.state, &self.frontend_origin)?;

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn alerts_handler(State(state): State<Arc<ApiState>>) -> Json<AlertsResponse> {
    Json(AlertsResponse {
        alerts: state::alert_snapshot(&state.relay),
    })
}

async fn clear_alerts_handler(State(state): State<Arc<ApiState>>) -> Json<MessageResponse> {
    let cleared = state.relay.lock().alerts.clear();
    tracing::info!(cleared, "Alert log cleared");
    Json(MessageResponse {
        message: "Alerts cleared".to_string(),
    })
}

async fn readings_handler(State(state): State<Arc<ApiState>>) -> Json<ReadingStore> {
    Json(state::reading_snapshot(&state.relay))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let hub = Arc::clone(&state.push_hub);
    let control = Arc::clone(&state.control);
    ws.on_upgrade(move |socket| push::handle_socket(socket, hub, control))
}

async fn health_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(build_health_response(&state)))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    if state.broker.is_connected() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

fn build_health_response(state: &ApiState) -> HealthResponse {
    let broker = state.broker.snapshot();
    let (alerts_recorded, readings_known) = {
        let relay = state.relay.lock();
        (relay.alerts.len(), relay.readings.known_count())
    };

    HealthResponse {
        status: HealthStatus::from_broker(state.broker.is_connected()),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        broker,
        push_clients: state.push_hub.receiver_count(),
        alerts_recorded,
        readings_known,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    /// The configured frontend origin is not a valid header value.
    #[error("invalid frontend origin {0:?}: {1}")]
    InvalidOrigin(String, String),

    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{FixedOffset, TimeZone};
    use tower::ServiceExt;

    use super::*;
    use crate::application::ports::MockBrokerPublisher;
    use crate::domain::reading::{ReadingField, ReadingValue};
    use crate::domain::topic::InboundTopic;
    use crate::infrastructure::push::PushHub;

    const ORIGIN: &str = "http://localhost:3000";

    fn api_state() -> Arc<ApiState> {
        Arc::new(ApiState::new(
            "test".into(),
            state::shared(),
            Arc::new(PushHub::with_defaults()),
            Arc::new(ControlIntake::new(Arc::new(MockBrokerPublisher::new()))),
            Arc::new(BrokerStatus::new()),
        ))
    }

    fn record_alert(state: &ApiState) {
        let at = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 1, 2, 3, 4, 0)
            .unwrap();
        state.relay.lock().alerts.push(AlertRecord::new(
            InboundTopic::AlertHumidity,
            ReadingValue::Number(91.0),
            &at,
            "Lab",
        ));
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
    }

    #[test]
    fn invalid_origin_is_rejected() {
        let err = router(api_state(), "bad\norigin").unwrap_err();
        assert!(matches!(err, HttpServerError::InvalidOrigin(..)));
    }

    #[tokio::test]
    async fn alerts_lists_recorded_alerts() {
        let state = api_state();
        record_alert(&state);
        let app = router(state, ORIGIN).unwrap();

        let response = app
            .oneshot(Request::get("/alerts").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["alerts"][0]["topic"], "Alert_humidity");
        assert_eq!(json["alerts"][0]["date"], "01/02/2026");
        assert_eq!(json["alerts"][0]["time"], "03:04");
        assert_eq!(json["alerts"][0]["location"], "Lab");
    }

    #[tokio::test]
    async fn clear_alerts_empties_the_log() {
        let state = api_state();
        record_alert(&state);
        let app = router(Arc::clone(&state), ORIGIN).unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::post("/clear_alerts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "Alerts cleared");

        let response = app
            .oneshot(Request::get("/alerts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["alerts"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn clear_alerts_rejects_get() {
        let app = router(api_state(), ORIGIN).unwrap();
        let response = app
            .oneshot(Request::get("/clear_alerts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn readings_report_unset_fields_as_null() {
        let state = api_state();
        state
            .relay
            .lock()
            .readings
            .set(ReadingField::Temperature, ReadingValue::Number(22.5));
        let app = router(state, ORIGIN).unwrap();

        let response = app
            .oneshot(Request::get("/readings").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["temperature"], 22.5);
        assert!(json["humidity"].is_null());
    }

    #[tokio::test]
    async fn readiness_follows_broker_state() {
        let state = api_state();
        let app = router(Arc::clone(&state), ORIGIN).unwrap();

        let response = app
            .clone()
            .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.broker.mark_connected();
        let response = app
            .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let state = api_state();
        record_alert(&state);
        let app = router(state, ORIGIN).unwrap();

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["alerts_recorded"], 1);
        assert_eq!(json["broker"]["state"], "disconnected");
    }

    #[tokio::test]
    async fn cors_allows_frontend_origin() {
        let app = router(api_state(), ORIGIN).unwrap();
        let response = app
            .oneshot(
                Request::get("/alerts")
                    .header("origin", ORIGIN)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            ORIGIN
        );
    }
}
