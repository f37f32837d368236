//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// MQTT broker client, poll backoff and connection state.
pub mod mqtt;

/// Push channel hub and WebSocket sessions.
pub mod push;

/// SNS alert notifications.
pub mod notification;

/// Configuration loading.
pub mod config;

/// HTTP API, push upgrade and health endpoints.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Tracing subscriber and OpenTelemetry integration.
pub mod telemetry;
