//! Relay Configuration Settings
//!
//! Configuration types for the relay, loaded from environment variables.
//! Certificate files are read eagerly so a bad path fails startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// HTTP and WebSocket listener settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Listen port for the HTTP API and push channel.
    pub port: u16,
    /// Origin allowed by the CORS policy.
    pub frontend_origin: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 5000,
            frontend_origin: "http://localhost:3000".to_string(),
        }
    }
}

/// PEM material for the mutual-TLS broker session.
#[derive(Clone)]
pub struct TlsMaterial {
    ca: Vec<u8>,
    client_cert: Vec<u8>,
    client_key: Vec<u8>,
}

impl TlsMaterial {
    /// Create TLS material from PEM bytes.
    #[must_use]
    pub const fn new(ca: Vec<u8>, client_cert: Vec<u8>, client_key: Vec<u8>) -> Self {
        Self {
            ca,
            client_cert,
            client_key,
        }
    }

    /// CA certificate.
    #[must_use]
    pub fn ca(&self) -> &[u8] {
        &self.ca
    }

    /// Client certificate.
    #[must_use]
    pub fn client_cert(&self) -> &[u8] {
        &self.client_cert
    }

    /// Client private key.
    #[must_use]
    pub fn client_key(&self) -> &[u8] {
        &self.client_key
    }
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("ca", &format_args!("{} bytes", self.ca.len()))
            .field("client_cert", &format_args!("{} bytes", self.client_cert.len()))
            .field("client_key", &"[REDACTED]")
            .finish()
    }
}

/// MQTT broker session settings.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    /// Broker host name.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Keep-alive interval.
    pub keep_alive: Duration,
    /// TLS certificates.
    pub tls: TlsMaterial,
}

/// Poll backoff settings for the broker event loop.
#[derive(Debug, Clone)]
pub struct ReconnectSettings {
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_initial: Duration::from_millis(500),
            reconnect_delay_max: Duration::from_secs(30),
            reconnect_delay_multiplier: 2.0,
        }
    }
}

/// Static AWS credentials.
#[derive(Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
}

impl AwsCredentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(access_key_id: String, secret_access_key: String) -> Self {
        Self {
            access_key_id,
            secret_access_key,
        }
    }

    /// Access key id.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Secret access key.
    #[must_use]
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &"[REDACTED]")
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

/// SNS notification settings.
#[derive(Debug, Clone)]
pub struct NotificationSettings {
    /// AWS region.
    pub region: String,
    /// Static credentials; `None` uses the default AWS provider chain.
    pub credentials: Option<AwsCredentials>,
    /// Topic ARN; `None` disables notifications.
    pub topic_arn: Option<String>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            credentials: None,
            topic_arn: None,
        }
    }
}

impl NotificationSettings {
    /// Whether a notification topic is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.topic_arn.is_some()
    }
}

/// Default location label on alert records.
pub const DEFAULT_ALERT_LOCATION: &str = "Unknown location";

/// Default push channel buffer.
pub const DEFAULT_PUSH_CHANNEL_CAPACITY: usize = 1024;

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// HTTP listener settings.
    pub server: ServerSettings,
    /// Broker session settings.
    pub broker: BrokerSettings,
    /// Broker poll backoff.
    pub reconnect: ReconnectSettings,
    /// SNS settings.
    pub notification: NotificationSettings,
    /// Location label stamped on alert records.
    pub alert_location: String,
    /// Push channel buffer size.
    pub push_channel_capacity: usize,
}

impl RelayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or empty, or if a
    /// certificate file cannot be read.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`RelayConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = required(&lookup, "MQTT_HOST")?;
        let ca_path = required(&lookup, "MQTT_CA_CERT_PATH")?;
        let cert_path = required(&lookup, "MQTT_CLIENT_CERT_PATH")?;
        let key_path = required(&lookup, "MQTT_CLIENT_KEY_PATH")?;

        let tls = TlsMaterial::new(
            read_pem("MQTT_CA_CERT_PATH", &ca_path)?,
            read_pem("MQTT_CLIENT_CERT_PATH", &cert_path)?,
            read_pem("MQTT_CLIENT_KEY_PATH", &key_path)?,
        );

        let broker = BrokerSettings {
            host,
            port: parse_or(&lookup, "MQTT_PORT", 8883),
            client_id: optional(&lookup, "MQTT_CLIENT_ID")
                .unwrap_or_else(|| "telemetry-relay".to_string()),
            keep_alive: parse_duration_secs(&lookup, "MQTT_KEEP_ALIVE_SECS", Duration::from_secs(30)),
            tls,
        };

        let server = ServerSettings {
            port: parse_or(&lookup, "RELAY_PORT", ServerSettings::default().port),
            frontend_origin: optional(&lookup, "FRONTEND_ORIGIN")
                .unwrap_or_else(|| ServerSettings::default().frontend_origin),
        };

        let reconnect = ReconnectSettings {
            reconnect_delay_initial: parse_duration_millis(
                &lookup,
                "MQTT_RECONNECT_DELAY_INITIAL_MS",
                ReconnectSettings::default().reconnect_delay_initial,
            ),
            reconnect_delay_max: parse_duration_secs(
                &lookup,
                "MQTT_RECONNECT_DELAY_MAX_SECS",
                ReconnectSettings::default().reconnect_delay_max,
            ),
            ..ReconnectSettings::default()
        };

        let credentials = match (
            optional(&lookup, "AWS_ACCESS_KEY_ID"),
            optional(&lookup, "AWS_SECRET_ACCESS_KEY"),
        ) {
            (Some(key), Some(secret)) => Some(AwsCredentials::new(key, secret)),
            _ => None,
        };

        let notification = NotificationSettings {
            region: optional(&lookup, "AWS_REGION")
                .unwrap_or_else(|| NotificationSettings::default().region),
            credentials,
            topic_arn: optional(&lookup, "SNS_TOPIC_ARN"),
        };

        Ok(Self {
            server,
            broker,
            reconnect,
            notification,
            alert_location: optional(&lookup, "ALERT_LOCATION")
                .unwrap_or_else(|| DEFAULT_ALERT_LOCATION.to_string()),
            push_channel_capacity: parse_or(
                &lookup,
                "PUSH_CHANNEL_CAPACITY",
                DEFAULT_PUSH_CHANNEL_CAPACITY,
            )
            .max(1),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// A certificate file could not be read.
    #[error("cannot read {var} at {}: {source}", path.display())]
    UnreadableFile {
        /// Variable that named the file.
        var: String,
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    Ok(value)
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_duration_secs<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_duration_millis<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

fn read_pem(var: &str, path: &str) -> Result<Vec<u8>, ConfigError> {
    let path = Path::new(path);
    std::fs::read(path).map_err(|source| ConfigError::UnreadableFile {
        var: var.to_string(),
        path: path.to_path_buf(),
        source,
    })
}
