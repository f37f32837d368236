//! Control Commands
//!
//! Browser clients send a key→value object. Each recognized key maps to
//! exactly one outbound broker topic; everything else is ignored.
//!
//! Key casing is kept exactly as clients send it today. `Alert_darkness`
//! is capitalized unlike `alert_temp` and `alert_humidity`; a lower-case
//! `alert_darkness` is not recognized.

use serde_json::{Map, Value};

/// A recognized control key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKey {
    /// `fan` → `manual_status_fan`
    Fan,
    /// `led` → `manual_status_led`
    Led,
    /// `control` → `status_control`
    Control,
    /// `alert_temp` → `Alert_temp`
    AlertTemp,
    /// `alert_humidity` → `Alert_humidity`
    AlertHumidity,
    /// `Alert_darkness` → `Alert_darkness`
    AlertDarkness,
}

impl ControlKey {
    /// All keys, in publish order.
    pub const ALL: [Self; 6] = [
        Self::Fan,
        Self::Led,
        Self::Control,
        Self::AlertTemp,
        Self::AlertHumidity,
        Self::AlertDarkness,
    ];

    /// Key as sent by clients.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fan => "fan",
            Self::Led => "led",
            Self::Control => "control",
            Self::AlertTemp => "alert_temp",
            Self::AlertHumidity => "alert_humidity",
            Self::AlertDarkness => "Alert_darkness",
        }
    }

    /// Broker topic the value is published to.
    #[must_use]
    pub const fn topic(self) -> &'static str {
        match self {
            Self::Fan => "manual_status_fan",
            Self::Led => "manual_status_led",
            Self::Control => "status_control",
            Self::AlertTemp => "Alert_temp",
            Self::AlertHumidity => "Alert_humidity",
            Self::AlertDarkness => "Alert_darkness",
        }
    }

    /// Resolve a client key. Case-sensitive.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

/// A single outbound publish produced from a control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPublish {
    /// Key that produced this publish.
    pub key: ControlKey,
    /// JSON-serialized value.
    pub payload: String,
}

impl ControlPublish {
    /// Destination topic.
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        self.key.topic()
    }
}

/// Turn a command object into publishes, one per recognized key present.
///
/// Values are serialized as JSON, so the string `on` becomes `"on"`.
/// Absent keys are skipped; unknown keys are ignored.
#[must_use]
pub fn plan_publishes(command: &Map<String, Value>) -> Vec<ControlPublish> {
    ControlKey::ALL
        .into_iter()
        .filter_map(|key| {
            command.get(key.as_str()).map(|value| ControlPublish {
                key,
                payload: value.to_string(),
            })
        })
        .collect()
}

/// Keys in a command that the relay does not recognize.
#[must_use]
pub fn unrecognized_keys(command: &Map<String, Value>) -> Vec<&str> {
    command
        .keys()
        .filter(|k| ControlKey::parse(k).is_none())
        .map(String::as_str)
        .collect()
}
