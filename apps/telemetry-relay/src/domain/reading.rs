//! Reading Store
//!
//! One slot per monitored field, overwritten in place on every message.
//! There is no history and no versioning: the last write wins.

use serde::{Serialize, Serializer};
use serde_json::Value;

use super::payload::Payload;

// =============================================================================
// Fields
// =============================================================================

/// A monitored reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadingField {
    /// Temperature from `sensors/temperature`.
    Temperature,
    /// Humidity from `sensors/humidity`.
    Humidity,
    /// Darkness from the light-dependent resistor, `sensors/ldr`.
    Darkness,
    /// Fan on/off status.
    FanStatus,
    /// Light on/off status.
    LightStatus,
    /// Fan usage percentage.
    FanUsagePercentage,
    /// Light usage percentage.
    LightUsagePercentage,
}

impl ReadingField {
    /// All fields.
    pub const ALL: [Self; 7] = [
        Self::Temperature,
        Self::Humidity,
        Self::Darkness,
        Self::FanStatus,
        Self::LightStatus,
        Self::FanUsagePercentage,
        Self::LightUsagePercentage,
    ];

    /// Field name used in JSON and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Darkness => "darkness",
            Self::FanStatus => "fan_status",
            Self::LightStatus => "light_status",
            Self::FanUsagePercentage => "fan_usage_percentage",
            Self::LightUsagePercentage => "light_usage_percentage",
        }
    }

    /// Payload keys searched for this field's value, in priority order.
    #[must_use]
    pub const fn payload_keys(self) -> &'static [&'static str] {
        match self {
            Self::Temperature => &["temperature", "value"],
            Self::Humidity => &["humidity", "value"],
            Self::Darkness => &["darkness", "ldr", "value"],
            Self::FanStatus | Self::LightStatus => &["status", "value"],
            Self::FanUsagePercentage | Self::LightUsagePercentage => {
                &["percentage", "usage", "value"]
            }
        }
    }

    /// Status fields hold lower-cased text rather than numbers.
    #[must_use]
    pub const fn is_status(self) -> bool {
        matches!(self, Self::FanStatus | Self::LightStatus)
    }

    /// Extract this field's value from a parsed payload.
    ///
    /// Returns `None` for unstructured payloads or when no candidate key
    /// holds a scalar.
    #[must_use]
    pub fn extract(self, payload: &Payload) -> Option<ReadingValue> {
        let value = payload.field(self.payload_keys())?;
        if self.is_status() {
            return match value {
                Value::String(s) => Some(ReadingValue::Text(s.to_lowercase())),
                Value::Number(n) => Some(ReadingValue::Text(n.to_string())),
                Value::Bool(b) => Some(ReadingValue::Text(b.to_string())),
                Value::Null | Value::Array(_) | Value::Object(_) => None,
            };
        }
        ReadingValue::from_json(value)
    }
}

impl std::fmt::Display for ReadingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Values
// =============================================================================

/// A reading value: numeric when the device sent a number, else text.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingValue {
    /// Numeric reading.
    Number(f64),
    /// Text reading (statuses, or non-numeric payloads).
    Text(String),
}

impl ReadingValue {
    /// Convert a JSON scalar. Numeric strings become numbers.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(
                s.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map_or_else(|| Self::Text(s.clone()), Self::Number),
            ),
            Value::Bool(b) => Some(Self::Text(b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Numeric value, if any.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

}

impl std::fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for ReadingValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Latest value per field. Every slot starts unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReadingStore {
    temperature: Option<ReadingValue>,
    humidity: Option<ReadingValue>,
    darkness: Option<ReadingValue>,
    fan_status: Option<ReadingValue>,
    light_status: Option<ReadingValue>,
    fan_usage_percentage: Option<ReadingValue>,
    light_usage_percentage: Option<ReadingValue>,
}

impl ReadingStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a field.
    #[must_use]
    pub const fn get(&self, field: ReadingField) -> Option<&ReadingValue> {
        self.slot(field).as_ref()
    }

    /// Overwrite a field, returning the previous value.
    pub fn set(&mut self, field: ReadingField, value: ReadingValue) -> Option<ReadingValue> {
        self.slot_mut(field).replace(value)
    }

    /// Number of fields that have received at least one value.
    #[must_use]
    pub fn known_count(&self) -> usize {
        ReadingField::ALL
            .iter()
            .filter(|f| self.get(**f).is_some())
            .count()
    }

    const fn slot(&self, field: ReadingField) -> &Option<ReadingValue> {
        match field {
            ReadingField::Temperature => &self.temperature,
            ReadingField::Humidity => &self.humidity,
            ReadingField::Darkness => &self.darkness,
            ReadingField::FanStatus => &self.fan_status,
            ReadingField::LightStatus => &self.light_status,
            ReadingField::FanUsagePercentage => &self.fan_usage_percentage,
            ReadingField::LightUsagePercentage => &self.light_usage_percentage,
        }
    }

    const fn slot_mut(&mut self, field: ReadingField) -> &mut Option<ReadingValue> {
        match field {
            ReadingField::Temperature => &mut self.temperature,
            ReadingField::Humidity => &mut self.humidity,
            ReadingField::Darkness => &mut self.darkness,
            ReadingField::FanStatus => &mut self.fan_status,
            ReadingField::LightStatus => &mut self.light_status,
            ReadingField::FanUsagePercentage => &mut self.fan_usage_percentage,
            ReadingField::LightUsagePercentage => &mut self.light_usage_percentage,
        }
    }
}
