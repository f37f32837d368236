//! Alert Records and Log
//!
//! An [`AlertRecord`] is created only when an alert topic resolves to status
//! `on`. Records are immutable; the [`AlertLog`] keeps them in arrival order
//! until it is cleared.

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use super::reading::ReadingValue;
use super::topic::InboundTopic;

/// Status string that activates an alert.
pub const ACTIVE_STATUS: &str = "on";

/// Date format on alert records (MM/DD/YYYY).
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Time format on alert records (24-hour HH:MM).
pub const TIME_FORMAT: &str = "%H:%M";

/// Whether an already lower-cased status activates an alert.
#[must_use]
pub fn is_active(status: &str) -> bool {
    status == ACTIVE_STATUS
}

/// One fired alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    topic: String,
    value: ReadingValue,
    date: String,
    time: String,
    location: String,
}

impl AlertRecord {
    /// Build a record stamped with `at`.
    #[must_use]
    pub fn new<Tz>(
        topic: InboundTopic,
        value: ReadingValue,
        at: &DateTime<Tz>,
        location: impl Into<String>,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            topic: topic.as_str().to_string(),
            value,
            date: at.format(DATE_FORMAT).to_string(),
            time: at.format(TIME_FORMAT).to_string(),
            location: location.into(),
        }
    }

    /// Alert topic name.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Triggering value.
    #[must_use]
    pub const fn value(&self) -> &ReadingValue {
        &self.value
    }

    /// Formatted date (MM/DD/YYYY).
    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Formatted time (HH:MM).
    #[must_use]
    pub fn time(&self) -> &str {
        &self.time
    }

    /// Configured location label.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }
}

/// Ordered, in-memory alert history.
#[derive(Debug, Clone, Default)]
pub struct AlertLog {
    records: Vec<AlertRecord>,
}

impl AlertLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: AlertRecord) {
        self.records.push(record);
    }

    /// Remove every record, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }

    /// Records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[AlertRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};
    use serde_json::json;

    use super::*;

    fn sample_time() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-07T09:05:00+01:00").unwrap()
    }

    #[test]
    fn record_formats_date_and_time() {
        let record = AlertRecord::new(
            InboundTopic::AlertTemp,
            ReadingValue::Number(31.5),
            &sample_time(),
            "Greenhouse A",
        );
        assert_eq!(record.topic(), "Alert_temp");
        assert_eq!(record.date(), "03/07/2024");
        assert_eq!(record.time(), "09:05");
        assert_eq!(record.location(), "Greenhouse A");
    }

    #[test]
    fn time_is_24_hour() {
        let at = DateTime::parse_from_rfc3339("2024-12-31T23:59:59Z").unwrap();
        let record = AlertRecord::new(
            InboundTopic::AlertHumidity,
            ReadingValue::Text("ON".into()),
            &at,
            "Lab",
        );
        assert_eq!(record.date(), "12/31/2024");
        assert_eq!(record.time(), "23:59");
    }

    #[test]
    fn record_serializes_flat() {
        let record = AlertRecord::new(
            InboundTopic::AlertDarkness,
            ReadingValue::Number(870.0),
            &sample_time(),
            "Lab",
        );
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "topic": "Alert_darkness",
                "value": 870.0,
                "date": "03/07/2024",
                "time": "09:05",
                "location": "Lab",
            })
        );
    }

    #[test]
    fn log_preserves_order_and_clears() {
        let mut log = AlertLog::new();
        let now = Utc::now();
        log.push(AlertRecord::new(InboundTopic::AlertTemp, ReadingValue::Number(1.0), &now, "x"));
        log.push(AlertRecord::new(InboundTopic::AlertHumidity, ReadingValue::Number(2.0), &now, "x"));

        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[0].topic(), "Alert_temp");
        assert_eq!(log.records()[1].topic(), "Alert_humidity");

        assert_eq!(log.clear(), 2);
        assert!(log.is_empty());
        assert_eq!(log.clear(), 0);
    }

    #[test]
    fn only_on_is_active() {
        assert!(is_active("on"));
        assert!(!is_active("off"));
        assert!(!is_active("ON"));
        assert!(!is_active(""));
    }
}
