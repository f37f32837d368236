//! Payload Parsing
//!
//! Broker payloads are usually JSON but devices also publish bare words
//! (`ON`, `off`). A [`Payload`] keeps both the trimmed raw text and the
//! parsed JSON, when parsing succeeded, so callers can fall back to the raw
//! text.

use serde_json::Value;

/// A broker payload with its optional JSON interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    raw: String,
    json: Option<Value>,
}

impl Payload {
    /// Parse a raw payload. Never fails: unparseable input keeps only the
    /// trimmed text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        Self {
            raw: trimmed.to_string(),
            json: serde_json::from_str(trimmed).ok(),
        }
    }

    /// Trimmed raw text.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the payload parsed as JSON.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        self.json.is_some()
    }

    /// Look up a value by candidate keys.
    ///
    /// A bare JSON scalar is returned as-is. For an object, the first key in
    /// `keys` that is present wins.
    #[must_use]
    pub fn field(&self, keys: &[&str]) -> Option<&Value> {
        match self.json.as_ref()? {
            Value::Object(map) => keys.iter().find_map(|k| map.get(*k)),
            scalar @ (Value::Number(_) | Value::String(_) | Value::Bool(_)) => Some(scalar),
            Value::Null | Value::Array(_) => None,
        }
    }

    /// Lower-cased alert status.
    ///
    /// Uses the `status` string of a JSON object, or a bare JSON string.
    /// Anything else falls back to the whole raw text.
    #[must_use]
    pub fn status(&self) -> String {
        let from_json = match self.json.as_ref() {
            Some(Value::Object(map)) => map.get("status").and_then(Value::as_str),
            Some(Value::String(s)) => Some(s.as_str()),
            _ => None,
        };
        from_json.unwrap_or(self.raw.as_str()).to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    #[test]
    fn parses_json_object() {
        let payload = Payload::parse(r#" {"temperature": 21.5} "#);
        assert!(payload.is_structured());
        assert_eq!(payload.raw(), r#"{"temperature": 21.5}"#);
        assert_eq!(payload.field(&["temperature"]), Some(&json!(21.5)));
    }

    #[test]
    fn keeps_raw_text_on_parse_failure() {
        let payload = Payload::parse("  ON\n");
        assert!(!payload.is_structured());
        assert_eq!(payload.raw(), "ON");
        assert_eq!(payload.field(&["status"]), None);
    }

    #[test]
    fn field_prefers_first_present_key() {
        let payload = Payload::parse(r#"{"value": 1, "ldr": 2}"#);
        assert_eq!(payload.field(&["darkness", "ldr", "value"]), Some(&json!(2)));
    }

    #[test]
    fn bare_scalar_is_its_own_field() {
        assert_eq!(Payload::parse("42").field(&["x"]), Some(&json!(42)));
        assert_eq!(Payload::parse(r#""on""#).field(&["x"]), Some(&json!("on")));
    }

    #[test]
    fn null_and_arrays_have_no_field() {
        assert_eq!(Payload::parse("null").field(&["x"]), None);
        assert_eq!(Payload::parse("[1,2]").field(&["x"]), None);
    }

    #[test_case(r#"{"status":"ON"}"#, "on" ; "json status")]
    #[test_case(r#"{"status":"Off"}"#, "off" ; "json status off")]
    #[test_case(r#""On""#, "on" ; "bare json string")]
    #[test_case("ON", "on" ; "raw text")]
    #[test_case("  oN  ", "on" ; "raw text trimmed")]
    #[test_case(r#"{"state":"on"}"#, r#"{"state":"on"}"# ; "object without status uses raw")]
    #[test_case(r#"{"status":1}"#, r#"{"status":1}"# ; "non string status uses raw")]
    fn status_derivation(raw: &str, expected: &str) {
        assert_eq!(Payload::parse(raw).status(), expected);
    }
}
