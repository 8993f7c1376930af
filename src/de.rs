//! Tolerant field decoders for backend and request JSON.
//!
//! The lease backend is loose about scalar types (an IAID may arrive as a
//! number or a string, timestamps as integers or numeric strings). These
//! helpers fold every accepted shape into one Rust type at the ingestion
//! boundary so the rest of the crate never re-checks.

use serde::{de::Error, Deserialize, Deserializer};
use serde_json::Value;

/// Accept any JSON scalar as a string. `null` becomes the empty string.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("expected a scalar, got {other}"))),
    }
}

/// Like [`lenient_string`] but keeps "absent" and "null" apart from "empty".
pub fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(D::Error::custom(format!("expected a scalar, got {other}"))),
    }
}

/// Unix timestamp in seconds. Unparseable values are treated as absent.
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

/// Integers arrive as numbers or numeric strings. Values that do not fit `T`
/// fall back to its default.
pub fn lenient_int<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64> + Default,
{
    let raw = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(raw.and_then(|n| T::try_from(n).ok()).unwrap_or_default())
}

/// Request flags arrive as booleans, numbers or form-style strings ("1", "true").
pub fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient_string")]
        iaid: String,
        #[serde(default, deserialize_with = "lenient_opt_string")]
        removed: Option<String>,
        #[serde(default, deserialize_with = "lenient_timestamp")]
        ends: Option<i64>,
        #[serde(default, deserialize_with = "lenient_flag")]
        inactive: bool,
        #[serde(default, deserialize_with = "lenient_int")]
        page: usize,
    }

    #[test]
    fn numbers_become_strings() {
        let s: Sample = serde_json::from_str(r#"{"iaid": 314, "removed": 2}"#).unwrap();
        assert_eq!(s.iaid, "314");
        assert_eq!(s.removed.as_deref(), Some("2"));
    }

    #[test]
    fn missing_and_null_fields_default() {
        let s: Sample = serde_json::from_str(r#"{"iaid": null}"#).unwrap();
        assert_eq!(s.iaid, "");
        assert_eq!(s.removed, None);
        assert_eq!(s.ends, None);
        assert!(!s.inactive);
    }

    #[test]
    fn timestamps_accept_numeric_strings() {
        let s: Sample = serde_json::from_str(r#"{"ends": "1700000000"}"#).unwrap();
        assert_eq!(s.ends, Some(1_700_000_000));

        let s: Sample = serde_json::from_str(r#"{"ends": "never"}"#).unwrap();
        assert_eq!(s.ends, None);
    }

    #[test]
    fn flags_accept_form_values() {
        for raw in [r#""1""#, r#""true""#, "true", "1"] {
            let s: Sample = serde_json::from_str(&format!(r#"{{"inactive": {raw}}}"#)).unwrap();
            assert!(s.inactive, "{raw} should enable the flag");
        }
        let s: Sample = serde_json::from_str(r#"{"inactive": "0"}"#).unwrap();
        assert!(!s.inactive);
    }

    #[test]
    fn integers_accept_numeric_strings() {
        let s: Sample = serde_json::from_str(r#"{"page": "2"}"#).unwrap();
        assert_eq!(s.page, 2);

        let s: Sample = serde_json::from_str(r#"{"page": 7}"#).unwrap();
        assert_eq!(s.page, 7);

        // does not fit a usize
        let s: Sample = serde_json::from_str(r#"{"page": "-1"}"#).unwrap();
        assert_eq!(s.page, 0);

        let s: Sample = serde_json::from_str(r#"{"page": "two"}"#).unwrap();
        assert_eq!(s.page, 0);
    }

    #[test]
    fn nested_values_are_rejected() {
        assert!(serde_json::from_str::<Sample>(r#"{"iaid": [1, 2]}"#).is_err());
    }
}
