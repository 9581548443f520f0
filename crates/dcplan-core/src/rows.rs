//! Lenient field parsers for externally supplied rows.
//!
//! Flags arrive as booleans, `0`/`1` or strings; amounts as numbers or
//! numeric strings. Anything unparseable becomes `false` / `None` so the
//! loaders can drop the row with a warning instead of failing the file.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub(crate) fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "1.0" | "true" | "yes"
        ),
        _ => false,
    })
}

pub(crate) fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|v| v.is_finite()))
}

/// Split a JSON document into its top-level array elements.
pub(crate) fn array_elements(doc: Value) -> Option<Vec<Value>> {
    match doc {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "flag")]
        on: bool,
        #[serde(default, deserialize_with = "amount")]
        amount: Option<f64>,
    }

    fn sample(json: &str) -> Sample {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn flags_accept_numbers_bools_and_strings() {
        assert!(sample(r#"{"on": 1}"#).on);
        assert!(sample(r#"{"on": true}"#).on);
        assert!(sample(r#"{"on": "1"}"#).on);
        assert!(!sample(r#"{"on": 0}"#).on);
        assert!(!sample(r#"{"on": null}"#).on);
        assert!(!sample(r#"{}"#).on);
    }

    #[test]
    fn amounts_accept_numeric_strings() {
        assert_eq!(sample(r#"{"amount": 40}"#).amount, Some(40.0));
        assert_eq!(sample(r#"{"amount": " 12.5 "}"#).amount, Some(12.5));
        assert_eq!(sample(r#"{"amount": "lots"}"#).amount, None);
        assert_eq!(sample(r#"{}"#).amount, None);
    }
}
