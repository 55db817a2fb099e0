//! JSON-safe conversion shared by every stage payload
//!
//! Stage results carry `f64` values that may be NaN or infinite (missing
//! cells, undefined p-values, perfectly separating F-scores). JSON has no
//! representation for those, so every float that reaches a payload goes
//! through this module and becomes `null` when it is not finite.

use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// A table row keyed by column name, in insertion order of the JSON map.
pub type Record = Map<String, Value>;

/// Convert a float to a JSON number, or `null` when it is NaN or infinite.
pub fn number(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Convert an optional float; `None` and non-finite values become `null`.
pub fn optional_number(value: Option<f64>) -> Value {
    value.map(number).unwrap_or(Value::Null)
}

/// `Some(value)` when finite, `None` otherwise.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// `serialize_with` adapter for `f64` fields.
pub fn serialize_finite<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    finite(*value).serialize(serializer)
}

/// Start a sample-table row labelled `Row {index + 1}`.
pub fn sample_row(index: usize) -> Record {
    let mut record = Record::new();
    record.insert("row".to_string(), Value::String(format!("Row {}", index + 1)));
    record
}

/// Turn a class label back into a JSON value, keeping numeric labels numeric.
pub fn label_value(label: &str) -> Value {
    if let Ok(int) = label.parse::<i64>() {
        return Value::from(int);
    }
    match label.parse::<f64>() {
        Ok(float) if float.is_finite() => number(float),
        _ => Value::String(label.to_string()),
    }
}

/// Format a ratio as a percentage with one decimal, e.g. `"33.3%"`.
pub fn percent_label(numerator: f64, denominator: f64) -> String {
    if denominator == 0.0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", numerator / denominator * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_finite_becomes_null() {
        assert_eq!(number(f64::NAN), Value::Null);
        assert_eq!(number(f64::INFINITY), Value::Null);
        assert_eq!(number(f64::NEG_INFINITY), Value::Null);
        assert_eq!(number(0.5), serde_json::json!(0.5));
    }

    #[test]
    fn test_optional_number() {
        assert_eq!(optional_number(None), Value::Null);
        assert_eq!(optional_number(Some(f64::NAN)), Value::Null);
        assert_eq!(optional_number(Some(2.5)), serde_json::json!(2.5));
    }

    #[test]
    fn test_serialize_finite_field() {
        #[derive(Serialize)]
        struct Score {
            #[serde(serialize_with = "serialize_finite")]
            p_value: f64,
        }

        let json = serde_json::to_string(&Score { p_value: f64::NAN }).unwrap();
        assert_eq!(json, r#"{"p_value":null}"#);

        let json = serde_json::to_string(&Score { p_value: 0.25 }).unwrap();
        assert_eq!(json, r#"{"p_value":0.25}"#);
    }

    #[test]
    fn test_label_value_keeps_numbers_numeric() {
        assert_eq!(label_value("1"), serde_json::json!(1));
        assert_eq!(label_value("0.5"), serde_json::json!(0.5));
        assert_eq!(label_value("yes"), serde_json::json!("yes"));
    }

    #[test]
    fn test_sample_row_label() {
        let row = sample_row(0);
        assert_eq!(row["row"], serde_json::json!("Row 1"));
    }

    #[test]
    fn test_percent_label() {
        assert_eq!(percent_label(1.0, 3.0), "33.3%");
        assert_eq!(percent_label(0.0, 0.0), "0.0%");
    }
}
