//! JSON array-of-objects input.
//!
//! Each object becomes one [`Record`]. Values are turned into strings with a
//! fixed rule so they behave like decoded CSV fields:
//!
//! | JSON value      | Field value                 |
//! |-----------------|-----------------------------|
//! | string          | the string itself           |
//! | number          | shortest decimal text; integral values have no fraction (`3.0` -> `3`, `1.5e3` -> `1500`) |
//! | boolean         | `true` / `false`            |
//! | `null`          | field absent                |
//! | array, object   | compact JSON text           |

use std::collections::HashSet;

use serde_json::{Number, Value};

use crate::error::ViewError;
use crate::record::{Dataset, Record};

/// Integral floats print without a fraction so `3.0` and `3` give the same
/// field. Past 1e21 the exponent form is kept.
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => {
            if f == 0.0 {
                "0".to_string()
            } else {
                format!("{f:.0}")
            }
        }
        _ => n.to_string(),
    }
}

/// Convert one JSON value to a field value.
pub fn coerce(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(number_text(&n)),
        other @ (Value::Array(_) | Value::Object(_)) => Some(other.to_string()),
    }
}

/// Build a dataset from an already-parsed JSON value.
///
/// Columns are the union of object keys in first-seen order.
pub fn records_from_value(value: Value) -> Result<Dataset, ViewError> {
    let Value::Array(items) = value else {
        return Err(ViewError::NotAnArray);
    };

    let mut columns: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(object) = item else {
            return Err(ViewError::NotAnObject { index });
        };

        // Object keys are unique, so fields can be pushed without a lookup.
        let mut record = Record::with_capacity(object.len());
        for (key, value) in object {
            if seen.insert(key.clone()) {
                columns.push(key.clone());
            }
            if let Some(text) = coerce(value) {
                record.push(key, text);
            }
        }
        records.push(record);
    }

    log::debug!(
        "json: {} columns, {} records",
        columns.len(),
        records.len()
    );
    Ok(Dataset::new(columns, records))
}

/// Parse JSON text into a dataset.
pub fn records_from_json(text: &str) -> Result<Dataset, ViewError> {
    let value: Value = serde_json::from_str(text)?;
    records_from_value(value)
}
