//! Field extraction and range helpers shared by validators
//!
//! ## Coercion Rules
//!
//! Field firmware is not consistent about types. Some nodes send `"ph": 6.5`,
//! others `"ph": "6.5"`, and NPK registers occasionally arrive as `800.0`.
//! The helpers here accept all of those:
//!
//! | JSON value      | as float        | as integer                 |
//! |-----------------|-----------------|----------------------------|
//! | number          | value           | integer, or float truncated |
//! | numeric string  | parsed          | parsed, or float truncated  |
//! | absent / null   | default         | default                    |
//! | anything else   | `MalformedField`| `MalformedField`           |
//!
//! Non-finite results ("NaN", "inf" strings) are `MalformedField` too.

use serde_json::Value;

use crate::{
    decode::RawMessage,
    errors::{RejectReason, ValidationResult},
    traits::Validatable,
};

/// Closed-interval range check
///
/// Returns `false` for NaN.
pub fn in_range(value: f64, min: f64, max: f64) -> bool {
    value >= min && value <= max
}

/// Read a float field, applying `default` when absent
pub fn float_field(raw: &RawMessage, field: &'static str, default: f64) -> ValidationResult<f64> {
    let value = match raw.field(field) {
        None => return Ok(default),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match value {
        Some(v) if v.is_valid() => Ok(v),
        _ => Err(RejectReason::MalformedField { field }),
    }
}

/// Read an integer field, applying `default` when absent
///
/// Fractional values are truncated toward zero and out-of-range values
/// saturate at the `i64` bounds.
pub fn int_field(raw: &RawMessage, field: &'static str, default: i64) -> ValidationResult<i64> {
    let value = match raw.field(field) {
        None => return Ok(default),
        Some(Value::Number(n)) => number_to_i64(n),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| float_to_i64(s.parse::<f64>().ok()?))
        }
        Some(_) => None,
    };

    value.ok_or(RejectReason::MalformedField { field })
}

/// Read a string field, applying `default` when absent
pub fn string_field(raw: &RawMessage, field: &'static str, default: &str) -> ValidationResult<String> {
    match raw.field(field) {
        None => Ok(default.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(RejectReason::MalformedField { field }),
    }
}

fn number_to_i64(n: &serde_json::Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.as_u64().is_some() {
        return Some(i64::MAX);
    }
    float_to_i64(n.as_f64()?)
}

fn float_to_i64(value: f64) -> Option<i64> {
    if value.is_valid() {
        Some(value.trunc() as i64)
    } else {
        None
    }
}
