//! Coercion helpers for loosely typed JSON fields.
//!
//! Share-link generators disagree on whether a port is `443`, `"443"` or
//! `443.0`, and whether a flag is `true`, `"true"` or `"1"`. These helpers
//! accept all of them.

use serde_json::Value;

/// Reads a string field; numbers are stringified, everything else is `None`.
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a non-empty, trimmed string field from an object.
pub fn get_str(obj: &Value, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(value_as_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Coerces a JSON value into an unsigned integer.
pub fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Coerces a JSON value into a port number in `1..=65535`.
pub fn value_as_port(value: &Value) -> Option<u16> {
    value_as_u64(value)
        .and_then(|p| u16::try_from(p).ok())
        .filter(|p| *p != 0)
}

/// Coerces a JSON value into a boolean.
pub fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => Some(str_as_bool(s)),
        _ => None,
    }
}

/// `"1"` and any casing of `"true"` are truthy; everything else is false.
pub fn str_as_bool(s: &str) -> bool {
    let s = s.trim();
    s == "1" || s.eq_ignore_ascii_case("true")
}
