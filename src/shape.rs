//! Shape helpers shared by the resolver, flattener and extraction pipeline

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Decimal literal as accepted by JavaScript's Number(): optional sign, digits with an
// optional fraction, optional exponent.
static DECIMAL_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap()
});

static RADIX_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^0([xX][0-9a-fA-F]+|[oO][0-7]+|[bB][01]+)$").unwrap()
});

/// Advisory type recorded for a selected field
///
/// `null`, arrays and objects all map to [`ValueType::Object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
    String,
    Boolean,
    Object,
}

impl ValueType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Bool(_) => ValueType::Boolean,
            Value::Null | Value::Array(_) | Value::Object(_) => ValueType::Object,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Object => "object",
        }
    }
}

/// Locate the array of records a table widget reads its rows from
///
/// The response itself when it is an array (even an empty one), otherwise the first
/// non-empty array among the object's values in enumeration order.
pub fn find_record_array(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.iter().find_map(|(key, v)| match v {
            Value::Array(items) if !items.is_empty() => {
                tracing::debug!(key = %key, rows = items.len(), "found record array");
                Some(items)
            }
            _ => None,
        }),
        _ => None,
    }
}

/// Coerce a JSON value to a finite number the way chart series accept it
///
/// Numbers pass through, strings are converted with JavaScript `Number()` semantics,
/// everything else (booleans included) is rejected.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_js_number(s),
        _ => None,
    }
}

/// `Number(s)` for a string, returning `None` for NaN and infinities
pub fn parse_js_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    let parsed = if DECIMAL_LITERAL.is_match(trimmed) {
        trimmed.parse::<f64>().ok()
    } else if RADIX_LITERAL.is_match(trimmed) {
        let radix = match trimmed.as_bytes()[1] {
            b'x' | b'X' => 16,
            b'o' | b'O' => 8,
            _ => 2,
        };
        Some(trimmed[2..].chars().fold(0.0_f64, |acc, c| {
            acc * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64
        }))
    } else {
        None
    };

    parsed.filter(|f| f.is_finite())
}

/// Parse a path segment as an array index (non-negative integer)
pub fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}
