use crate::extract::CardValue;
use crate::shape::{coerce_number, ValueType};
use chrono::{DateTime, Utc};
use serde_json::{Number, Value};

/// en-US number text with two fraction digits and thousands grouping
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && fixed.bytes().any(|b| b != b'0' && b != b'.');
    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, frac_part)
}

/// Plain text of a JSON value: strings unquoted, integral floats without a fraction
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        _ => n.to_string(),
    }
}

/// Text shown for one card value; numeric fields get grouped two-decimal formatting
pub fn format_card_value(card: &CardValue) -> String {
    let Some(value) = &card.value else {
        return String::new();
    };
    match (card.value_type, coerce_number(value)) {
        (ValueType::Number, Some(n)) => format_number(n),
        _ => display_text(value),
    }
}

/// "N units ago" label for a fetch time, or the date itself after a week
pub fn format_elapsed(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let total_seconds = (now - then).num_seconds().max(0);
    let total_minutes = total_seconds / 60;
    let total_hours = total_minutes / 60;
    let days = total_hours / 24;

    if total_seconds < 60 {
        format!("{} ago", count(total_seconds, "second"))
    } else if total_minutes < 60 {
        join(count(total_minutes, "minute"), total_seconds % 60, "second")
    } else if total_hours < 24 {
        join(count(total_hours, "hour"), total_minutes % 60, "minute")
    } else if days < 7 {
        join(count(days, "day"), total_hours % 24, "hour")
    } else {
        then.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
    }
}

fn count(n: i64, unit: &str) -> String {
    format!("{} {}{}", n, unit, if n == 1 { "" } else { "s" })
}

fn join(major: String, rest: i64, unit: &str) -> String {
    if rest > 0 {
        format!("{} {} ago", major, count(rest, unit))
    } else {
        format!("{} ago", major)
    }
}
