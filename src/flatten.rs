//! Chart flattening: reduce a response to numeric series keyed by field name
//!
//! Arrays do not contribute an index to the key, so the same field across the rows of
//! an array becomes one series in row order. Keys are ranked by how many values they
//! collected, the strongest hint of which field is the time series.

use crate::shape::coerce_number;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Key used for scalars that have no enclosing field name
pub const ANONYMOUS_KEY: &str = "value";

/// Result of flattening a response for chart field discovery
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlattenedSeries {
    /// Keys with at least one value, most frequent first, ties in first-seen order
    pub ordered_keys: Vec<String>,
    pub values_by_key: HashMap<String, Vec<f64>>,
    pub frequency_by_key: HashMap<String, usize>,
}

impl FlattenedSeries {
    pub fn is_empty(&self) -> bool {
        self.ordered_keys.is_empty()
    }

    pub fn values(&self, key: &str) -> Option<&[f64]> {
        self.values_by_key.get(key).map(Vec::as_slice)
    }

    pub fn frequency(&self, key: &str) -> usize {
        self.frequency_by_key.get(key).copied().unwrap_or(0)
    }

    /// Iterate `(key, values)` in ranked order
    pub fn ranked(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.ordered_keys
            .iter()
            .filter_map(move |key| self.values(key).map(|values| (key.as_str(), values)))
    }
}

#[derive(Default)]
struct SeriesAccumulator {
    first_seen: Vec<String>,
    values: HashMap<String, Vec<f64>>,
    frequency: HashMap<String, usize>,
}

impl SeriesAccumulator {
    fn push(&mut self, key: &str, value: f64) {
        match self.values.get_mut(key) {
            Some(series) => series.push(value),
            None => {
                self.first_seen.push(key.to_string());
                self.values.insert(key.to_string(), vec![value]);
            }
        }
        *self.frequency.entry(key.to_string()).or_insert(0) += 1;
    }

    fn push_scalar(&mut self, key: &str, value: &Value) {
        if let Some(n) = coerce_number(value) {
            self.push(key, n);
        }
    }

    fn finish(self) -> FlattenedSeries {
        let mut ordered_keys = self.first_seen;
        // Stable sort keeps first-seen order among equal frequencies
        ordered_keys.sort_by(|a, b| self.frequency[b].cmp(&self.frequency[a]));

        FlattenedSeries {
            ordered_keys,
            values_by_key: self.values,
            frequency_by_key: self.frequency,
        }
    }
}

/// Flatten a response into numeric series
pub fn flatten(root: &Value) -> FlattenedSeries {
    let mut acc = SeriesAccumulator::default();
    flatten_into(root, "", &mut acc);
    acc.finish()
}

fn flatten_into(value: &Value, prefix: &str, acc: &mut SeriesAccumulator) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Array(_) | Value::Object(_) => flatten_into(item, prefix, acc),
                    scalar => acc.push_scalar(key_or_anonymous(prefix), scalar),
                }
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                let full_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };

                match item {
                    Value::Array(_) | Value::Object(_) => flatten_into(item, &full_key, acc),
                    scalar => acc.push_scalar(&full_key, scalar),
                }
            }
        }
        scalar => acc.push_scalar(key_or_anonymous(prefix), scalar),
    }
}

fn key_or_anonymous(prefix: &str) -> &str {
    if prefix.is_empty() {
        ANONYMOUS_KEY
    } else {
        prefix
    }
}
