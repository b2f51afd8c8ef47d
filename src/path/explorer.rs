//! Enumerate the selectable nodes of a sample response for card widgets

use crate::shape::ValueType;
use serde::Serialize;
use serde_json::Value;

/// Limits for exploring large samples
#[derive(Debug, Clone)]
pub struct ExploreConfig {
    /// Maximum nesting depth to descend into (root children are depth 1)
    pub max_depth: usize,

    /// Maximum number of elements listed per array
    pub max_array_items: usize,

    /// Maximum length of the value preview, in characters
    pub preview_len: usize,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        ExploreConfig {
            max_depth: 32,
            max_array_items: usize::MAX,
            preview_len: 50,
        }
    }
}

/// One selectable node of a sample response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploredField {
    /// Canonical path, e.g. `data[0].price`
    pub path: String,
    pub value_type: ValueType,
    pub preview: String,
    pub is_leaf: bool,
    pub depth: usize,
}

/// List every node below the root in document order
pub fn explore(sample: &Value) -> Vec<ExploredField> {
    explore_with(sample, &ExploreConfig::default())
}

pub fn explore_with(sample: &Value, config: &ExploreConfig) -> Vec<ExploredField> {
    let mut fields = Vec::new();
    visit_children(sample, "", 1, config, &mut fields);
    fields
}

fn visit_children(
    value: &Value,
    prefix: &str,
    depth: usize,
    config: &ExploreConfig,
    fields: &mut Vec<ExploredField>,
) {
    if depth > config.max_depth {
        return;
    }

    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().take(config.max_array_items).enumerate() {
                let path = format!("{}[{}]", prefix, index);
                visit_node(item, path, depth, config, fields);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                visit_node(item, path, depth, config, fields);
            }
        }
        _ => {}
    }
}

fn visit_node(
    value: &Value,
    path: String,
    depth: usize,
    config: &ExploreConfig,
    fields: &mut Vec<ExploredField>,
) {
    let is_leaf = !matches!(value, Value::Array(_) | Value::Object(_));
    fields.push(ExploredField {
        path: path.clone(),
        value_type: ValueType::of(value),
        preview: preview(value, config.preview_len),
        is_leaf,
        depth,
    });

    if !is_leaf {
        visit_children(value, &path, depth + 1, config, fields);
    }
}

fn preview(value: &Value, max_len: usize) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => format!("Array[{}]", items.len()),
        Value::Object(_) => "Object".to_string(),
        other => other.to_string(),
    };

    if text.chars().count() > max_len {
        let truncated: String = text.chars().take(max_len).collect();
        format!("{}...", truncated)
    } else {
        text
    }
}
