//! Field selection: what picking a field means for each widget kind
//!
//! - **card**: the exact resolver path of the clicked node, re-resolved on every refresh
//! - **table**: a bare key of the first record; read off every row on refresh
//! - **chart**: one flattened series whose values are captured from the sample and
//!   stored with the selection

use crate::error::SelectionError;
use crate::flatten::flatten;
use crate::path::{default_label, explore, ExploredField};
use crate::shape::{coerce_number, find_record_array, ValueType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resolution strategy a selection was captured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Card,
    Chart,
    Table,
}

/// One chosen datum of a widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSelection {
    pub path: String,
    pub label: String,
    pub kind: FieldKind,
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_values: Option<Vec<Value>>,
}

impl FieldSelection {
    pub fn card(path: impl Into<String>, sample: &Value) -> Self {
        let path = path.into();
        FieldSelection {
            label: default_label(&path),
            path,
            kind: FieldKind::Card,
            value_type: ValueType::of(sample),
            chart_values: None,
        }
    }

    pub fn table(key: impl Into<String>, sample: &Value) -> Self {
        let key = key.into();
        FieldSelection {
            label: key.clone(),
            path: key,
            kind: FieldKind::Table,
            value_type: ValueType::of(sample),
            chart_values: None,
        }
    }

    pub fn chart(key: impl Into<String>, values: &[f64]) -> Self {
        let key = key.into();
        FieldSelection {
            label: key.clone(),
            path: key,
            kind: FieldKind::Chart,
            value_type: ValueType::Number,
            chart_values: Some(values.iter().map(|v| Value::from(*v)).collect()),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Label shown to the user, falling back to the path when blank
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.path
        } else {
            &self.label
        }
    }
}

/// A chart series offered for selection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartCandidate {
    pub key: String,
    pub frequency: usize,
    pub value_count: usize,
    pub sample: Option<f64>,
    pub values: Vec<f64>,
}

/// A table column offered for selection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    pub key: String,
    pub value_type: ValueType,
    pub sample: Value,
}

/// The fields a sample response offers for a widget kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Candidates {
    Card {
        fields: Vec<ExploredField>,
    },
    Chart {
        series: Vec<ChartCandidate>,
    },
    #[serde(rename_all = "camelCase")]
    Table {
        columns: Vec<TableColumn>,
        row_count: usize,
    },
}

/// Discover the selectable fields of `sample` for `kind`
pub fn candidates(sample: &Value, kind: FieldKind) -> Result<Candidates, SelectionError> {
    match kind {
        FieldKind::Card => Ok(Candidates::Card {
            fields: explore(sample),
        }),
        FieldKind::Chart => {
            let flat = flatten(sample);
            if flat.is_empty() {
                return Err(SelectionError::NoNumericData);
            }
            let series = flat
                .ranked()
                .map(|(key, values)| ChartCandidate {
                    key: key.to_string(),
                    frequency: flat.frequency(key),
                    value_count: values.len(),
                    sample: values.first().copied(),
                    values: values.to_vec(),
                })
                .collect();
            Ok(Candidates::Chart { series })
        }
        FieldKind::Table => {
            let records = find_record_array(sample)
                .filter(|records| !records.is_empty())
                .ok_or(SelectionError::NoArrayData)?;
            let Value::Object(first) = &records[0] else {
                return Err(SelectionError::RecordsNotObjects);
            };
            let columns = first
                .iter()
                .map(|(key, value)| TableColumn {
                    key: key.clone(),
                    value_type: ValueType::of(value),
                    sample: value.clone(),
                })
                .collect();
            Ok(Candidates::Table {
                columns,
                row_count: records.len(),
            })
        }
    }
}

/// Outcome of a selection click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Added,
    Removed,
    Replaced,
}

/// The selections being assembled for one widget, enforcing the per-kind rules
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSet {
    kind: FieldKind,
    fields: Vec<FieldSelection>,
}

impl SelectionSet {
    pub fn new(kind: FieldKind) -> Self {
        SelectionSet {
            kind,
            fields: Vec::new(),
        }
    }

    pub fn from_fields(kind: FieldKind, fields: Vec<FieldSelection>) -> Self {
        SelectionSet { kind, fields }
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn fields(&self) -> &[FieldSelection] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<FieldSelection> {
        self.fields
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.fields.iter().any(|f| f.path == path)
    }

    pub fn paths(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.path.as_str()).collect()
    }

    /// Apply a click on `path` carrying `value`
    ///
    /// Card and table selections toggle. A chart click replaces the current series;
    /// `value` is the series (an array) or a single value.
    pub fn select(&mut self, path: &str, value: &Value) -> Result<SelectionChange, SelectionError> {
        if path.is_empty() {
            return Err(SelectionError::EmptyPath);
        }

        match self.kind {
            FieldKind::Chart => {
                let values: Vec<f64> = match value {
                    Value::Array(items) => items.iter().filter_map(coerce_number).collect(),
                    other => coerce_number(other).into_iter().collect(),
                };
                if values.is_empty() {
                    return Err(SelectionError::EmptyChartSeries(path.to_string()));
                }
                let change = if self.fields.is_empty() {
                    SelectionChange::Added
                } else {
                    SelectionChange::Replaced
                };
                self.fields = vec![FieldSelection::chart(path, &values)];
                Ok(change)
            }
            FieldKind::Table if path.contains('.') => {
                Err(SelectionError::NestedTableColumn(path.to_string()))
            }
            FieldKind::Table | FieldKind::Card => {
                if let Some(pos) = self.fields.iter().position(|f| f.path == path) {
                    self.fields.remove(pos);
                    return Ok(SelectionChange::Removed);
                }
                let field = match self.kind {
                    FieldKind::Table => FieldSelection::table(path, value),
                    _ => FieldSelection::card(path, value),
                };
                self.fields.push(field);
                Ok(SelectionChange::Added)
            }
        }
    }

    /// Select a path by looking its value up in the sample response
    pub fn select_in_sample(
        &mut self,
        path: &str,
        sample: &Value,
    ) -> Result<SelectionChange, SelectionError> {
        match self.kind {
            FieldKind::Card => {
                let value = crate::path::resolve(sample, path).unwrap_or(&Value::Null);
                self.select(path, value)
            }
            FieldKind::Table => {
                let value = find_record_array(sample)
                    .and_then(|records| records.first())
                    .and_then(|first| first.get(path))
                    .unwrap_or(&Value::Null);
                self.select(path, value)
            }
            FieldKind::Chart => {
                let flat = flatten(sample);
                let values = flat.values(path).unwrap_or(&[]);
                let series = Value::Array(values.iter().map(|v| Value::from(*v)).collect());
                self.select(path, &series)
            }
        }
    }

    pub fn relabel(&mut self, index: usize, label: impl Into<String>) -> Result<(), SelectionError> {
        let field = self
            .fields
            .get_mut(index)
            .ok_or(SelectionError::IndexOutOfRange(index))?;
        field.label = label.into();
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<FieldSelection, SelectionError> {
        if index >= self.fields.len() {
            return Err(SelectionError::IndexOutOfRange(index));
        }
        Ok(self.fields.remove(index))
    }

    /// Check the per-kind invariants before a widget is built
    pub fn validate(&self) -> Result<(), SelectionError> {
        validate_fields(self.kind, &self.fields)
    }
}

/// Check the per-kind selection invariants of a widget's stored fields
pub fn validate_fields(kind: FieldKind, fields: &[FieldSelection]) -> Result<(), SelectionError> {
    if fields.is_empty() {
        return Err(SelectionError::NoSelections);
    }

    match kind {
        FieldKind::Card => {}
        FieldKind::Chart => {
            if fields.len() != 1 {
                return Err(SelectionError::MultipleChartFields(fields.len()));
            }
            let field = &fields[0];
            if field.chart_values.as_ref().map_or(true, |v| v.is_empty()) {
                return Err(SelectionError::EmptyChartSeries(field.path.clone()));
            }
        }
        FieldKind::Table => {
            let mut seen = std::collections::HashSet::new();
            for field in fields {
                if field.path.contains('.') {
                    return Err(SelectionError::NestedTableColumn(field.path.clone()));
                }
                if !seen.insert(field.path.as_str()) {
                    return Err(SelectionError::DuplicateColumn(field.path.clone()));
                }
            }
        }
    }

    for field in fields {
        if field.path.is_empty() {
            return Err(SelectionError::EmptyPath);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ipo_sample() -> Value {
        json!({
            "upcoming": [
                {"symbol": "ABC", "min_price": 100, "lot": {"size": 10}},
                {"symbol": "XYZ", "min_price": "120.5", "lot": {"size": 20}}
            ],
            "count": 2
        })
    }

    #[test]
    fn test_card_candidates_and_toggle() {
        let sample = ipo_sample();
        let Candidates::Card { fields } = candidates(&sample, FieldKind::Card).unwrap() else {
            panic!("expected card candidates");
        };
        assert!(fields.iter().any(|f| f.path == "upcoming[1].lot.size"));

        let mut set = SelectionSet::new(FieldKind::Card);
        assert_eq!(
            set.select_in_sample("upcoming[0].symbol", &sample).unwrap(),
            SelectionChange::Added
        );
        assert_eq!(set.fields()[0].label, "symbol");
        assert_eq!(set.fields()[0].value_type, ValueType::String);

        assert_eq!(
            set.select("upcoming[0].symbol", &json!("ABC")).unwrap(),
            SelectionChange::Removed
        );
        assert!(set.fields().is_empty());
        assert_eq!(set.validate(), Err(SelectionError::NoSelections));
    }

    #[test]
    fn test_table_candidates_from_first_record() {
        let sample = ipo_sample();
        let Candidates::Table { columns, row_count } =
            candidates(&sample, FieldKind::Table).unwrap()
        else {
            panic!("expected table candidates");
        };
        assert_eq!(row_count, 2);
        let keys: Vec<&str> = columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["symbol", "min_price", "lot"]);
        assert_eq!(columns[2].value_type, ValueType::Object);
    }

    #[test]
    fn test_table_rejects_bad_shapes() {
        assert_eq!(
            candidates(&json!({"a": 1}), FieldKind::Table),
            Err(SelectionError::NoArrayData)
        );
        assert_eq!(
            candidates(&json!([1, 2]), FieldKind::Table),
            Err(SelectionError::RecordsNotObjects)
        );
        assert_eq!(
            candidates(&json!([]), FieldKind::Table),
            Err(SelectionError::NoArrayData)
        );
    }

    #[test]
    fn test_table_selection_rules() {
        let mut set = SelectionSet::new(FieldKind::Table);
        set.select("symbol", &json!("ABC")).unwrap();
        set.select("min_price", &json!(100)).unwrap();
        assert_eq!(set.paths(), vec!["symbol", "min_price"]);
        assert_eq!(
            set.select("lot.size", &json!(10)),
            Err(SelectionError::NestedTableColumn("lot.size".into()))
        );
        assert_eq!(set.select("symbol", &json!("ABC")).unwrap(), SelectionChange::Removed);
        assert_eq!(set.paths(), vec!["min_price"]);
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_chart_selection_replaces() {
        let sample = ipo_sample();
        let Candidates::Chart { series } = candidates(&sample, FieldKind::Chart).unwrap() else {
            panic!("expected chart candidates");
        };
        assert_eq!(series[0].frequency, 2);
        assert_eq!(series.last().unwrap().key, "count");

        let mut set = SelectionSet::new(FieldKind::Chart);
        assert_eq!(
            set.select_in_sample("upcoming.min_price", &sample).unwrap(),
            SelectionChange::Added
        );
        assert_eq!(
            set.select_in_sample("upcoming.lot.size", &sample).unwrap(),
            SelectionChange::Replaced
        );
        assert_eq!(set.fields().len(), 1);
        assert_eq!(
            set.fields()[0].chart_values,
            Some(vec![json!(10.0), json!(20.0)])
        );
        assert!(set.validate().is_ok());

        assert_eq!(
            set.select_in_sample("missing", &sample),
            Err(SelectionError::EmptyChartSeries("missing".into()))
        );
    }

    #[test]
    fn test_chart_requires_numeric_data() {
        assert_eq!(
            candidates(&json!({"name": "abc"}), FieldKind::Chart),
            Err(SelectionError::NoNumericData)
        );
    }

    #[test]
    fn test_relabel_and_remove() {
        let mut set = SelectionSet::new(FieldKind::Card);
        set.select("data.price", &json!(1)).unwrap();
        set.relabel(0, "Last price").unwrap();
        assert_eq!(set.fields()[0].display_label(), "Last price");
        assert_eq!(set.relabel(3, "x"), Err(SelectionError::IndexOutOfRange(3)));
        assert_eq!(set.remove(0).unwrap().path, "data.price");
        assert_eq!(set.select("", &json!(1)), Err(SelectionError::EmptyPath));
    }

    #[test]
    fn test_validate_fields_invariants() {
        let duplicate = vec![
            FieldSelection::table("a", &json!(1)),
            FieldSelection::table("a", &json!(2)),
        ];
        assert_eq!(
            validate_fields(FieldKind::Table, &duplicate),
            Err(SelectionError::DuplicateColumn("a".into()))
        );

        let two_charts = vec![
            FieldSelection::chart("a", &[1.0]),
            FieldSelection::chart("b", &[2.0]),
        ];
        assert_eq!(
            validate_fields(FieldKind::Chart, &two_charts),
            Err(SelectionError::MultipleChartFields(2))
        );

        let mut empty_chart = FieldSelection::chart("a", &[1.0]);
        empty_chart.chart_values = None;
        assert_eq!(
            validate_fields(FieldKind::Chart, &[empty_chart]),
            Err(SelectionError::EmptyChartSeries("a".into()))
        );
    }

    #[test]
    fn test_selection_serializes_canonical_names() {
        let field = FieldSelection::chart("closes", &[1.0, 2.5]);
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["valueType"], "number");
        assert_eq!(json["kind"], "chart");
        assert_eq!(json["chartValues"], json!([1.0, 2.5]));

        let card = FieldSelection::card("a.b", &json!(true));
        let json = serde_json::to_value(&card).unwrap();
        assert!(json.get("chartValues").is_none());
        let back: FieldSelection = serde_json::from_value(json).unwrap();
        assert_eq!(back, card);
    }
}
