//! Extraction pipeline: re-derive a widget's data from a fresh response
//!
//! The pipeline is a pure function of `(widget, response)`. Card widgets re-resolve
//! each stored path and may succeed partially; table widgets re-discover the record
//! array and read the selected keys off every row; chart widgets take their series
//! from a [`ChartSource`], by default the snapshot captured at selection time.

use crate::error::ExtractionError;
use crate::flatten::flatten;
use crate::path::resolve;
use crate::selection::FieldSelection;
use crate::shape::{coerce_number, find_record_array, ValueType};
use crate::widget::{Widget, WidgetKind};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

/// One card entry; `value` is `None` when the path did not resolve
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardValue {
    pub label: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub value_type: ValueType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// A table row with exactly the selected columns, in selection order
///
/// A cell is `None` when the record lacks the key, which is distinct from a JSON `null`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRow {
    cells: Vec<(String, Option<Value>)>,
}

impl TableRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| value.as_ref())
    }

    pub fn has_cell(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.cells
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }
}

impl Serialize for TableRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let present = self.cells.iter().filter(|(_, v)| v.is_some()).count();
        let mut map = serializer.serialize_map(Some(present))?;
        for (name, value) in &self.cells {
            if let Some(value) = value {
                map.serialize_entry(name, value)?;
            }
        }
        map.end()
    }
}

/// Render-ready data for one widget refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ResolvedData {
    CardValues(Vec<CardValue>),
    ChartSeries(Vec<ChartPoint>),
    TableRows(Vec<TableRow>),
    /// The response itself, for widgets without selections
    Raw(Value),
}

/// Non-fatal annotation: some card fields were missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingFields {
    pub labels: Vec<String>,
}

impl fmt::Display for MissingFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Some fields not found: {}", self.labels.join(", "))
    }
}

/// Successful extraction, possibly partial
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub data: ResolvedData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<MissingFields>,
}

impl Extraction {
    fn complete(data: ResolvedData) -> Self {
        Extraction {
            data,
            warning: None,
        }
    }
}

/// Where a chart widget's series comes from on refresh
pub trait ChartSource: Send + Sync {
    /// The raw series for `selection`, or `None` when no data is available
    fn series(&self, selection: &FieldSelection, response: &Value) -> Option<Vec<f64>>;
}

/// Reuse the values captured from the sample response; the fresh response is ignored
#[derive(Debug, Clone, Copy, Default)]
pub struct FrozenSnapshot;

impl ChartSource for FrozenSnapshot {
    fn series(&self, selection: &FieldSelection, _response: &Value) -> Option<Vec<f64>> {
        let values = selection.chart_values.as_ref().filter(|v| !v.is_empty())?;
        Some(
            values
                .iter()
                .map(|v| coerce_number(v).unwrap_or(0.0))
                .collect(),
        )
    }
}

/// Re-flatten each fresh response and take the series under the stored key
#[derive(Debug, Clone, Copy, Default)]
pub struct Reflatten;

impl ChartSource for Reflatten {
    fn series(&self, selection: &FieldSelection, response: &Value) -> Option<Vec<f64>> {
        let flat = flatten(response);
        flat.values(&selection.path)
            .filter(|v| !v.is_empty())
            .map(<[f64]>::to_vec)
    }
}

/// Runs the extraction pipeline with a configurable chart source
pub struct Extractor {
    chart_source: Box<dyn ChartSource>,
}

impl Default for Extractor {
    fn default() -> Self {
        Extractor::new(FrozenSnapshot)
    }
}

impl Extractor {
    pub fn new(chart_source: impl ChartSource + 'static) -> Self {
        Extractor {
            chart_source: Box::new(chart_source),
        }
    }

    pub fn extract(&self, widget: &Widget, response: &Value) -> Result<Extraction, ExtractionError> {
        self.extract_fields(widget.kind, &widget.field_selections, response)
    }

    pub fn extract_fields(
        &self,
        kind: WidgetKind,
        selections: &[FieldSelection],
        response: &Value,
    ) -> Result<Extraction, ExtractionError> {
        match kind {
            WidgetKind::Chart => self.extract_chart(selections, response),
            WidgetKind::LiveFeed => Err(ExtractionError::LiveFeedDelegated),
            _ if selections.is_empty() => Ok(Extraction::complete(ResolvedData::Raw(
                response.clone(),
            ))),
            WidgetKind::Table => extract_table(selections, response),
            WidgetKind::Card => extract_card(selections, response),
        }
    }

    fn extract_chart(
        &self,
        selections: &[FieldSelection],
        response: &Value,
    ) -> Result<Extraction, ExtractionError> {
        let selection = selections.first().ok_or(ExtractionError::MissingChartData)?;
        let series = self
            .chart_source
            .series(selection, response)
            .ok_or(ExtractionError::MissingChartData)?;

        debug!(path = %selection.path, points = series.len(), "chart series ready");
        let points = series
            .into_iter()
            .enumerate()
            .map(|(i, value)| ChartPoint {
                label: format!("Item {}", i + 1),
                value,
            })
            .collect();
        Ok(Extraction::complete(ResolvedData::ChartSeries(points)))
    }
}

/// Extract with the default (frozen snapshot) chart behavior
pub fn extract(widget: &Widget, response: &Value) -> Result<Extraction, ExtractionError> {
    Extractor::default().extract(widget, response)
}

fn extract_table(
    selections: &[FieldSelection],
    response: &Value,
) -> Result<Extraction, ExtractionError> {
    let records = find_record_array(response)
        .filter(|records| !records.is_empty())
        .ok_or(ExtractionError::NoArrayFound)?;

    let rows: Vec<TableRow> = records
        .iter()
        .map(|record| TableRow {
            cells: selections
                .iter()
                .map(|field| {
                    let cell = match record {
                        Value::Object(map) => map.get(&field.path).cloned(),
                        _ => None,
                    };
                    (field.path.clone(), cell)
                })
                .collect(),
        })
        .collect();

    debug!(rows = rows.len(), columns = selections.len(), "table rows extracted");
    Ok(Extraction::complete(ResolvedData::TableRows(rows)))
}

fn extract_card(
    selections: &[FieldSelection],
    response: &Value,
) -> Result<Extraction, ExtractionError> {
    let (found, missing): (Vec<CardValue>, Vec<CardValue>) = selections
        .iter()
        .map(|field| CardValue {
            label: field.display_label().to_string(),
            path: field.path.clone(),
            value: resolve(response, &field.path).cloned(),
            value_type: field.value_type,
        })
        .partition(|card| card.value.is_some());

    if found.is_empty() {
        warn!(fields = missing.len(), "no selected field resolved");
        return Err(ExtractionError::PathNotFound {
            labels: missing.into_iter().map(|c| c.label).collect(),
        });
    }

    let warning = if missing.is_empty() {
        None
    } else {
        for card in &missing {
            warn!(label = %card.label, path = %card.path, "selected field not found");
        }
        Some(MissingFields {
            labels: missing.into_iter().map(|c| c.label).collect(),
        })
    };

    Ok(Extraction {
        data: ResolvedData::CardValues(found),
        warning,
    })
}
