use super::format::display_text;
use crate::extract::TableRow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

/// Search text, per-column filters and sort order applied to extracted table rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub column_filters: BTreeMap<String, String>,
    #[serde(default)]
    pub sort: Option<SortSpec>,
}

impl TableQuery {
    /// Sort by `column`, flipping the direction when it is already the sort column
    pub fn toggle_sort(&mut self, column: &str) {
        let direction = match &self.sort {
            Some(spec) if spec.column == column && spec.direction == SortDirection::Asc => {
                SortDirection::Desc
            }
            _ => SortDirection::Asc,
        };
        self.sort = Some(SortSpec {
            column: column.to_string(),
            direction,
        });
    }

    pub fn set_filter(&mut self, column: impl Into<String>, text: impl Into<String>) {
        let column: String = column.into();
        let text = text.into();
        if text.is_empty() {
            self.column_filters.remove(&column);
        } else {
            self.column_filters.insert(column, text);
        }
    }

    pub fn is_filtered(&self) -> bool {
        !self.search.trim().is_empty() || self.column_filters.values().any(|v| !v.is_empty())
    }

    /// Rows matching the search and every column filter, in sort order
    pub fn apply<'a>(&self, rows: &'a [TableRow]) -> Vec<&'a TableRow> {
        let search = self.search.trim().to_lowercase();
        let filters: Vec<(&str, String)> = self
            .column_filters
            .iter()
            .filter(|(_, text)| !text.is_empty())
            .map(|(column, text)| (column.as_str(), text.to_lowercase()))
            .collect();

        let mut matched: Vec<&TableRow> = rows
            .iter()
            .filter(|row| search.is_empty() || row_contains(row, &search))
            .filter(|row| {
                filters
                    .iter()
                    .all(|(column, text)| cell_text(row.get(column)).contains(text.as_str()))
            })
            .collect();

        if let Some(spec) = &self.sort {
            matched.sort_by(|a, b| {
                let ordering = compare_cells(a.get(&spec.column), b.get(&spec.column));
                match spec.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }
        matched
    }
}

fn row_contains(row: &TableRow, term: &str) -> bool {
    row.cells()
        .filter_map(|(_, value)| value)
        .any(|value| display_text(value).to_lowercase().contains(term))
}

fn cell_text(value: Option<&Value>) -> String {
    value.map(display_text).unwrap_or_default().to_lowercase()
}

/// Absent and null cells sort as empty text; two numbers compare numerically,
/// anything else by lowercase text
fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    if let (Some(Value::Number(x)), Some(Value::Number(y))) = (a, b) {
        if let (Some(x), Some(y)) = (x.as_f64(), y.as_f64()) {
            return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
        }
    }
    cell_text(a).cmp(&cell_text(b))
}
