//! # Assay - field resolution and extraction for dashboard widgets
//!
//! A library for pointing dashboard widgets at arbitrary JSON APIs: pick fields from a
//! sample response, then re-extract the same fields from every later response, even
//! when its shape has drifted.
//!
//! ## Modules
//!
//! - **path**: resolve dotted/bracketed paths, enumerate selectable nodes
//! - **flatten**: reduce a response to numeric series for charts
//! - **selection**: per-kind selection rules (card, chart, table)
//! - **extract**: re-derive render-ready data from a fresh response
//! - **widget** / **store**: widget records, validation and the dashboard store
//! - **refresh**: transport seam, response cache, per-widget refresh scheduling
//! - **present**: value formatting and table search/sort
//! - **feed**: live quote parsing for streaming widgets
//!
//! ## Quick Start
//!
//! ### Path resolution
//!
//! ```rust
//! use assay::path::resolve;
//! use serde_json::json;
//!
//! let response = json!({"data": [{"price": 12.5}]});
//! assert_eq!(resolve(&response, "data[0].price"), Some(&json!(12.5)));
//!
//! // A path captured against the bare array still finds the wrapped one
//! assert_eq!(resolve(&response, "0.price"), Some(&json!(12.5)));
//! ```
//!
//! ### Selecting and extracting
//!
//! ```rust
//! use assay::{extract, FieldKind, RefreshConfig, ResolvedData, SelectionSet, WidgetDraft, WidgetKind};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let sample = json!({"quote": {"price": 10.0, "volume": 300}});
//! let mut selections = SelectionSet::new(FieldKind::Card);
//! selections.select_in_sample("quote.price", &sample)?;
//!
//! let widget = WidgetDraft::new(WidgetKind::Card, "https://api.example.com/quote")
//!     .build(selections, &RefreshConfig::default())?;
//!
//! let fresh = json!({"quote": {"price": 10.4}});
//! let extraction = extract(&widget, &fresh)?;
//! assert!(matches!(extraction.data, ResolvedData::CardValues(_)));
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde_json::Value;

pub mod config;
pub mod error;
pub mod extract;
pub mod feed;
pub mod flatten;
pub mod path;
pub mod present;
pub mod refresh;
pub mod selection;
pub mod shape;
pub mod store;
pub mod widget;

// Re-export commonly used types for convenience
pub use config::RefreshConfig;
pub use error::{ConfigError, ExtractionError, FetchError, SelectionError, StoreError};
pub use extract::{extract, ChartSource, Extraction, Extractor, FrozenSnapshot, Reflatten, ResolvedData};
pub use flatten::{flatten, FlattenedSeries};
pub use path::{resolve, FieldPath};
pub use refresh::{CachedFetcher, FetchRequest, Fetcher, RefreshEvent, RefreshScheduler, WidgetView};
pub use selection::{candidates, Candidates, FieldKind, FieldSelection, SelectionSet};
pub use shape::ValueType;
pub use store::WidgetStore;
pub use widget::{Widget, WidgetDraft, WidgetKind, WidgetPatch};

/// Parse a JSON document, using SIMD parsing when the input allows it
///
/// Object key order is preserved either way.
pub fn parse_document(mut bytes: Vec<u8>) -> Result<Value> {
    // simd-json parses in place and may leave the buffer modified on failure
    let fallback = bytes.clone();
    match simd_json::serde::from_slice::<Value>(&mut bytes) {
        Ok(value) => Ok(value),
        Err(_) => serde_json::from_slice(&fallback).context("Failed to parse JSON"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_document_keeps_key_order() {
        let value = parse_document(br#"{"z": 1, "a": [1, 2], "m": {"y": 0, "b": 1}}"#.to_vec())
            .unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(value["m"], json!({"y": 0, "b": 1}));
    }

    #[test]
    fn test_parse_document_rejects_garbage() {
        assert!(parse_document(b"{not json".to_vec()).is_err());
    }

    #[test]
    fn test_sample_to_refresh() {
        let sample = json!({"rows": [{"symbol": "A", "price": 1}, {"symbol": "B", "price": 2}]});
        let Candidates::Table { columns, .. } = candidates(&sample, FieldKind::Table).unwrap() else {
            panic!("expected table candidates");
        };

        let mut selections = SelectionSet::new(FieldKind::Table);
        for column in &columns {
            selections.select_in_sample(&column.key, &sample).unwrap();
        }
        let widget = WidgetDraft::new(WidgetKind::Table, "https://api.example.com/rows")
            .build(selections, &RefreshConfig::default())
            .unwrap();

        let fresh = json!([{"symbol": "C", "price": 3, "extra": true}]);
        let ResolvedData::TableRows(rows) = extract(&widget, &fresh).unwrap().data else {
            panic!("expected table rows");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("price"), Some(&json!(3)));
        assert!(!rows[0].has_cell("extra"));
    }
}
