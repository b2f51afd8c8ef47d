//! Error types for field selection, extraction, fetching and widget configuration.
//!
//! Extraction and fetch errors are per-refresh display state; they never abort the
//! dashboard. Configuration and selection errors block widget creation.

use thiserror::Error;

/// Failures of a single extraction pass against a fresh response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error(
        "Selected fields not found in API response ({}). The API structure may have changed.",
        .labels.join(", ")
    )]
    PathNotFound { labels: Vec<String> },

    #[error("No array data found in API response. Table widgets require an array response.")]
    NoArrayFound,

    #[error("Chart data not found. Please reconfigure the widget.")]
    MissingChartData,

    #[error("Live-feed widgets are driven by their streaming connection")]
    LiveFeedDelegated,
}

impl ExtractionError {
    /// Whether the stored selections no longer match the response shape
    pub fn needs_reconfigure(&self) -> bool {
        matches!(
            self,
            ExtractionError::PathNotFound { .. }
                | ExtractionError::NoArrayFound
                | ExtractionError::MissingChartData
        )
    }
}

/// Errors reported by a [`crate::refresh::Fetcher`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Rate limit exceeded. {}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<u64> },

    #[error("API Error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("{0}")]
    Transport(String),
}

impl FetchError {
    /// Classify an HTTP failure, splitting out 429 responses
    pub fn from_status(status: u16, message: impl Into<String>, retry_after: Option<u64>) -> Self {
        if status == 429 {
            FetchError::RateLimited { retry_after }
        } else {
            let message = message.into();
            FetchError::Http {
                status,
                message: if message.is_empty() {
                    "Request failed".to_string()
                } else {
                    message
                },
            }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::RateLimited { .. } => Some(429),
            FetchError::Http { status, .. } => Some(*status),
            FetchError::Transport(_) => None,
        }
    }
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(seconds) => format!("Please try again after {} seconds.", seconds),
        None => "Please try again later.".to_string(),
    }
}

/// Invalid field selections, raised while a widget is being configured
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Field path is empty")]
    EmptyPath,

    #[error("Table columns must be top-level keys, got '{0}'")]
    NestedTableColumn(String),

    #[error("Column '{0}' is already selected")]
    DuplicateColumn(String),

    #[error("No valid numeric data found. Chart mode requires numeric values.")]
    NoNumericData,

    #[error("No array data found. Table mode requires an array response.")]
    NoArrayData,

    #[error("Array items must be objects to use table mode")]
    RecordsNotObjects,

    #[error("No fields selected")]
    NoSelections,

    #[error("A {widget:?} widget cannot take {selection:?} selections")]
    KindMismatch {
        widget: crate::widget::WidgetKind,
        selection: crate::selection::FieldKind,
    },

    #[error("Chart widgets take exactly one field, got {0}")]
    MultipleChartFields(usize),

    #[error("Chart field '{0}' carries no values")]
    EmptyChartSeries(String),

    #[error("Live-feed widgets do not take field selections")]
    LiveFeedFields,

    #[error("No selected field at position {0}")]
    IndexOutOfRange(usize),
}

/// Configuration-time errors that block widget creation or a config edit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Please provide an API endpoint URL")]
    EmptyEndpoint,

    #[error("Invalid URL format '{endpoint}': {reason}. Please include http:// or https://")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Refresh interval {seconds}s is outside {min}..={max} seconds")]
    RefreshIntervalOutOfRange { seconds: u64, min: u64, max: u64 },

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Errors from the widget store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Widget '{0}' not found")]
    UnknownWidget(String),

    #[error("Widget '{0}' already exists")]
    DuplicateId(String),

    #[error("Reorder must list every widget exactly once")]
    InvalidOrder,

    #[error("Widget '{id}' is misconfigured: {source}")]
    InvalidWidget {
        id: String,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid dashboard config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_message() {
        let err = FetchError::from_status(429, "Too Many Requests", Some(30));
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded. Please try again after 30 seconds."
        );
        assert_eq!(err.status(), Some(429));

        let err = FetchError::from_status(429, "", None);
        assert_eq!(err.to_string(), "Rate limit exceeded. Please try again later.");
    }

    #[test]
    fn test_http_error_message() {
        let err = FetchError::from_status(503, "", None);
        assert_eq!(err.to_string(), "API Error 503: Request failed");
    }

    #[test]
    fn test_path_not_found_lists_labels() {
        let err = ExtractionError::PathNotFound {
            labels: vec!["price".into(), "volume".into()],
        };
        assert!(err.to_string().contains("price, volume"));
        assert!(err.needs_reconfigure());
        assert!(!ExtractionError::LiveFeedDelegated.needs_reconfigure());
    }
}
