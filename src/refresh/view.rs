use crate::error::{ConfigError, ExtractionError, FetchError};
use crate::extract::{Extraction, ResolvedData};
use chrono::{DateTime, Utc};
use serde::Serialize;

const RATE_LIMIT_HINT: &str =
    "The API has rate limiting enabled. Please wait before refreshing or increase the refresh interval.";
const RECONFIGURE_HINT: &str =
    "The API response structure may have changed. Reconfigure the widget fields.";

/// Error text shown in place of widget data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl DisplayError {
    pub fn new(message: impl Into<String>) -> Self {
        DisplayError {
            message: message.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: &str) -> Self {
        self.hint = Some(hint.to_string());
        self
    }
}

impl From<&FetchError> for DisplayError {
    fn from(err: &FetchError) -> Self {
        match err {
            FetchError::RateLimited { .. } => {
                DisplayError::new(format!("Rate Limit Exceeded: {}", err)).with_hint(RATE_LIMIT_HINT)
            }
            _ => DisplayError::new(err.to_string()),
        }
    }
}

impl From<&ExtractionError> for DisplayError {
    fn from(err: &ExtractionError) -> Self {
        let display = DisplayError::new(err.to_string());
        if err.needs_reconfigure() {
            display.with_hint(RECONFIGURE_HINT)
        } else {
            display
        }
    }
}

impl From<&ConfigError> for DisplayError {
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::EmptyEndpoint => {
                DisplayError::new("No API endpoint configured for this widget")
            }
            ConfigError::InvalidEndpoint { .. } => {
                DisplayError::new("Invalid API endpoint URL format")
            }
            other => DisplayError::new(other.to_string()),
        }
    }
}

/// Display state of one widget after a refresh cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResolvedData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DisplayError>,
    /// Set when the fetch itself succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl WidgetView {
    pub fn loaded(extraction: Extraction, fetched_at: DateTime<Utc>) -> Self {
        WidgetView {
            data: Some(extraction.data),
            warning: extraction.warning.map(|w| w.to_string()),
            error: None,
            fetched_at: Some(fetched_at),
        }
    }

    pub fn failed(error: DisplayError, fetched_at: Option<DateTime<Utc>>) -> Self {
        WidgetView {
            data: None,
            warning: None,
            error: Some(error),
            fetched_at,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::MissingFields;
    use serde_json::json;

    #[test]
    fn test_rate_limit_display() {
        let display = DisplayError::from(&FetchError::RateLimited {
            retry_after: Some(60),
        });
        assert_eq!(
            display.message,
            "Rate Limit Exceeded: Rate limit exceeded. Please try again after 60 seconds."
        );
        assert_eq!(display.hint.as_deref(), Some(RATE_LIMIT_HINT));

        let display = DisplayError::from(&FetchError::Transport("connection reset".into()));
        assert_eq!(display, DisplayError::new("connection reset"));
    }

    #[test]
    fn test_shape_drift_suggests_reconfigure() {
        let display = DisplayError::from(&ExtractionError::NoArrayFound);
        assert_eq!(display.hint.as_deref(), Some(RECONFIGURE_HINT));

        let display = DisplayError::from(&ExtractionError::LiveFeedDelegated);
        assert!(display.hint.is_none());
    }

    #[test]
    fn test_config_messages() {
        assert_eq!(
            DisplayError::from(&ConfigError::EmptyEndpoint).message,
            "No API endpoint configured for this widget"
        );
        let invalid = ConfigError::InvalidEndpoint {
            endpoint: "nope".into(),
            reason: "relative URL without a base".into(),
        };
        assert_eq!(
            DisplayError::from(&invalid).message,
            "Invalid API endpoint URL format"
        );
    }

    #[test]
    fn test_loaded_view_carries_warning() {
        let extraction = Extraction {
            data: ResolvedData::Raw(json!({"a": 1})),
            warning: Some(MissingFields {
                labels: vec!["volume".into()],
            }),
        };
        let view = WidgetView::loaded(extraction, Utc::now());
        assert!(!view.is_error());
        assert_eq!(view.warning.as_deref(), Some("Some fields not found: volume"));

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("error").is_none());
        assert!(json.get("fetchedAt").is_some());
    }
}
