//! Widget records and the configuration flow that creates them

use crate::config::RefreshConfig;
use crate::error::{ConfigError, SelectionError};
use crate::refresh::FetchRequest;
use crate::selection::{validate_fields, FieldKind, FieldSelection, SelectionSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// What a widget displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetKind {
    Card,
    Chart,
    Table,
    LiveFeed,
}

impl WidgetKind {
    /// Selection strategy for this kind; live feeds take no field selections
    pub fn field_kind(self) -> Option<FieldKind> {
        match self {
            WidgetKind::Card => Some(FieldKind::Card),
            WidgetKind::Chart => Some(FieldKind::Chart),
            WidgetKind::Table => Some(FieldKind::Table),
            WidgetKind::LiveFeed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Default for Size {
    fn default() -> Self {
        Size {
            width: 400.0,
            height: 300.0,
        }
    }
}

fn default_refresh_interval() -> u64 {
    RefreshConfig::default().default_interval_secs
}

/// A configured data panel, as persisted by the widget store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub id: String,
    pub title: String,
    pub kind: WidgetKind,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub query_params: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub field_selections: Vec<FieldSelection>,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub z_index: i64,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The parts of a widget whose change requires a refetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSignature {
    endpoint: String,
    refresh_interval_seconds: u64,
    query_params: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    field_selections: Vec<FieldSelection>,
}

impl Widget {
    pub fn fetch_request(&self) -> FetchRequest {
        FetchRequest::new(&self.endpoint, &self.query_params, &self.headers)
    }

    pub fn fetch_signature(&self) -> FetchSignature {
        FetchSignature {
            endpoint: self.endpoint.clone(),
            refresh_interval_seconds: self.refresh_interval_seconds,
            query_params: self.query_params.clone(),
            headers: self.headers.clone(),
            field_selections: self.field_selections.clone(),
        }
    }

    pub fn apply(&mut self, patch: WidgetPatch) {
        let WidgetPatch {
            title,
            endpoint,
            query_params,
            headers,
            field_selections,
            refresh_interval_seconds,
            position,
            size,
            z_index,
            hidden,
        } = patch;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint;
        }
        if let Some(query_params) = query_params {
            self.query_params = query_params;
        }
        if let Some(headers) = headers {
            self.headers = clean_headers(headers);
        }
        if let Some(field_selections) = field_selections {
            self.field_selections = field_selections;
        }
        if let Some(seconds) = refresh_interval_seconds {
            self.refresh_interval_seconds = seconds;
        }
        if let Some(position) = position {
            self.position = position;
        }
        if let Some(size) = size {
            self.size = size;
        }
        if let Some(z_index) = z_index {
            self.z_index = z_index;
        }
        if let Some(hidden) = hidden {
            self.hidden = hidden;
        }
    }

    /// Check the record's configuration: endpoint, interval and selection invariants
    pub fn validate(&self, config: &RefreshConfig) -> Result<(), ConfigError> {
        validate_interval(self.refresh_interval_seconds, config)?;
        match self.kind.field_kind() {
            Some(kind) => {
                validate_endpoint(&self.endpoint)?;
                validate_fields(kind, &self.field_selections)?;
            }
            None if !self.field_selections.is_empty() => {
                return Err(SelectionError::LiveFeedFields.into());
            }
            None => {}
        }
        Ok(())
    }
}

/// A partial update to a widget; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetPatch {
    pub title: Option<String>,
    pub endpoint: Option<String>,
    pub query_params: Option<BTreeMap<String, String>>,
    pub headers: Option<BTreeMap<String, String>>,
    pub field_selections: Option<Vec<FieldSelection>>,
    pub refresh_interval_seconds: Option<u64>,
    pub position: Option<Position>,
    pub size: Option<Size>,
    pub z_index: Option<i64>,
    pub hidden: Option<bool>,
}

impl WidgetPatch {
    pub fn moved(position: Position) -> Self {
        WidgetPatch {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn resized(size: Size) -> Self {
        WidgetPatch {
            size: Some(size),
            ..Default::default()
        }
    }

    /// Whether the patch touches only on-screen geometry
    pub fn is_layout_only(&self) -> bool {
        self.title.is_none()
            && self.endpoint.is_none()
            && self.query_params.is_none()
            && self.headers.is_none()
            && self.field_selections.is_none()
            && self.refresh_interval_seconds.is_none()
            && self.hidden.is_none()
    }
}

/// Widget settings gathered before the sample fetch
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetDraft {
    pub title: String,
    pub kind: WidgetKind,
    pub endpoint: String,
    pub query_params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub refresh_interval_seconds: Option<u64>,
}

impl WidgetDraft {
    pub fn new(kind: WidgetKind, endpoint: impl Into<String>) -> Self {
        WidgetDraft {
            title: String::new(),
            kind,
            endpoint: endpoint.into(),
            query_params: BTreeMap::new(),
            headers: BTreeMap::new(),
            refresh_interval_seconds: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    pub fn with_refresh_interval(mut self, seconds: u64) -> Self {
        self.refresh_interval_seconds = Some(seconds);
        self
    }

    /// Validate the endpoint and produce the request for the sample fetch
    pub fn sample_request(&self) -> Result<FetchRequest, ConfigError> {
        validate_endpoint(&self.endpoint)?;
        Ok(FetchRequest::new(
            &self.endpoint,
            &self.query_params,
            &self.headers,
        ))
    }

    /// Build the widget record from the draft and the selections made against the sample
    pub fn build(self, selections: SelectionSet, config: &RefreshConfig) -> Result<Widget, ConfigError> {
        validate_endpoint(&self.endpoint)?;
        let interval = self
            .refresh_interval_seconds
            .unwrap_or(config.default_interval_secs);
        validate_interval(interval, config)?;

        if let Some(kind) = self.kind.field_kind() {
            if kind != selections.kind() {
                return Err(SelectionError::KindMismatch {
                    widget: self.kind,
                    selection: selections.kind(),
                }
                .into());
            }
            selections.validate()?;
        }

        let fields = selections.into_fields();
        let title = if self.title.trim().is_empty() {
            format!("Widget {} fields", fields.len())
        } else {
            self.title
        };

        Ok(Widget {
            id: generate_id(),
            title,
            kind: self.kind,
            endpoint: self.endpoint,
            query_params: self.query_params,
            headers: clean_headers(self.headers),
            field_selections: fields,
            refresh_interval_seconds: interval,
            position: Position::default(),
            size: Size::default(),
            z_index: 0,
            hidden: false,
            created_at: Some(Utc::now()),
        })
    }
}

/// Reject empty endpoints and strings that are not absolute http(s) URLs
pub fn validate_endpoint(endpoint: &str) -> Result<Url, ConfigError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(ConfigError::EmptyEndpoint);
    }

    let url = Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

pub fn validate_interval(seconds: u64, config: &RefreshConfig) -> Result<(), ConfigError> {
    if config.interval_in_range(seconds) {
        Ok(())
    } else {
        Err(ConfigError::RefreshIntervalOutOfRange {
            seconds,
            min: config.min_interval_secs,
            max: config.max_interval_secs,
        })
    }
}

/// Drop headers with an empty name or value
pub fn clean_headers(headers: BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .into_iter()
        .filter(|(k, v)| !k.trim().is_empty() && !v.is_empty())
        .collect()
}

/// Time-based widget id, unique within the process
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", millis, seq)
}
