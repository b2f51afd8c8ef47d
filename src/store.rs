//! The dashboard's canonical widget list
//!
//! All mutations go through the store, so the scheduler can be resynchronised from one
//! place after every change.

use crate::config::RefreshConfig;
use crate::error::StoreError;
use crate::selection::validate_fields;
use crate::widget::{validate_endpoint, validate_interval, Position, Size, Widget, WidgetKind, WidgetPatch};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

const GRID_COLUMNS: usize = 3;
const GRID_SPACING: f64 = 20.0;

/// On-disk and export format of a dashboard
#[derive(Debug, Default, Serialize, Deserialize)]
struct DashboardExport {
    #[serde(default)]
    widgets: Vec<Widget>,
}

/// Outcome of [`WidgetStore::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Only presentation changed; the current data stays valid
    Unchanged,
    /// Endpoint, interval, parameters, headers or selections changed
    Refetch,
}

#[derive(Debug, Clone, Default)]
pub struct WidgetStore {
    widgets: Vec<Widget>,
    config: RefreshConfig,
}

impl WidgetStore {
    pub fn new(config: RefreshConfig) -> Self {
        WidgetStore {
            widgets: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn visible(&self) -> impl Iterator<Item = &Widget> {
        self.widgets.iter().filter(|w| !w.hidden)
    }

    pub fn hidden(&self) -> impl Iterator<Item = &Widget> {
        self.widgets.iter().filter(|w| w.hidden)
    }

    pub fn get(&self, id: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id == id)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Add a widget on top of the others
    ///
    /// A widget without a position is placed on a staggered grid sized for its kind.
    /// Misconfigured widgets are rejected.
    pub fn add(&mut self, mut widget: Widget) -> Result<&Widget, StoreError> {
        if self.get(&widget.id).is_some() {
            return Err(StoreError::DuplicateId(widget.id));
        }
        check_widget(&widget, &self.config)?;

        if widget.position == Position::default() {
            let (position, size) = grid_slot(widget.kind, self.widgets.len());
            widget.position = position;
            if widget.size == Size::default() {
                widget.size = size;
            }
        }
        if widget.z_index == 0 {
            widget.z_index = self.max_z_index() + 1;
        }

        info!(widget_id = %widget.id, kind = ?widget.kind, "widget added");
        self.widgets.push(widget);
        let added = self.widgets.len() - 1;
        Ok(&self.widgets[added])
    }

    pub fn remove(&mut self, id: &str) -> Result<Widget, StoreError> {
        let index = self.index_of(id)?;
        info!(widget_id = id, "widget removed");
        Ok(self.widgets.remove(index))
    }

    pub fn hide(&mut self, id: &str) -> Result<(), StoreError> {
        self.widget_mut(id)?.hidden = true;
        Ok(())
    }

    pub fn show(&mut self, id: &str) -> Result<(), StoreError> {
        self.widget_mut(id)?.hidden = false;
        Ok(())
    }

    /// Apply a partial update after validating the fields it touches
    pub fn update(&mut self, id: &str, patch: WidgetPatch) -> Result<UpdateOutcome, StoreError> {
        let index = self.index_of(id)?;
        let widget = &self.widgets[index];

        if let Some(seconds) = patch.refresh_interval_seconds {
            validate_interval(seconds, &self.config)?;
        }
        if let Some(kind) = widget.kind.field_kind() {
            if let Some(endpoint) = &patch.endpoint {
                validate_endpoint(endpoint)?;
            }
            if let Some(fields) = &patch.field_selections {
                validate_fields(kind, fields).map_err(crate::error::ConfigError::from)?;
            }
        }

        let before = widget.fetch_signature();
        let widget = &mut self.widgets[index];
        widget.apply(patch);

        if widget.fetch_signature() == before {
            Ok(UpdateOutcome::Unchanged)
        } else {
            debug!(widget_id = id, "widget fetch configuration changed");
            Ok(UpdateOutcome::Refetch)
        }
    }

    pub fn bring_to_front(&mut self, id: &str) -> Result<(), StoreError> {
        let top = self.max_z_index() + 1;
        self.widget_mut(id)?.z_index = top;
        Ok(())
    }

    pub fn send_to_back(&mut self, id: &str) -> Result<(), StoreError> {
        let bottom = self.widgets.iter().map(|w| w.z_index).min().unwrap_or(1) - 1;
        self.widget_mut(id)?.z_index = bottom;
        Ok(())
    }

    /// Reorder the list; `ids` must name every widget exactly once
    pub fn reorder<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<(), StoreError> {
        let unique: HashSet<&str> = ids.iter().map(|id| id.as_ref()).collect();
        if ids.len() != self.widgets.len() || unique.len() != ids.len() {
            return Err(StoreError::InvalidOrder);
        }

        let mut reordered = Vec::with_capacity(self.widgets.len());
        for id in ids {
            let index = self
                .widgets
                .iter()
                .position(|w| w.id == id.as_ref())
                .ok_or(StoreError::InvalidOrder)?;
            reordered.push(self.widgets.swap_remove(index));
        }
        self.widgets = reordered;
        Ok(())
    }

    pub fn export_json(&self) -> Result<String, StoreError> {
        let export = DashboardExport {
            widgets: self.widgets.clone(),
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    /// Replace all widgets with those of an export; the store is unchanged on error
    pub fn import_json(&mut self, json: &str) -> Result<usize, StoreError> {
        let export: DashboardExport = serde_json::from_str(json)?;

        let mut seen = HashSet::new();
        for widget in &export.widgets {
            if !seen.insert(widget.id.as_str()) {
                return Err(StoreError::DuplicateId(widget.id.clone()));
            }
        }
        for widget in &export.widgets {
            check_widget(widget, &self.config)?;
        }

        let count = export.widgets.len();
        self.widgets = export.widgets;
        info!(widgets = count, "dashboard imported");
        Ok(count)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = self.export_json().context("Failed to serialize dashboard")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write dashboard file: {}", path.display()))?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P, config: RefreshConfig) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dashboard file: {}", path.display()))?;
        let mut store = WidgetStore::new(config);
        store
            .import_json(&json)
            .with_context(|| format!("Invalid dashboard file: {}", path.display()))?;
        Ok(store)
    }

    fn index_of(&self, id: &str) -> Result<usize, StoreError> {
        self.widgets
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| StoreError::UnknownWidget(id.to_string()))
    }

    fn widget_mut(&mut self, id: &str) -> Result<&mut Widget, StoreError> {
        let index = self.index_of(id)?;
        Ok(&mut self.widgets[index])
    }

    fn max_z_index(&self) -> i64 {
        self.widgets.iter().map(|w| w.z_index).max().unwrap_or(0)
    }
}

fn check_widget(widget: &Widget, config: &RefreshConfig) -> Result<(), StoreError> {
    widget
        .validate(config)
        .map_err(|source| StoreError::InvalidWidget {
            id: widget.id.clone(),
            source,
        })
}

/// Default size for a widget kind
pub fn default_size(kind: WidgetKind) -> Size {
    let (width, height) = match kind {
        WidgetKind::Card => (400.0, 300.0),
        WidgetKind::Chart => (1000.0, 450.0),
        WidgetKind::Table => (800.0, 500.0),
        WidgetKind::LiveFeed => (600.0, 500.0),
    };
    Size { width, height }
}

fn grid_slot(kind: WidgetKind, existing: usize) -> (Position, Size) {
    let size = default_size(kind);
    let col = (existing % GRID_COLUMNS) as f64;
    let row = (existing / GRID_COLUMNS) as f64;

    let x = match kind {
        WidgetKind::Chart => GRID_SPACING,
        _ => col * (size.width + GRID_SPACING) + GRID_SPACING,
    };
    let y = row * (size.height + GRID_SPACING) + GRID_SPACING;
    (Position { x, y }, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::selection::FieldSelection;
    use serde_json::json;
    use tempfile::TempDir;

    fn widget(id: &str, kind: &str) -> Widget {
        serde_json::from_value(json!({
            "id": id,
            "title": id,
            "kind": kind,
            "endpoint": "https://api.example.com/data",
            "fieldSelections": [
                {"path": "symbol", "label": "Symbol", "kind": kind, "valueType": "string"}
            ]
        }))
        .unwrap()
    }

    fn store_with(ids: &[&str]) -> WidgetStore {
        let mut store = WidgetStore::default();
        for id in ids {
            store.add(widget(id, "card")).unwrap();
        }
        store
    }

    #[test]
    fn test_add_assigns_layout_and_z_order() {
        let mut store = WidgetStore::default();
        let first = store.add(widget("a", "card")).unwrap().clone();
        assert_eq!(first.z_index, 1);
        assert_eq!(first.position, Position { x: 20.0, y: 20.0 });

        let second = store.add(widget("b", "table")).unwrap().clone();
        assert_eq!(second.z_index, 2);
        assert_eq!(second.size, Size { width: 800.0, height: 500.0 });
        assert_eq!(second.position.x, 840.0);

        assert!(matches!(
            store.add(widget("a", "card")),
            Err(StoreError::DuplicateId(id)) if id == "a"
        ));
    }

    #[test]
    fn test_add_rejects_misconfigured_widgets() {
        let mut store = WidgetStore::default();

        let mut fast = widget("fast", "card");
        fast.refresh_interval_seconds = 1;
        assert!(matches!(
            store.add(fast),
            Err(StoreError::InvalidWidget {
                id,
                source: ConfigError::RefreshIntervalOutOfRange { seconds: 1, .. },
            }) if id == "fast"
        ));

        let mut unreachable = widget("nope", "card");
        unreachable.endpoint = "nope".into();
        assert!(matches!(
            store.add(unreachable),
            Err(StoreError::InvalidWidget {
                source: ConfigError::InvalidEndpoint { .. },
                ..
            })
        ));

        let bare: Widget = serde_json::from_value(json!({
            "id": "bare",
            "title": "bare",
            "kind": "chart",
            "endpoint": "https://api.example.com/data",
            "fieldSelections": [
                {"path": "close", "label": "close", "kind": "chart", "valueType": "number"}
            ]
        }))
        .unwrap();
        assert!(matches!(
            store.add(bare),
            Err(StoreError::InvalidWidget {
                source: ConfigError::Selection(_),
                ..
            })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_hide_show_and_remove() {
        let mut store = store_with(&["a", "b"]);
        store.hide("a").unwrap();
        assert_eq!(store.visible().count(), 1);
        assert_eq!(store.hidden().next().unwrap().id, "a");

        store.show("a").unwrap();
        assert_eq!(store.visible().count(), 2);

        assert_eq!(store.remove("b").unwrap().id, "b");
        assert!(matches!(
            store.hide("b"),
            Err(StoreError::UnknownWidget(_))
        ));
    }

    #[test]
    fn test_patch_updates() {
        let mut store = store_with(&["a"]);

        let outcome = store
            .update("a", WidgetPatch::moved(Position { x: 5.0, y: 6.0 }))
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Unchanged);
        assert_eq!(store.get("a").unwrap().position.x, 5.0);

        let outcome = store
            .update(
                "a",
                WidgetPatch {
                    endpoint: Some("https://api.example.com/v2".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Refetch);

        let err = store
            .update(
                "a",
                WidgetPatch {
                    refresh_interval_seconds: Some(5000),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Config(ConfigError::RefreshIntervalOutOfRange { .. })
        ));
        assert_eq!(store.get("a").unwrap().refresh_interval_seconds, 60);

        let err = store
            .update(
                "a",
                WidgetPatch {
                    field_selections: Some(vec![]),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Config(ConfigError::Selection(_))));

        let outcome = store
            .update(
                "a",
                WidgetPatch {
                    field_selections: Some(vec![FieldSelection::card("data.price", &json!(1))]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Refetch);
    }

    #[test]
    fn test_z_order() {
        let mut store = store_with(&["a", "b", "c"]);
        store.bring_to_front("a").unwrap();
        assert_eq!(store.get("a").unwrap().z_index, 4);

        store.send_to_back("b").unwrap();
        assert_eq!(store.get("b").unwrap().z_index, 1);
        store.send_to_back("c").unwrap();
        assert_eq!(store.get("c").unwrap().z_index, 0);
    }

    #[test]
    fn test_reorder() {
        let mut store = store_with(&["a", "b", "c"]);
        store.reorder(&["c", "a", "b"]).unwrap();
        let ids: Vec<&str> = store.widgets().iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        assert!(matches!(store.reorder(&["a", "b"]), Err(StoreError::InvalidOrder)));
        assert!(matches!(
            store.reorder(&["a", "a", "b"]),
            Err(StoreError::InvalidOrder)
        ));
        assert!(matches!(
            store.reorder(&["a", "b", "x"]),
            Err(StoreError::InvalidOrder)
        ));
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut store = store_with(&["a", "b"]);
        store.hide("b").unwrap();
        let json = store.export_json().unwrap();
        assert!(json.contains("\"widgets\""));

        let mut restored = WidgetStore::default();
        assert_eq!(restored.import_json(&json).unwrap(), 2);
        assert_eq!(restored.widgets(), store.widgets());

        assert!(matches!(
            restored.import_json("not json"),
            Err(StoreError::Parse(_))
        ));
        assert_eq!(restored.len(), 2);

        let duplicate = json!({"widgets": [
            {"id": "x", "title": "x", "kind": "card"},
            {"id": "x", "title": "y", "kind": "card"}
        ]});
        assert!(matches!(
            restored.import_json(&duplicate.to_string()),
            Err(StoreError::DuplicateId(_))
        ));

        assert_eq!(restored.import_json("{}").unwrap(), 0);
        assert!(restored.is_empty());
    }

    #[test]
    fn test_import_rejects_misconfigured_widgets() {
        let mut store = store_with(&["a"]);
        let export = json!({"widgets": [
            {
                "id": "ok",
                "title": "ok",
                "kind": "card",
                "endpoint": "https://api.example.com/data",
                "fieldSelections": [
                    {"path": "price", "label": "Price", "kind": "card", "valueType": "number"}
                ]
            },
            {"id": "bad", "title": "bad", "kind": "chart", "endpoint": "nope", "refreshIntervalSeconds": 0}
        ]});

        assert!(matches!(
            store.import_json(&export.to_string()),
            Err(StoreError::InvalidWidget { id, .. }) if id == "bad"
        ));
        assert_eq!(store.len(), 1);
        assert!(store.get("a").is_some());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(&path, export.to_string()).unwrap();
        assert!(WidgetStore::load(&path, RefreshConfig::default()).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dashboard.json");

        let store = store_with(&["a"]);
        store.save(&path).unwrap();

        let loaded = WidgetStore::load(&path, RefreshConfig::default()).unwrap();
        assert_eq!(loaded.widgets(), store.widgets());

        let missing = WidgetStore::load(dir.path().join("nope.json"), RefreshConfig::default());
        assert!(missing.is_err());
    }
}
