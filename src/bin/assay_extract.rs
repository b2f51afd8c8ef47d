//! assay-extract: Run a widget's extraction against a fresh API response
//!
//! Usage:
//!   # Widget record from a file, response from stdin
//!   curl -s https://api.example.com/quote | assay-extract --widget price_card.json
//!
//!   # Widget taken from a dashboard export
//!   assay-extract --dashboard dashboard.json --id 18c3f2a-0 response.json
//!
//!   # Table rows matching a search, sorted by a column
//!   assay-extract --widget ipo_table.json --search nasdaq --sort price --desc response.json
//!
//! Prints the widget's display state as JSON. Exits with status 2 when the refresh
//! would show an error.

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{anyhow, Context, Result};
use assay::extract::{Extractor, Reflatten, ResolvedData};
use assay::present::{SortDirection, SortSpec, TableQuery};
use assay::refresh::{DisplayError, WidgetView};
use assay::{RefreshConfig, Widget, WidgetStore};
use chrono::Utc;
use clap::Parser;
use std::fs::File;
use std::io::{stdin, Read};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "assay-extract")]
#[command(about = "Extract a widget's data from a JSON API response", long_about = None)]
struct Args {
    /// Response file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    response: Option<String>,

    /// Widget record file
    #[arg(long, conflicts_with = "dashboard", required_unless_present = "dashboard")]
    widget: Option<String>,

    /// Dashboard export file holding the widget
    #[arg(long, requires = "id")]
    dashboard: Option<String>,

    /// Id of the widget within the dashboard
    #[arg(long, requires = "dashboard")]
    id: Option<String>,

    /// Re-flatten each response for chart widgets instead of using the captured values
    #[arg(long)]
    reflatten_charts: bool,

    /// Keep only table rows containing this text
    #[arg(long)]
    search: Option<String>,

    /// Sort table rows by this column
    #[arg(long)]
    sort: Option<String>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    desc: bool,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("assay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = RefreshConfig::default();
    let widget = load_widget(&args, &config)?;

    if let Err(err) = widget.validate(&config) {
        warn!(widget_id = %widget.id, error = %err, "widget configuration is invalid");
    }

    let mut content = Vec::new();
    match &args.response {
        Some(file_path) => File::open(file_path)
            .with_context(|| format!("Failed to open response file: {}", file_path))?
            .read_to_end(&mut content)?,
        None => stdin()
            .read_to_end(&mut content)
            .context("Failed to read stdin")?,
    };
    let response = assay::parse_document(content)?;

    let extractor = if args.reflatten_charts {
        Extractor::new(Reflatten)
    } else {
        Extractor::default()
    };

    let now = Utc::now();
    let mut view = match extractor.extract(&widget, &response) {
        Ok(extraction) => WidgetView::loaded(extraction, now),
        Err(err) => WidgetView::failed(DisplayError::from(&err), Some(now)),
    };

    let query = TableQuery {
        search: args.search.clone().unwrap_or_default(),
        sort: args.sort.clone().map(|column| SortSpec {
            column,
            direction: if args.desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            },
        }),
        ..TableQuery::default()
    };
    if let Some(ResolvedData::TableRows(rows)) = &view.data {
        if query.is_filtered() || query.sort.is_some() {
            let shown: Vec<_> = query.apply(rows).into_iter().cloned().collect();
            info!(rows = rows.len(), shown = shown.len(), "applied table query");
            view.data = Some(ResolvedData::TableRows(shown));
        }
    }

    let output = if args.compact {
        serde_json::to_string(&view)?
    } else {
        serde_json::to_string_pretty(&view)?
    };
    println!("{}", output);

    if view.is_error() {
        std::process::exit(2);
    }
    Ok(())
}

fn load_widget(args: &Args, config: &RefreshConfig) -> Result<Widget> {
    if let Some(path) = &args.widget {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read widget file: {}", path))?;
        return serde_json::from_str(&content)
            .with_context(|| format!("Invalid widget record: {}", path));
    }

    let (Some(path), Some(id)) = (&args.dashboard, &args.id) else {
        return Err(anyhow!("Either --widget or --dashboard with --id is required"));
    };
    let store = WidgetStore::load(path, config.clone())?;
    store
        .get(id)
        .cloned()
        .ok_or_else(|| anyhow!("Widget '{}' not found in {}", id, path))
}
