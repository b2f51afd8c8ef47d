//! assay-fields: List the fields a sample API response offers to a widget
//!
//! Usage:
//!   # Card paths from a file
//!   assay-fields response.json
//!
//!   # Chart series ranked by frequency, from stdin
//!   curl -s https://api.example.com/history | assay-fields --kind chart
//!
//!   # Table columns of the first record, compact output
//!   assay-fields --kind table --compact listings.json

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use assay::path::{explore_with, ExploreConfig};
use assay::selection::{candidates, Candidates, FieldKind};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{stdin, Read};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Kind {
    Card,
    Chart,
    Table,
}

impl From<Kind> for FieldKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Card => FieldKind::Card,
            Kind::Chart => FieldKind::Chart,
            Kind::Table => FieldKind::Table,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "assay-fields")]
#[command(about = "List selectable widget fields in a sample JSON response", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Widget kind to list candidates for
    #[arg(long, value_enum, default_value_t = Kind::Card)]
    kind: Kind,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,

    /// Maximum nesting depth for card paths (default: 32)
    #[arg(long)]
    max_depth: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("assay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut content = Vec::new();
    match &args.input {
        Some(file_path) => File::open(file_path)
            .with_context(|| format!("Failed to open input file: {}", file_path))?
            .read_to_end(&mut content)?,
        None => stdin()
            .read_to_end(&mut content)
            .context("Failed to read stdin")?,
    };
    let sample = assay::parse_document(content)?;

    let kind = FieldKind::from(args.kind);
    let found = match (kind, args.max_depth) {
        (FieldKind::Card, Some(max_depth)) => {
            let config = ExploreConfig {
                max_depth,
                ..ExploreConfig::default()
            };
            Candidates::Card {
                fields: explore_with(&sample, &config),
            }
        }
        _ => candidates(&sample, kind)?,
    };

    let count = match &found {
        Candidates::Card { fields } => fields.len(),
        Candidates::Chart { series } => series.len(),
        Candidates::Table { columns, .. } => columns.len(),
    };
    info!(kind = ?kind, candidates = count, "listed candidate fields");

    let output = if args.compact {
        serde_json::to_string(&found)?
    } else {
        serde_json::to_string_pretty(&found)?
    };
    println!("{}", output);

    Ok(())
}
