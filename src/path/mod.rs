//! Path addressing over arbitrary JSON responses
//!
//! Paths use `.` between object keys and either `[n]` or `.n` for array indices:
//! `data[0].price`, `data.0.price` and `.data..0.price` all address the same node.
//!
//! - **resolver**: resolve a path against a response, with a named recovery strategy
//!   for index-first paths whose array moved inside an object envelope
//! - **explorer**: enumerate the selectable nodes of a sample response

pub mod explorer;
pub mod resolver;

pub use explorer::{explore, explore_with, ExploreConfig, ExploredField};
pub use resolver::{
    array_recovery_walk, direct_walk, resolve, resolve_path, resolve_traced, Resolution,
    ResolveStrategy,
};

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static BRACKET_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+)\]").unwrap());

static LABEL_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.\[\]]").unwrap());

/// A parsed path: the non-empty segments of a dot/bracket address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a path string, normalizing `[n]` to `.n` and dropping empty segments
    pub fn parse(path: &str) -> Self {
        let normalized = BRACKET_INDEX.replace_all(path, ".$1");
        FieldPath {
            segments: normalized
                .split('.')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldPath {
            segments: segments
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Default display label for a selected path: its last key or index
pub fn default_label(path: &str) -> String {
    LABEL_SPLIT
        .split(path)
        .filter(|s| !s.is_empty())
        .last()
        .map(String::from)
        .unwrap_or_else(|| path.to_string())
}
