//! Presentation data helpers: text for card values, table query handling and
//! "time ago" labels. Everything here is pure data; rendering lives elsewhere.

mod format;
mod table;

pub use format::{display_text, format_card_value, format_elapsed, format_number};
pub use table::{SortDirection, SortSpec, TableQuery};
