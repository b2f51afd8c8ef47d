//! Refresh runtime: the transport seam, a TTL response cache and per-widget scheduling
//!
//! The crate ships no HTTP client. Callers provide a [`Fetcher`]; the
//! [`RefreshScheduler`] drives it once per widget interval and reports each outcome as
//! a [`WidgetView`] over a channel.

mod fetcher;
mod scheduler;
mod view;

pub use fetcher::{CachedFetcher, FetchRequest, Fetcher};
pub use scheduler::{refresh_widget, RefreshEvent, RefreshScheduler, RefreshTrigger};
pub use view::{DisplayError, WidgetView};
