use std::time::Duration;

/// Configuration for widget refresh scheduling and response caching
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Interval used when a widget does not set one, in seconds
    pub default_interval_secs: u64,

    /// Shortest allowed refresh interval, in seconds
    pub min_interval_secs: u64,

    /// Longest allowed refresh interval, in seconds
    pub max_interval_secs: u64,

    /// How long a fetched response is served from cache
    pub cache_ttl: Duration,

    /// Manual refresh requests that may wait behind an in-flight refresh
    pub manual_queue_depth: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            default_interval_secs: 60,
            min_interval_secs: 10,
            max_interval_secs: 3600,
            cache_ttl: Duration::from_secs(5 * 60),
            manual_queue_depth: 1,
        }
    }
}

impl RefreshConfig {
    pub fn interval_in_range(&self, seconds: u64) -> bool {
        (self.min_interval_secs..=self.max_interval_secs).contains(&seconds)
    }
}
