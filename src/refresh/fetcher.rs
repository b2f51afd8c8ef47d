use crate::error::{ConfigError, FetchError};
use crate::widget::validate_endpoint;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

/// Everything a transport needs to perform one GET
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    pub endpoint: String,
    pub query_params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
}

impl FetchRequest {
    /// Build a request, dropping empty parameters and headers
    ///
    /// `Content-Type: application/json` is added unless the caller set a content type.
    pub fn new(
        endpoint: &str,
        query_params: &BTreeMap<String, String>,
        headers: &BTreeMap<String, String>,
    ) -> Self {
        let query_params = query_params
            .iter()
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut headers: BTreeMap<String, String> = headers
            .iter()
            .filter(|(k, v)| !k.trim().is_empty() && !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }

        FetchRequest {
            endpoint: endpoint.trim().to_string(),
            query_params,
            headers,
        }
    }

    /// The endpoint with query parameters appended
    pub fn url(&self) -> Result<Url, ConfigError> {
        let mut url = validate_endpoint(&self.endpoint)?;
        if !self.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

/// Transport seam: performs a request and returns the parsed JSON body
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Value, FetchError>;
}

struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

/// Serves repeated requests from memory for `ttl` after a successful fetch
///
/// Failures are never cached. Expired entries are dropped whenever a response is stored.
pub struct CachedFetcher<F> {
    inner: F,
    ttl: Duration,
    entries: Mutex<HashMap<FetchRequest, CacheEntry>>,
}

impl<F: Fetcher> CachedFetcher<F> {
    pub fn new(inner: F, ttl: Duration) -> Self {
        CachedFetcher {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub fn invalidate(&self, request: &FetchRequest) -> bool {
        self.lock().remove(request).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<FetchRequest, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached(&self, request: &FetchRequest) -> Option<Value> {
        let mut entries = self.lock();
        match entries.get(request) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(request);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for CachedFetcher<F> {
    async fn fetch(&self, request: &FetchRequest) -> Result<Value, FetchError> {
        if let Some(value) = self.cached(request) {
            debug!(endpoint = %request.endpoint, "serving cached response");
            return Ok(value);
        }

        let value = self.inner.fetch(request).await?;
        let mut entries = self.lock();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        entries.insert(
            request.clone(),
            CacheEntry {
                value: value.clone(),
                stored_at: Instant::now(),
            },
        );
        Ok(value)
    }
}
