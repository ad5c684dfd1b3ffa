// Cache-aside gateway for GitHub API calls.
// Looks up each call in the store, falls back to the live client on a miss, and counts both.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ReportError, Result};
use crate::github::{ApiClient, ApiResponse};

use super::key::{CacheKey, fingerprint};
use super::store::KeyValueStore;

/// Default retention for cached responses: 1 hour.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// What to do when the store cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadFailurePolicy {
    /// Log a warning and fetch live, as if the key were absent.
    #[default]
    TreatAsMiss,
    /// Return the store error to the caller.
    Propagate,
}

/// Gateway behavior that does not affect cache keys.
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub default_ttl: u64,
    pub read_failure: ReadFailurePolicy,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL_SECS,
            read_failure: ReadFailurePolicy::default(),
        }
    }
}

/// Snapshot of the hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    pub hits: u64,
    pub misses: u64,
}

impl GatewayStats {
    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }

    /// Hit rate as a percentage, `None` before the first call.
    pub fn hit_rate(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.hits as f64 / total as f64 * 100.0),
        }
    }
}

impl fmt::Display for GatewayStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hits: {}, misses: {}, hit rate: ", self.hits, self.misses)?;
        match self.hit_rate() {
            Some(rate) => write!(f, "{:.1}%", rate),
            None => f.write_str("N/A"),
        }
    }
}

/// Wraps an [`ApiClient`] with a persistent response cache.
///
/// Every call derives a [`CacheKey`] from its identity, its parameters, and the
/// client configuration fingerprint. Hits are served from the store; misses
/// await the live call, then await the store write, then return. Failed live
/// calls are never written.
///
/// Identical calls issued concurrently may both miss and both fetch.
pub struct CachingGateway<C> {
    client: C,
    store: Arc<dyn KeyValueStore>,
    options: GatewayOptions,
    extra_cache_keys: String,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<C: ApiClient> CachingGateway<C> {
    pub fn new(client: C, store: Arc<dyn KeyValueStore>, config: &ClientConfig) -> Result<Self> {
        Self::with_options(client, store, config, GatewayOptions::default())
    }

    pub fn with_options(
        client: C,
        store: Arc<dyn KeyValueStore>,
        config: &ClientConfig,
        options: GatewayOptions,
    ) -> Result<Self> {
        config.validate()?;
        let extra_cache_keys = fingerprint(config)?;

        Ok(Self {
            client,
            store,
            options,
            extra_cache_keys,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Configuration fingerprint mixed into every key.
    pub fn extra_cache_keys(&self) -> &str {
        &self.extra_cache_keys
    }

    /// GraphQL query with the default TTL.
    pub async fn query_cached(&self, query: &str, parameters: &Map<String, Value>) -> Result<Value> {
        self.query_cached_with_ttl(query, parameters, self.options.default_ttl)
            .await
    }

    pub async fn query_cached_with_ttl(
        &self,
        query: &str,
        parameters: &Map<String, Value>,
        ttl_secs: u64,
    ) -> Result<Value> {
        let key = CacheKey::for_query(query, parameters, &self.extra_cache_keys)?;
        let label = query_label(query);
        self.cached(&key, ttl_secs, &label, parameters, || {
            self.client.graphql(query, parameters)
        })
        .await
    }

    /// REST route with the default TTL.
    pub async fn request_cached(
        &self,
        route: &str,
        options: &Map<String, Value>,
    ) -> Result<ApiResponse> {
        self.request_cached_with_ttl(route, options, self.options.default_ttl)
            .await
    }

    pub async fn request_cached_with_ttl(
        &self,
        route: &str,
        options: &Map<String, Value>,
        ttl_secs: u64,
    ) -> Result<ApiResponse> {
        let key = CacheKey::for_request(route, options, &self.extra_cache_keys)?;
        self.cached(&key, ttl_secs, route, options, || {
            self.client.request(route, options)
        })
        .await
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Log the counters and return them.
    pub fn report_stats(&self) -> GatewayStats {
        let stats = self.stats();
        let hit_rate = stats
            .hit_rate()
            .map(|rate| format!("{:.1}%", rate))
            .unwrap_or_else(|| "N/A".to_string());
        info!(
            hits = stats.hits,
            misses = stats.misses,
            hit_rate = %hit_rate,
            "cache stats"
        );
        stats
    }

    async fn cached<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl_secs: u64,
        label: &str,
        parameters: &Map<String, Value>,
        fetch: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(cached) = self.lookup::<T>(key).await? {
            self.hits.fetch_add(1, Ordering::Relaxed);
            let parameters = Value::Object(parameters.clone());
            debug!(call = label, parameters = %parameters, "cache hit");
            return Ok(cached);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let live = fetch().await?;
        let value = serde_json::to_value(&live)?;
        self.store.set(key, &value, ttl_secs).await?;
        Ok(live)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>> {
        let result = match self.store.get(key).await {
            Ok(Some(value)) => serde_json::from_value(value)
                .map(Some)
                .map_err(ReportError::from),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };

        match (result, self.options.read_failure) {
            (Ok(found), _) => Ok(found),
            (Err(e), ReadFailurePolicy::Propagate) => Err(e),
            (Err(e), ReadFailurePolicy::TreatAsMiss) => {
                warn!(error = %e, "cache read failed, fetching live");
                Ok(None)
            }
        }
    }
}

/// First non-empty line of a query, for log output.
fn query_label(query: &str) -> String {
    query
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}
