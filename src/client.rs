//! Cache-aware query client
//!
//! `AppSyncClient` wraps the request executor with an optional on-disk cache.
//! The cache priority decides which source is consulted first:
//!
//! - **Network first**: go to the network; if the endpoint is unreachable, serve a
//!   live cache entry instead. HTTP status errors are never masked by the cache.
//! - **Cache first**: serve a live cache entry if present; otherwise go to the
//!   network and surface any failure as-is.
//!
//! Every successful network response is written to the cache together with a
//! sweep of expired entries.
//!
//! Concurrent calls for the same request are not coordinated. Both may miss the
//! cache and hit the network, and the last write wins.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheEntry, CacheStore};
use crate::config::ClientConfig;
use crate::error::QueryError;
use crate::executor::RequestExecutor;
use crate::request::{CacheExpiry, CachePriority, QueryRequest};
use crate::transport::{HttpTransport, ReqwestTransport};

/// Receives notifications when a query starts and finishes
///
/// Useful for driving progress indicators. Both methods default to no-ops.
pub trait ExecutionObserver: Send + Sync {
    /// Called before the cache or the network is consulted
    fn on_started(&self, _request: &QueryRequest) {}

    /// Called once with the outcome, whether data came from the cache or the network
    fn on_finished(&self, _request: &QueryRequest, _succeeded: bool) {}
}

/// Query client with an optional persistent response cache
#[derive(Clone)]
pub struct AppSyncClient {
    executor: RequestExecutor,
    cache: Option<CacheStore>,
    cache_expiry: CacheExpiry,
    observer: Option<Arc<dyn ExecutionObserver>>,
}

impl std::fmt::Debug for AppSyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppSyncClient")
            .field("cache", &self.cache)
            .field("cache_expiry", &self.cache_expiry)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl AppSyncClient {
    /// Creates a client without a cache
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            executor: RequestExecutor::new(transport),
            cache: None,
            cache_expiry: CacheExpiry::default(),
            observer: None,
        }
    }

    /// Creates a client over `reqwest`, opening the cache store if caching is enabled
    pub async fn from_config(config: &ClientConfig) -> Result<Self, QueryError> {
        let client = Self::new(Arc::new(ReqwestTransport::new()))
            .with_cache_expiry(config.cache_expiry);

        if !config.caching_enabled {
            return Ok(client);
        }

        let store = CacheStore::open(&config.cache_root).await?;
        Ok(client.with_cache(store))
    }

    /// Attaches a cache store
    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets how long cache entries stay usable
    pub fn with_cache_expiry(mut self, cache_expiry: CacheExpiry) -> Self {
        self.cache_expiry = cache_expiry;
        self
    }

    /// Attaches an observer notified around each execution
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The attached cache store, if any
    pub fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_ref()
    }

    /// Maximum age of a cached entry that is still served
    pub fn cache_expiry(&self) -> CacheExpiry {
        self.cache_expiry
    }

    /// Executes a request, consulting the cache according to `priority`
    ///
    /// Without a cache store this is a plain network call and `priority` has no effect.
    ///
    /// # Returns
    /// * `Ok(Value)` - The response `data`, from the network or a live cache entry
    /// * `Err(QueryError)` - The failure of whichever layer could not answer
    #[instrument(skip(self, request), fields(endpoint = %request.endpoint))]
    pub async fn execute(
        &self,
        request: &QueryRequest,
        priority: CachePriority,
    ) -> Result<Value, QueryError> {
        if let Some(observer) = &self.observer {
            observer.on_started(request);
        }

        let result = match &self.cache {
            None => self.executor.execute(request).await,
            Some(cache) => self.execute_with_cache(cache, request, priority).await,
        };

        if let Some(observer) = &self.observer {
            observer.on_finished(request, result.is_ok());
        }
        result
    }

    async fn execute_with_cache(
        &self,
        cache: &CacheStore,
        request: &QueryRequest,
        priority: CachePriority,
    ) -> Result<Value, QueryError> {
        let key = request
            .cache_key()
            .map_err(|e| QueryError::Decode(format!("Failed to serialize request: {e}")))?;

        match priority {
            CachePriority::CacheFirst => {
                if let Some(data) = self.read_live(cache, &key).await? {
                    debug!(%key, "Cache hit");
                    return Ok(data);
                }
                debug!(%key, "Cache miss, querying network");

                let data = self.executor.execute(request).await?;
                self.store(cache, &key, &data).await?;
                Ok(data)
            }
            CachePriority::NetworkFirst => match self.executor.execute(request).await {
                Ok(data) => {
                    self.store(cache, &key, &data).await?;
                    Ok(data)
                }
                Err(err) if err.is_connectivity() => match self.read_live(cache, &key).await? {
                    Some(data) => {
                        warn!(%key, error = %err, "Network unreachable, serving cached data");
                        Ok(data)
                    }
                    None => {
                        debug!(%key, "Network unreachable and no cached data");
                        Err(err)
                    }
                },
                Err(err) => Err(err),
            },
        }
    }

    /// Reads `key` and discards the entry if it has expired
    async fn read_live(&self, cache: &CacheStore, key: &str) -> Result<Option<Value>, QueryError> {
        let now = Utc::now().timestamp_millis();
        let entry = cache.read(key).await?;

        Ok(entry
            .filter(|entry| !entry.is_expired(self.cache_expiry, now))
            .map(|entry| entry.data))
    }

    /// Writes a fresh entry and sweeps expired ones in the same transaction
    async fn store(&self, cache: &CacheStore, key: &str, data: &Value) -> Result<(), QueryError> {
        let entry = CacheEntry::new(Utc::now().timestamp_millis(), data.clone());
        let swept = cache.write(key, &entry, self.cache_expiry).await?;
        debug!(%key, swept, "Cached response");
        Ok(())
    }
}
