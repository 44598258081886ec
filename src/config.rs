//! Client configuration

use std::path::PathBuf;

use crate::request::{CacheExpiry, CachePriority};

/// Default number of items requested per page
pub const DEFAULT_BATCH_SIZE: u32 = 100;

/// Settings used to build an [`AppSyncClient`](crate::client::AppSyncClient)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Directory holding `aws_appsync_cache.db`
    pub cache_root: PathBuf,
    /// Whether to open a cache store at all
    pub caching_enabled: bool,
    /// How long cache entries stay usable
    pub cache_expiry: CacheExpiry,
    /// Default ordering of cache and network lookups
    pub priority: CachePriority,
    /// Page size for paginated queries
    pub batch_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cache_root: std::env::temp_dir(),
            caching_enabled: true,
            cache_expiry: CacheExpiry::default(),
            priority: CachePriority::NetworkFirst,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}
