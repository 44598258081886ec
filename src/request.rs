//! Query request model and cache identity
//!
//! A request is an endpoint plus a query string and its variables. The endpoint
//! together with the serialized body forms the cache identity of the request.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Default time after which cache entries expire (24 hours)
pub const DEFAULT_CACHE_EXPIRY_HOURS: i64 = 24;

/// A single query-over-HTTP request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// URL the request is posted to
    pub endpoint: String,
    /// Query document
    pub query: String,
    /// Variables sent alongside the query
    pub variables: Map<String, Value>,
    /// Value of the `Authorization` header
    pub access_token: String,
}

/// Wire body of a request
#[derive(Debug, Serialize)]
struct RequestBody<'a> {
    query: &'a str,
    variables: Value,
}

impl QueryRequest {
    /// Creates a request with no variables
    pub fn new(
        endpoint: impl Into<String>,
        query: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            query: query.into(),
            variables: Map::new(),
            access_token: access_token.into(),
        }
    }

    /// Replaces the request variables
    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    /// Serializes `{query, variables}` with object keys in sorted order.
    ///
    /// Used both as the HTTP body and as input to the cache key, so two requests
    /// whose variables differ only in key order produce identical bytes.
    pub fn body(&self) -> Result<String, serde_json::Error> {
        let body = RequestBody {
            query: &self.query,
            variables: canonicalize(Value::Object(self.variables.clone())),
        };
        serde_json::to_string(&body)
    }

    /// Computes the cache key for this request.
    ///
    /// The key is the hex SHA-256 digest of the endpoint and the serialized body.
    pub fn cache_key(&self) -> Result<String, serde_json::Error> {
        let body = self.body()?;
        Ok(cache_key(&self.endpoint, &body))
    }
}

/// Hashes an endpoint and serialized body into a cache key
pub fn cache_key(endpoint: &str, body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(endpoint.as_bytes());
    hasher.update(b"\n");
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}

/// Rebuilds every object in `value` with its keys inserted in sorted order
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Order in which the cache and the network are consulted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CachePriority {
    /// Try the network, fall back to cache only when the endpoint is unreachable
    #[default]
    NetworkFirst,
    /// Serve a live cache entry if there is one, otherwise go to the network
    CacheFirst,
}

/// How long a cache entry stays usable after it was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheExpiry {
    /// Entries expire once this much time has passed since they were written
    After(Duration),
    /// Entries never expire and are never swept
    Never,
}

impl Default for CacheExpiry {
    fn default() -> Self {
        Self::After(Duration::hours(DEFAULT_CACHE_EXPIRY_HOURS))
    }
}

impl CacheExpiry {
    /// Creates an expiry of the given number of hours
    pub fn hours(hours: i64) -> Self {
        Self::After(Duration::hours(hours))
    }

    /// Timestamp at or before which entries are expired, relative to `now_millis`
    ///
    /// Returns `None` for [`CacheExpiry::Never`].
    pub fn cutoff_millis(&self, now_millis: i64) -> Option<i64> {
        match self {
            Self::After(ttl) => Some(now_millis.saturating_sub(ttl.num_milliseconds())),
            Self::Never => None,
        }
    }
}
