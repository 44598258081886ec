//! Cache module for storing query responses on disk
//!
//! This module provides a SQLite-backed store that persists response payloads
//! keyed by request identity. Every write also sweeps entries older than the
//! configured expiry, inside the same transaction, so the store never needs a
//! background cleanup timer.

mod store;

pub use store::{reset_cache, CacheEntry, CacheError, CacheStore, CACHE_DB_FILE_NAME};
