//! SQLite-backed store for cached query responses
//!
//! Provides a `CacheStore` that keeps one row per cache key with the time it was
//! written, and sweeps expired rows in the same transaction as each write.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::request::CacheExpiry;

/// File name of the cache database inside the cache root
pub const CACHE_DB_FILE_NAME: &str = "aws_appsync_cache.db";

/// Sidecar files SQLite may leave next to the database
const SIDECAR_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    timestamp_millis INTEGER NOT NULL,
    data TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS cache_entries_timestamp ON cache_entries (timestamp_millis);
";

/// Errors raised by the cache store
#[derive(Debug, Error)]
pub enum CacheError {
    /// SQLite query or transaction failed
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem error while creating or deleting the store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be serialized or parsed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Background task running the store operation failed
    #[error("Cache task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Another thread panicked while holding the connection
    #[error("Cache connection lock poisoned")]
    LockPoisoned,

    /// The store was closed or destroyed
    #[error("Cache store is closed")]
    Closed,
}

/// A cached response payload and when it was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Epoch milliseconds of the write
    pub timestamp_millis: i64,
    /// The `data` value of the response
    pub data: Value,
}

impl CacheEntry {
    /// Creates an entry stamped with the given write time
    pub fn new(timestamp_millis: i64, data: Value) -> Self {
        Self {
            timestamp_millis,
            data,
        }
    }

    /// Whether the entry is expired when read at `now_millis`
    ///
    /// An entry written at T with expiry D is expired from T + D onwards.
    pub fn is_expired(&self, expiry: CacheExpiry, now_millis: i64) -> bool {
        match expiry.cutoff_millis(now_millis) {
            Some(cutoff) => self.timestamp_millis <= cutoff,
            None => false,
        }
    }
}

/// Handle to the on-disk cache database
///
/// Cloning the handle shares the underlying connection. Closing it through any
/// clone closes it for all of them.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Path of the database file
    path: PathBuf,
    /// `None` once the store has been closed
    conn: Arc<Mutex<Option<Connection>>>,
}

impl CacheStore {
    /// Opens (or creates) the cache database at `<root>/aws_appsync_cache.db`
    ///
    /// # Arguments
    /// * `root` - Directory holding the database; created if missing
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = Self::db_path(root.as_ref());
        let open_path = path.clone();

        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, CacheError> {
            if let Some(parent) = open_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let conn = Connection::open(&open_path)?;
            conn.execute_batch(SCHEMA)?;
            Ok(conn)
        })
        .await??;

        debug!(path = %path.display(), "Opened cache store");

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    /// Opens the cache database in the platform temp directory
    pub async fn open_default() -> Result<Self, CacheError> {
        Self::open(std::env::temp_dir()).await
    }

    /// Returns the database path used for a given cache root
    pub fn db_path(root: &Path) -> PathBuf {
        root.join(CACHE_DB_FILE_NAME)
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` against the open connection on the blocking thread pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, CacheError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| CacheError::LockPoisoned)?;
            let conn = guard.as_mut().ok_or(CacheError::Closed)?;
            f(conn)
        })
        .await?
    }

    /// Looks up the entry stored under `key`
    ///
    /// Expired entries are returned as-is; callers decide whether they are usable.
    pub async fn read(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let row: Option<(i64, String)> = conn
                .query_row(
                    "SELECT timestamp_millis, data FROM cache_entries WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match row {
                Some((timestamp_millis, data)) => Ok(Some(CacheEntry {
                    timestamp_millis,
                    data: serde_json::from_str(&data)?,
                })),
                None => Ok(None),
            }
        })
        .await
    }

    /// Writes `entry` under `key` and sweeps expired entries in one transaction
    ///
    /// The sweep uses the entry's timestamp as "now" and is skipped entirely for
    /// [`CacheExpiry::Never`]. Either both the write and the sweep are committed
    /// or neither is.
    ///
    /// # Returns
    /// The number of entries removed by the sweep
    pub async fn write(
        &self,
        key: &str,
        entry: &CacheEntry,
        expiry: CacheExpiry,
    ) -> Result<usize, CacheError> {
        let key = key.to_string();
        let timestamp_millis = entry.timestamp_millis;
        let data = serde_json::to_string(&entry.data)?;
        let cutoff = expiry.cutoff_millis(timestamp_millis);

        let swept = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO cache_entries (key, timestamp_millis, data) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                        timestamp_millis = excluded.timestamp_millis,
                        data = excluded.data",
                    params![key, timestamp_millis, data],
                )?;
                let swept = match cutoff {
                    Some(cutoff) => delete_expired(&tx, cutoff)?,
                    None => 0,
                };
                tx.commit()?;
                Ok(swept)
            })
            .await?;

        debug!(swept, "Wrote cache entry");
        Ok(swept)
    }

    /// Deletes every entry older than `now_millis - expiry`
    ///
    /// # Returns
    /// The number of entries removed (always 0 for [`CacheExpiry::Never`])
    pub async fn sweep(&self, now_millis: i64, expiry: CacheExpiry) -> Result<usize, CacheError> {
        let Some(cutoff) = expiry.cutoff_millis(now_millis) else {
            return Ok(0);
        };
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let swept = delete_expired(&tx, cutoff)?;
            tx.commit()?;
            Ok(swept)
        })
        .await
    }

    /// Number of entries currently stored
    pub async fn len(&self) -> Result<usize, CacheError> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or_default())
        })
        .await
    }

    /// Whether the store holds no entries
    pub async fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len().await? == 0)
    }

    /// Closes the connection; later operations fail with [`CacheError::Closed`]
    pub async fn close(&self) -> Result<(), CacheError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| CacheError::LockPoisoned)?;
            if let Some(conn) = guard.take() {
                conn.close().map_err(|(_, e)| CacheError::Sqlite(e))?;
            }
            Ok(())
        })
        .await?
    }

    /// Closes the store and deletes its database file
    ///
    /// Reopening the same root afterwards yields an empty store.
    pub async fn destroy(&self) -> Result<(), CacheError> {
        self.close().await?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || remove_db_files(&path)).await??;

        debug!(path = %self.path.display(), "Destroyed cache store");
        Ok(())
    }
}

/// Deletes the database at `<root>/aws_appsync_cache.db` without opening it
pub async fn reset_cache(root: impl AsRef<Path>) -> Result<(), CacheError> {
    let path = CacheStore::db_path(root.as_ref());
    tokio::task::spawn_blocking(move || remove_db_files(&path)).await?
}

/// Deletes entries strictly older than `cutoff`
///
/// An entry stamped exactly at the cutoff is kept, so a zero expiry never
/// removes the entry written in the same transaction. Reads still reject it.
fn delete_expired(conn: &Connection, cutoff: i64) -> Result<usize, CacheError> {
    Ok(conn.execute(
        "DELETE FROM cache_entries WHERE timestamp_millis < ?1",
        params![cutoff],
    )?)
}

fn remove_db_files(path: &Path) -> Result<(), CacheError> {
    remove_if_exists(path)?;
    for suffix in SIDECAR_SUFFIXES {
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(suffix);
        remove_if_exists(Path::new(&sidecar))?;
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), CacheError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
