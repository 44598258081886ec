//! AppSync query client library
//!
//! Executes query-over-HTTP requests with an optional SQLite response cache that
//! can serve results while the endpoint is unreachable, and follows `nextToken`
//! cursors to stream paginated results.

pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod paginator;
pub mod request;
pub mod transport;

pub use client::{AppSyncClient, ExecutionObserver};
pub use config::ClientConfig;
pub use error::QueryError;
pub use request::{CacheExpiry, CachePriority, QueryRequest};
