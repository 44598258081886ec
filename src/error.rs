//! Error types for query execution
//!
//! Failures are split by the layer that produced them so the cache coordinator
//! can tell an unreachable endpoint apart from an endpoint that answered badly.

use thiserror::Error;

use crate::cache::CacheError;

/// Boxed transport-level cause carried by [`QueryError::Connectivity`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur when executing a query
#[derive(Debug, Error)]
pub enum QueryError {
    /// The endpoint could not be reached at all (no route, DNS, timeout before a response)
    #[error("Connectivity error: {0}")]
    Connectivity(#[source] BoxError),

    /// The endpoint answered with a non-success status code
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body was not JSON or lacked a `data` field
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The persistent cache store failed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl QueryError {
    /// Wraps any transport failure as a connectivity error
    pub fn connectivity(cause: impl Into<BoxError>) -> Self {
        Self::Connectivity(cause.into())
    }

    /// Whether this failure means the network was unreachable.
    ///
    /// Only these failures are eligible for a network-first cache fallback.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connectivity_errors_are_classified_as_connectivity() {
        assert!(QueryError::connectivity("connection refused").is_connectivity());
        assert!(!QueryError::Http {
            status: 500,
            body: "boom".to_string()
        }
        .is_connectivity());
        assert!(!QueryError::Decode("bad json".to_string()).is_connectivity());
        assert!(!QueryError::Cache(CacheError::Closed).is_connectivity());
    }

    #[test]
    fn test_http_error_display_includes_status_and_body() {
        let err = QueryError::Http {
            status: 401,
            body: "Unauthorized".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("401"));
        assert!(message.contains("Unauthorized"));
    }

    #[test]
    fn test_connectivity_error_exposes_source() {
        use std::error::Error as _;

        let err = QueryError::connectivity("dns failure");
        assert_eq!(err.source().map(|s| s.to_string()), Some("dns failure".to_string()));
    }
}
