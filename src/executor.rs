//! Request executor: one query, one HTTP round trip
//!
//! Serializes the request body, posts it with the authorization header, and
//! classifies the outcome. Caching is not this module's concern.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, instrument, warn};

use crate::error::QueryError;
use crate::request::QueryRequest;
use crate::transport::{HttpResponse, HttpTransport, SUCCESS_STATUS};

/// Maximum number of body characters included in log lines
const LOGGED_BODY_CHARS: usize = 500;

/// Sends single query requests over an [`HttpTransport`]
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor").finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Creates an executor that sends requests through `transport`
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Executes a request against its endpoint
    ///
    /// # Returns
    /// * `Ok(Value)` - The `data` field of the response
    /// * `Err(QueryError::Connectivity)` - The endpoint could not be reached
    /// * `Err(QueryError::Http)` - The endpoint answered with a status other than 200
    /// * `Err(QueryError::Decode)` - The body was not a JSON object with a `data` field
    #[instrument(skip(self, request), fields(endpoint = %request.endpoint))]
    pub async fn execute(&self, request: &QueryRequest) -> Result<Value, QueryError> {
        let body = request
            .body()
            .map_err(|e| QueryError::Decode(format!("Failed to serialize request: {e}")))?;

        let headers = [
            ("Authorization", request.access_token.as_str()),
            ("Content-Type", "application/json"),
        ];

        let response = self.transport.post(&request.endpoint, &headers, body).await?;
        extract_data(response)
    }
}

/// Classifies a response and pulls out its `data` field
fn extract_data(response: HttpResponse) -> Result<Value, QueryError> {
    if response.status != SUCCESS_STATUS {
        error!(
            status = response.status,
            body = %truncate(&response.body),
            "Endpoint returned non-success status"
        );
        return Err(QueryError::Http {
            status: response.status,
            body: response.body,
        });
    }

    let envelope: Value = serde_json::from_str(&response.body).map_err(|e| {
        error!(error = %e, body = %truncate(&response.body), "Failed to parse response body");
        QueryError::Decode(e.to_string())
    })?;

    let Value::Object(mut envelope) = envelope else {
        return Err(QueryError::Decode(
            "Response body is not a JSON object".to_string(),
        ));
    };

    // Partial errors are not interpreted; only `data` is returned
    if let Some(errors) = envelope.get("errors").filter(|errors| !errors.is_null()) {
        warn!(%errors, "Response contains an errors field");
    }

    envelope
        .remove("data")
        .ok_or_else(|| QueryError::Decode("Response has no data field".to_string()))
}

fn truncate(body: &str) -> String {
    body.chars().take(LOGGED_BODY_CHARS).collect()
}
