//! HTTP transport used to post query bodies
//!
//! The executor only needs "POST this body with these headers, give me back a
//! status and a body". Anything that fails before a response arrives is a
//! connectivity error. Once a status has arrived the endpoint counts as reached.

use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use crate::error::QueryError;

/// The only status treated as success
pub const SUCCESS_STATUS: u16 = 200;

/// Status code and raw body of an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Empty when an error body could not be read in full
    pub body: String,
}

impl HttpResponse {
    /// Creates a response from a status code and body
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends HTTP POST requests
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Posts `body` to `url` with the given headers.
    ///
    /// Implementations return [`QueryError::Connectivity`] when no response
    /// could be obtained, and an [`HttpResponse`] for any status code otherwise.
    /// A 200 whose body cannot be read is a [`QueryError::Decode`].
    async fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: String,
    ) -> Result<HttpResponse, QueryError>;
}

/// [`HttpTransport`] backed by a `reqwest` client
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a default `reqwest` client
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: String,
    ) -> Result<HttpResponse, QueryError> {
        let mut request = self.client.post(url).body(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(QueryError::connectivity)?;
        let status = response.status().as_u16();

        // The status line has arrived, so a body failure is no longer a connectivity error
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if status == SUCCESS_STATUS => {
                return Err(QueryError::Decode(format!(
                    "Failed to read response body: {e}"
                )));
            }
            Err(e) => {
                warn!(status, error = %e, "Failed to read error response body");
                String::new()
            }
        };

        Ok(HttpResponse { status, body })
    }
}
