//! Cursor pagination over [`AppSyncClient::execute`]
//!
//! Each page request carries `limit` and `nextToken` variables. The next cursor
//! is taken from the first top-level field of the page whose value is an object
//! with a `nextToken` key. Pages are fetched one at a time, only when the
//! consumer polls for the next item, so dropping the stream stops pagination.

use async_stream::try_stream;
use futures::Stream;
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::AppSyncClient;
use crate::error::QueryError;
use crate::request::{CachePriority, QueryRequest};

/// Variable carrying the page size
const LIMIT_VARIABLE: &str = "limit";

/// Variable and response field carrying the cursor
const NEXT_TOKEN_FIELD: &str = "nextToken";

impl AppSyncClient {
    /// Lazily fetches every page of a paginated query
    ///
    /// The stream yields each page's `data` in order and ends after the first
    /// page without a cursor. An error ends the stream; pages already yielded
    /// are unaffected.
    ///
    /// # Arguments
    /// * `request` - Query accepting `limit` and `nextToken` variables
    /// * `batch_size` - Value sent as `limit` unless the request sets it
    /// * `priority` - Cache priority applied to every page
    pub fn paginate(
        &self,
        request: QueryRequest,
        batch_size: u32,
        priority: CachePriority,
    ) -> impl Stream<Item = Result<Value, QueryError>> + '_ {
        try_stream! {
            let mut cursor: Option<String> = None;
            let mut page_number = 0usize;

            loop {
                let variables = page_variables(&request.variables, batch_size, cursor.as_deref());
                let page_request = request.clone().with_variables(variables);

                let page: Value = self.execute(&page_request, priority).await?;
                page_number += 1;

                let next = next_token(&page);
                debug!(page_number, has_next = next.is_some(), "Fetched page");

                yield page;

                match next {
                    Some(token) => cursor = Some(token),
                    None => break,
                }
            }
        }
    }
}

/// Builds page variables: `limit` and `nextToken`, overlaid by the request's own variables
pub fn page_variables(
    variables: &Map<String, Value>,
    batch_size: u32,
    cursor: Option<&str>,
) -> Map<String, Value> {
    let mut merged = Map::new();
    merged.insert(LIMIT_VARIABLE.to_string(), Value::from(batch_size));
    merged.insert(
        NEXT_TOKEN_FIELD.to_string(),
        cursor.map_or(Value::Null, Value::from),
    );
    for (key, value) in variables {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Finds the cursor for the page after `page`
///
/// Scans the top-level fields in iteration order and takes the `nextToken` of the
/// first object that has one. Returns `None` when no such object exists or its
/// `nextToken` is null or not a string.
pub fn next_token(page: &Value) -> Option<String> {
    let Value::Object(fields) = page else {
        return None;
    };

    fields
        .values()
        .filter_map(Value::as_object)
        .find_map(|nested| nested.get(NEXT_TOKEN_FIELD))
        .and_then(Value::as_str)
        .map(str::to_string)
}
