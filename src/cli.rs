//! Command-line interface parsing for the `appsync` binary
//!
//! This module handles parsing of CLI arguments using clap and turns them into a
//! [`ClientConfig`] and [`QueryRequest`] for the library.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::{ClientConfig, DEFAULT_BATCH_SIZE};
use crate::request::{CacheExpiry, CachePriority, QueryRequest};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// `--variables` was not valid JSON
    #[error("Invalid variables: {0}")]
    InvalidVariables(#[from] serde_json::Error),

    /// `--variables` parsed, but not to a JSON object
    #[error("Invalid variables: expected a JSON object, got {0}")]
    VariablesNotObject(String),

    /// `--batch-size` was zero
    #[error("Invalid batch size: must be at least 1")]
    InvalidBatchSize,
}

/// Query client for AppSync-style endpoints with an offline response cache
#[derive(Parser, Debug)]
#[command(name = "appsync")]
#[command(about = "Run queries against an AppSync-style endpoint with offline caching")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a query and print its data as JSON
    Query(QueryArgs),
    /// Delete the cache database
    ResetCache(CacheDirArgs),
}

/// Cache location shared by both subcommands
#[derive(Args, Debug, Clone)]
pub struct CacheDirArgs {
    /// Directory holding aws_appsync_cache.db (defaults to the system temp directory)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

impl CacheDirArgs {
    /// Cache root to use, falling back to the default
    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| ClientConfig::default().cache_root)
    }
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Endpoint URL to POST the query to
    #[arg(long)]
    pub endpoint: String,

    /// Value sent in the Authorization header
    #[arg(long, env = "APPSYNC_ACCESS_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Query document
    #[arg(long)]
    pub query: String,

    /// Query variables as a JSON object
    #[arg(long, value_name = "JSON")]
    pub variables: Option<String>,

    /// Whether to consult the network or the cache first
    #[arg(long, value_enum, default_value_t = PriorityArg::NetworkFirst)]
    pub priority: PriorityArg,

    /// Disable the response cache
    #[arg(long)]
    pub no_cache: bool,

    #[command(flatten)]
    pub cache: CacheDirArgs,

    /// Hours before cached responses expire
    #[arg(long, value_name = "HOURS", conflicts_with = "no_expiry")]
    pub cache_ttl_hours: Option<u32>,

    /// Keep cached responses forever
    #[arg(long)]
    pub no_expiry: bool,

    /// Follow nextToken cursors and print every page
    #[arg(long)]
    pub paginate: bool,

    /// Page size sent as the limit variable when paginating
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: u32,
}

/// Cache priority as accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityArg {
    NetworkFirst,
    CacheFirst,
}

impl From<PriorityArg> for CachePriority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::NetworkFirst => CachePriority::NetworkFirst,
            PriorityArg::CacheFirst => CachePriority::CacheFirst,
        }
    }
}

/// Parses a `--variables` argument into a JSON object.
///
/// # Returns
/// * `Ok(Map)` if the string is a JSON object
/// * `Err(CliError)` if it is not JSON or not an object
pub fn parse_variables_arg(s: &str) -> Result<Map<String, Value>, CliError> {
    match serde_json::from_str(s)? {
        Value::Object(map) => Ok(map),
        other => Err(CliError::VariablesNotObject(other.to_string())),
    }
}

impl QueryArgs {
    /// Builds the client configuration from the parsed arguments
    pub fn to_config(&self) -> Result<ClientConfig, CliError> {
        if self.batch_size == 0 {
            return Err(CliError::InvalidBatchSize);
        }

        let cache_expiry = if self.no_expiry {
            CacheExpiry::Never
        } else {
            self.cache_ttl_hours
                .map(|hours| CacheExpiry::hours(i64::from(hours)))
                .unwrap_or_default()
        };

        Ok(ClientConfig {
            cache_root: self.cache.cache_root(),
            caching_enabled: !self.no_cache,
            cache_expiry,
            priority: self.priority.into(),
            batch_size: self.batch_size,
        })
    }

    /// Builds the request from the parsed arguments
    pub fn to_request(&self) -> Result<QueryRequest, CliError> {
        let variables = match &self.variables {
            Some(raw) => parse_variables_arg(raw)?,
            None => Map::new(),
        };

        Ok(QueryRequest::new(&self.endpoint, &self.query, &self.token).with_variables(variables))
    }
}
