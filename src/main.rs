//! appsync - run queries against an AppSync-style endpoint from the terminal
//!
//! Prints the response `data` as JSON. With `--paginate`, prints one JSON value
//! per page as pages arrive.

use std::pin::pin;
use std::process::ExitCode;

use clap::Parser;
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use appsync_client::cache::reset_cache;
use appsync_client::cli::{Cli, Command, QueryArgs};
use appsync_client::AppSyncClient;

/// Logs go to stderr so stdout stays pure JSON
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_query(args: QueryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.to_config()?;
    let request = args.to_request()?;
    let client = AppSyncClient::from_config(&config).await?;

    if args.paginate {
        let mut pages = pin!(client.paginate(request, config.batch_size, config.priority));
        while let Some(page) = pages.next().await {
            println!("{}", serde_json::to_string_pretty(&page?)?);
        }
    } else {
        let data = client.execute(&request, config.priority).await?;
        println!("{}", serde_json::to_string_pretty(&data)?);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Query(args) => run_query(args).await,
        Command::ResetCache(args) => reset_cache(args.cache_root()).await.map_err(Into::into),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
