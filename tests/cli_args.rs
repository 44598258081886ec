//! Integration tests for CLI argument handling
//!
//! Tests subcommand parsing, argument validation, and the reset-cache command
//! by running the built binary.

use std::process::Command;

use tempfile::TempDir;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_appsync"))
        .args(args)
        .env_remove("APPSYNC_ACCESS_TOKEN")
        .output()
        .expect("Failed to execute appsync")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("appsync"), "Help should mention appsync");
    assert!(stdout.contains("query"), "Help should mention the query command");
    assert!(
        stdout.contains("reset-cache"),
        "Help should mention the reset-cache command"
    );
}

#[test]
fn test_query_help_lists_cache_options() {
    let output = run_cli(&["query", "--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--priority"));
    assert!(stdout.contains("--cache-dir"));
    assert!(stdout.contains("--paginate"));
}

#[test]
fn test_missing_subcommand_fails() {
    let output = run_cli(&[]);
    assert!(!output.status.success(), "Expected missing subcommand to fail");
}

#[test]
fn test_invalid_priority_prints_error_and_exits() {
    let output = run_cli(&[
        "query",
        "--endpoint",
        "http://127.0.0.1:9/graphql",
        "--token",
        "t",
        "--query",
        "query { a }",
        "--priority",
        "sometimes",
    ]);
    assert!(!output.status.success(), "Expected invalid priority to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("sometimes") || stderr.contains("invalid"),
        "Should print error message about invalid priority: {}",
        stderr
    );
}

#[test]
fn test_invalid_variables_prints_error_and_exits() {
    let cache_dir = TempDir::new().expect("Failed to create temp directory");
    let output = run_cli(&[
        "query",
        "--endpoint",
        "http://127.0.0.1:9/graphql",
        "--token",
        "t",
        "--query",
        "query { a }",
        "--variables",
        "[1, 2]",
        "--cache-dir",
        cache_dir.path().to_str().expect("utf-8 temp path"),
    ]);
    assert!(!output.status.success(), "Expected invalid variables to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid variables"),
        "Should print error message about variables: {}",
        stderr
    );
}

#[test]
fn test_unreachable_endpoint_without_cache_fails() {
    let output = run_cli(&[
        "query",
        "--endpoint",
        "http://127.0.0.1:9/graphql",
        "--token",
        "t",
        "--query",
        "query { a }",
        "--no-cache",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Connectivity error"),
        "Should report a connectivity error: {}",
        stderr
    );
}

#[test]
fn test_reset_cache_deletes_database() {
    let cache_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = cache_dir.path().join("aws_appsync_cache.db");
    std::fs::write(&db_path, b"stale").expect("Failed to create fake database");

    let output = run_cli(&[
        "reset-cache",
        "--cache-dir",
        cache_dir.path().to_str().expect("utf-8 temp path"),
    ]);

    assert!(output.status.success(), "Expected reset-cache to succeed");
    assert!(!db_path.exists(), "Cache database should be deleted");
}

#[test]
fn test_reset_cache_on_empty_directory_succeeds() {
    let cache_dir = TempDir::new().expect("Failed to create temp directory");

    let output = run_cli(&[
        "reset-cache",
        "--cache-dir",
        cache_dir.path().to_str().expect("utf-8 temp path"),
    ]);

    assert!(output.status.success());
}
