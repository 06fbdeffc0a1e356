//! Command-line entry point: validate and execute one candidate statement.
//!
//! Reads the statement from the first argument (or stdin when absent),
//! builds configuration from environment variables, and prints the outcome
//! as JSON on stdout. Logs go to stderr so stdout stays machine-readable.

use anyhow::Result;
use serde_json::json;
use sqlgate::{
    config::{DatabaseConfig, PolicyConfig},
    executor::GuardedExecutor,
    security::{StatementValidator, ValidationVerdict},
};
use std::io::Read;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let candidate = read_candidate()?;

    let policy = PolicyConfig::builder().from_env()?.build()?;
    let validator = StatementValidator::new(policy.clone());

    let statement = match validator.validate(&candidate) {
        ValidationVerdict::Accepted(statement) => statement,
        ValidationVerdict::Rejected(reason) => {
            println!(
                "{}",
                json!({
                    "accepted": false,
                    "reason": reason.code(),
                    "detail": reason.to_string(),
                })
            );
            std::process::exit(1);
        }
    };

    let database = DatabaseConfig::builder().from_env()?.build()?;
    let executor = GuardedExecutor::connect(&database, policy).await?;

    match executor.execute(&statement).await {
        Ok(result) => {
            println!(
                "{}",
                json!({
                    "accepted": true,
                    "columns": result.columns,
                    "rows": result.rows,
                    "row_count": result.row_count,
                    "elapsed_ms": result.elapsed_ms,
                    "truncated": result.truncated,
                })
            );
        }
        Err(failure) => {
            println!(
                "{}",
                json!({
                    "accepted": true,
                    "failure": failure.kind(),
                    "detail": failure.to_string(),
                })
            );
            std::process::exit(2);
        }
    }

    Ok(())
}

fn read_candidate() -> Result<String> {
    if let Some(arg) = std::env::args().nth(1) {
        return Ok(arg);
    }
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sqlgate=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .json()
        .init();
}
