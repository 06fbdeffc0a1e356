//! Admission control for LLM-generated SQL.
//!
//! Sits between an untrusted text-to-SQL generator and a live PostgreSQL
//! connection: every candidate statement is validated against a read-only
//! policy before any database contact, then executed under a row cap and a
//! server-enforced deadline.
//!
//! Validation and execution outcomes are typed values, never exceptions:
//! callers match on [`ValidationVerdict`] and on
//! `Result<ExecutionResult, ExecutionFailure>`.
//!
//! # Example
//!
//! ```no_run
//! use sqlgate::{
//!     config::{DatabaseConfig, PolicyConfig},
//!     executor::GuardedExecutor,
//!     security::{StatementValidator, ValidationVerdict},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let policy = PolicyConfig::default();
//!     let database = DatabaseConfig::builder().from_env()?.build()?;
//!
//!     let validator = StatementValidator::new(policy.clone());
//!     let executor = GuardedExecutor::connect(&database, policy).await?;
//!
//!     match validator.validate("SELECT category, COUNT(*) FROM products GROUP BY category") {
//!         ValidationVerdict::Accepted(statement) => {
//!             match executor.execute(&statement).await {
//!                 Ok(result) => println!("{} rows in {:.1}ms", result.row_count, result.elapsed_ms),
//!                 Err(failure) => eprintln!("{}: {}", failure.kind(), failure),
//!             }
//!         }
//!         ValidationVerdict::Rejected(reason) => {
//!             eprintln!("{}: {}", reason.code(), reason);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod executor;
pub mod security;

pub use config::{DatabaseConfig, DatabaseConfigBuilder, PolicyConfig, PolicyConfigBuilder};
pub use database::{CellValue, ExecutionFailure, ExecutionResult, PostgresDriver, QueryBackend, Row};
pub use error::{Result, SqlGateError};
pub use executor::{BoundedStatement, GuardedExecutor};
pub use security::{AcceptedStatement, RejectReason, StatementValidator, ValidationVerdict};
