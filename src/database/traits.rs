//! Execution backend trait.

use crate::database::result::{ExecutionFailure, ExecutionResult};
use async_trait::async_trait;
use std::time::Duration;

/// Async execution backend.
///
/// The single seam between the guarded executor and the database: one
/// bounded, already-validated statement in, normalized rows or a classified
/// failure out. Implementations own deadline enforcement: the statement
/// must be aborted server-side when the timeout elapses, not merely
/// abandoned by the caller.
///
/// Implementation: [`PostgresDriver`](crate::database::PostgresDriver).
/// Tests substitute their own mock.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Returns the backend name (e.g., "postgres").
    fn name(&self) -> &'static str;

    /// Executes one bounded read-only statement.
    ///
    /// * `sql` - statement text, already validated and limit-bounded
    /// * `row_cap` - hard ceiling on returned rows
    /// * `timeout` - server-side execution deadline
    async fn run(
        &self,
        sql: &str,
        row_cap: u32,
        timeout: Duration,
    ) -> Result<ExecutionResult, ExecutionFailure>;
}

/// Pool status information, for diagnostics and leak checks.
#[derive(Debug, Clone)]
pub struct PoolStatus {
    pub size: usize,
    pub available: usize,
    pub in_use: usize,
}
