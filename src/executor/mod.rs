//! Guarded execution of accepted statements.
//!
//! The executor never re-derives trust: it accepts only
//! [`AcceptedStatement`], bounds it, and hands it to the backend. Nothing is
//! ever retried here; resubmission means going back through the full
//! validate-then-execute pipeline with a fresh candidate.

pub mod bound;

pub use bound::{bound_statement, BoundedStatement};

use crate::config::{DatabaseConfig, PolicyConfig};
use crate::database::postgres::PostgresDriver;
use crate::database::result::{ExecutionFailure, ExecutionResult};
use crate::database::traits::QueryBackend;
use crate::error::DbResult;
use crate::security::AcceptedStatement;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Executes validated statements under the policy's row cap and deadline.
pub struct GuardedExecutor {
    backend: Arc<dyn QueryBackend>,
    policy: PolicyConfig,
}

impl GuardedExecutor {
    pub fn new(backend: Arc<dyn QueryBackend>, policy: PolicyConfig) -> Self {
        Self { backend, policy }
    }

    /// Convenience constructor: pooled PostgreSQL backend from config.
    pub async fn connect(database: &DatabaseConfig, policy: PolicyConfig) -> DbResult<Self> {
        let driver = PostgresDriver::connect(database).await?;
        Ok(Self::new(Arc::new(driver), policy))
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Bound and run one accepted statement.
    #[instrument(skip(self, statement))]
    pub async fn execute(
        &self,
        statement: &AcceptedStatement,
    ) -> Result<ExecutionResult, ExecutionFailure> {
        let bounded = bound_statement(statement, self.policy.max_row_cap);
        debug!(
            row_cap = bounded.row_cap(),
            timeout_ms = self.policy.execution_timeout.as_millis() as u64,
            "Dispatching bounded statement"
        );

        let mut result = self
            .backend
            .run(
                bounded.text(),
                bounded.row_cap(),
                self.policy.execution_timeout,
            )
            .await?;

        // Backends already truncate; enforce the invariant against the ones
        // that do not.
        if result.rows.len() > bounded.row_cap() as usize {
            result.rows.truncate(bounded.row_cap() as usize);
            result.row_count = result.rows.len();
            result.truncated = true;
        }

        Ok(result)
    }
}
