//! PostgreSQL backend using `tokio-postgres` and `deadpool`.

use crate::config::DatabaseConfig;
use crate::database::result::{CellValue, ExecutionFailure, ExecutionResult, Row};
use crate::database::traits::{PoolStatus, QueryBackend};
use crate::error::{DatabaseError, DbResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use deadpool_postgres::{Config as DeadpoolConfig, Pool, Runtime};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_postgres::NoTls;
use tokio_postgres::error::SqlState;
use tracing::{debug, error, info, instrument, warn};

/// Extra wall-clock allowance past the server-side deadline. The server
/// aborts the statement itself; this local backstop only fires if the
/// connection has stopped responding entirely.
const TIMEOUT_GRACE: Duration = Duration::from_secs(2);

/// PostgreSQL execution backend.
pub struct PostgresDriver {
    pool: Pool,
}

impl PostgresDriver {
    /// Create a driver with a connection pool against the given database.
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        info!(
            "Connecting to PostgreSQL: {}:{}/{}",
            config.host, config.port, config.database
        );

        let mut deadpool_config = DeadpoolConfig::new();
        deadpool_config.host = Some(config.host.clone());
        deadpool_config.port = Some(config.port);
        deadpool_config.dbname = Some(config.database.clone());
        deadpool_config.user = Some(config.username.clone());
        deadpool_config.password = Some(config.password.clone());
        deadpool_config.pool = Some(deadpool_postgres::PoolConfig::new(config.pool_size as usize));

        let pool = deadpool_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::PoolConfig(e.to_string()))?;

        // Smoke-test one connection so misconfiguration fails at startup,
        // not on the first user query.
        let _conn = pool
            .get()
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(
            "PostgreSQL connection pool created with max size {}",
            config.pool_size
        );

        Ok(Self { pool })
    }

    /// Pool status for leak checks and diagnostics.
    pub fn pool_status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            size: status.size,
            available: status.available,
            in_use: status.size.saturating_sub(status.available),
        }
    }

    fn convert_row(pg_row: &tokio_postgres::Row, columns: &[String]) -> Row {
        let mut row = HashMap::new();
        for (i, name) in columns.iter().enumerate() {
            row.insert(name.clone(), Self::get_cell_value(pg_row, i));
        }
        row
    }

    /// Decode one cell by the column's wire type, NULL-aware.
    fn get_cell_value(row: &tokio_postgres::Row, index: usize) -> CellValue {
        let type_name = row.columns()[index].type_().name();

        match type_name {
            "int2" => match row.try_get::<_, Option<i16>>(index) {
                Ok(Some(v)) => CellValue::Int(v as i64),
                _ => CellValue::Null,
            },
            "int4" => match row.try_get::<_, Option<i32>>(index) {
                Ok(Some(v)) => CellValue::Int(v as i64),
                _ => CellValue::Null,
            },
            "int8" => match row.try_get::<_, Option<i64>>(index) {
                Ok(Some(v)) => CellValue::Int(v),
                _ => CellValue::Null,
            },
            "float4" => match row.try_get::<_, Option<f32>>(index) {
                Ok(Some(v)) => CellValue::Float(v as f64),
                _ => CellValue::Null,
            },
            "float8" => match row.try_get::<_, Option<f64>>(index) {
                Ok(Some(v)) => CellValue::Float(v),
                _ => CellValue::Null,
            },
            "numeric" => match row.try_get::<_, Option<Decimal>>(index) {
                Ok(Some(v)) => CellValue::Decimal(v),
                _ => CellValue::Null,
            },
            "bool" => match row.try_get::<_, Option<bool>>(index) {
                Ok(Some(v)) => CellValue::Bool(v),
                _ => CellValue::Null,
            },
            "date" => match row.try_get::<_, Option<NaiveDate>>(index) {
                Ok(Some(v)) => CellValue::Date(v),
                _ => CellValue::Null,
            },
            "timestamp" => match row.try_get::<_, Option<NaiveDateTime>>(index) {
                Ok(Some(v)) => CellValue::DateTime(DateTime::from_naive_utc_and_offset(v, Utc)),
                _ => CellValue::Null,
            },
            "timestamptz" => match row.try_get::<_, Option<DateTime<Utc>>>(index) {
                Ok(Some(v)) => CellValue::DateTime(v),
                _ => CellValue::Null,
            },
            "json" | "jsonb" => match row.try_get::<_, Option<serde_json::Value>>(index) {
                Ok(Some(v)) => CellValue::Json(v),
                _ => CellValue::Null,
            },
            _ => match row.try_get::<_, Option<String>>(index) {
                Ok(Some(v)) => CellValue::String(v),
                _ => CellValue::Null,
            },
        }
    }

    /// Classify a driver error into the failure taxonomy, redacting
    /// everything except the denormalized engine message.
    fn classify(e: tokio_postgres::Error, deadline: Duration) -> ExecutionFailure {
        if let Some(db_error) = e.as_db_error() {
            if db_error.code() == &SqlState::QUERY_CANCELED {
                warn!("Statement aborted by server-side deadline");
                return ExecutionFailure::Timeout {
                    timeout_ms: deadline.as_millis() as u64,
                };
            }
            debug!("Engine rejected statement: {}", db_error.message());
            return ExecutionFailure::EngineRejection {
                diagnostic: db_error.message().to_string(),
            };
        }

        error!("Uncategorized driver error: {:?}", e);
        ExecutionFailure::Unknown {
            diagnostic: "query failed for an unexpected reason".into(),
        }
    }
}

#[async_trait]
impl QueryBackend for PostgresDriver {
    fn name(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip(self, sql), fields(backend = "postgres"))]
    async fn run(
        &self,
        sql: &str,
        row_cap: u32,
        deadline: Duration,
    ) -> Result<ExecutionResult, ExecutionFailure> {
        // The pooled connection is released on every exit path below: the
        // guard drops on success, timeout, and error alike.
        let conn = match self.pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Could not acquire pooled connection: {}", e);
                return Err(ExecutionFailure::Unknown {
                    diagnostic: "could not acquire a database connection".into(),
                });
            }
        };

        // The deadline is enforced by the server: it aborts the statement
        // (SQLSTATE 57014) and frees its resources without our help.
        conn.batch_execute(&format!("SET statement_timeout = {}", deadline.as_millis()))
            .await
            .map_err(|e| Self::classify(e, deadline))?;

        debug!(row_cap, "Executing bounded statement");

        let start = Instant::now();
        let outcome = timeout(deadline + TIMEOUT_GRACE, async {
            let stmt = conn.prepare(sql).await?;
            let rows = conn.query(&stmt, &[]).await?;
            Ok::<_, tokio_postgres::Error>((stmt, rows))
        })
        .await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let (stmt, mut pg_rows) = match outcome {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return Err(Self::classify(e, deadline)),
            Err(_) => {
                warn!("Connection unresponsive past deadline grace period");
                return Err(ExecutionFailure::Timeout {
                    timeout_ms: deadline.as_millis() as u64,
                });
            }
        };

        let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();

        // The bounded statement already carries a LIMIT; truncation here is
        // the last line of the row-cap invariant.
        let truncated = pg_rows.len() > row_cap as usize;
        if truncated {
            pg_rows.truncate(row_cap as usize);
        }

        let rows: Vec<Row> = pg_rows
            .iter()
            .map(|r| Self::convert_row(r, &columns))
            .collect();

        debug!(rows = rows.len(), elapsed_ms, "Statement completed");

        Ok(ExecutionResult::new(columns, rows, elapsed_ms).with_truncated(truncated))
    }
}
