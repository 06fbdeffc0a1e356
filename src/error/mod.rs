//! Error types for the admission-control core.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` conversions.
//!
//! Validation rejections and per-query execution failures are NOT errors in
//! this crate: they are ordinary values ([`RejectReason`](crate::security::RejectReason),
//! [`ExecutionFailure`](crate::database::ExecutionFailure)) that callers must
//! match on. The types here cover setup and infrastructure faults only.

use std::borrow::Cow;
use thiserror::Error;

/// Main error type for the admission-control core.
#[derive(Debug, Error)]
pub enum SqlGateError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database infrastructure errors (connection establishment, pool health).
///
/// Faults that occur while running an accepted statement are classified into
/// [`ExecutionFailure`](crate::database::ExecutionFailure) instead.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Invalid pool configuration: {0}")]
    PoolConfig(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
}

/// Result type alias for SqlGateError.
pub type Result<T> = std::result::Result<T, SqlGateError>;

/// Result type alias for DatabaseError.
pub type DbResult<T> = std::result::Result<T, DatabaseError>;
