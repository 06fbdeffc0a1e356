//! Query result and failure types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result of a successfully executed, bounded statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Column names exactly as the engine reported them, in its order.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    /// Wall-clock time strictly bounding the query round trip.
    pub elapsed_ms: f64,
    /// Whether the row cap cut the result short.
    pub truncated: bool,
}

impl ExecutionResult {
    pub fn new(columns: Vec<String>, rows: Vec<Row>, elapsed_ms: f64) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            elapsed_ms,
            truncated: false,
        }
    }

    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }
}

/// Row data as a map of column name to value; ordering lives in
/// [`ExecutionResult::columns`].
pub type Row = HashMap<String, CellValue>;

/// Cell value that can hold different SQL types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Json(serde_json::Value),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<()> for CellValue {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Decimal> for CellValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Option<String>> for CellValue {
    fn from(v: Option<String>) -> Self {
        match v {
            Some(s) => Self::String(s),
            None => Self::Null,
        }
    }
}

/// Why an accepted statement failed at execution.
///
/// Diagnostics carry the denormalized engine error text only; connection
/// details and credentials never appear here. Uncategorized failures are
/// logged with full context at the point of classification and surfaced
/// opaque.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionFailure {
    #[error(
        "Query exceeded the {timeout_ms}ms execution deadline; try a narrower question"
    )]
    Timeout { timeout_ms: u64 },

    #[error("Query rejected by the database: {diagnostic}")]
    EngineRejection { diagnostic: String },

    #[error("Query failed: {diagnostic}")]
    Unknown { diagnostic: String },
}

impl ExecutionFailure {
    /// Machine-readable failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::EngineRejection { .. } => "engine_rejection",
            Self::Unknown { .. } => "unknown_runtime_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_result_counts_rows() {
        let mut row = Row::new();
        row.insert("id".into(), CellValue::Int(1));
        row.insert("name".into(), CellValue::String("test".into()));

        let result = ExecutionResult::new(vec!["id".into(), "name".into()], vec![row], 12.5);
        assert_eq!(result.row_count, 1);
        assert_eq!(result.columns, vec!["id", "name"]);
        assert!(!result.truncated);
    }

    #[test]
    fn test_cell_value_conversions() {
        let null: CellValue = ().into();
        assert!(null.is_null());

        let int: CellValue = 42i64.into();
        assert_eq!(int.as_i64(), Some(42));

        let string: CellValue = "hello".into();
        assert_eq!(string.as_str(), Some("hello"));
    }

    #[test]
    fn test_failure_kinds() {
        assert_eq!(ExecutionFailure::Timeout { timeout_ms: 100 }.kind(), "timeout");
        assert_eq!(
            ExecutionFailure::EngineRejection {
                diagnostic: "x".into()
            }
            .kind(),
            "engine_rejection"
        );
        assert_eq!(
            ExecutionFailure::Unknown {
                diagnostic: "x".into()
            }
            .kind(),
            "unknown_runtime_error"
        );
    }

    #[test]
    fn test_timeout_is_user_facing() {
        let failure = ExecutionFailure::Timeout { timeout_ms: 30_000 };
        assert!(failure.to_string().contains("narrower question"));
    }

    #[test]
    fn test_failure_serialization_tags_kind() {
        let json = serde_json::to_string(&ExecutionFailure::Timeout { timeout_ms: 100 }).unwrap();
        assert!(json.contains("\"kind\":\"timeout\""));
    }
}
