//! Database execution layer.
//!
//! The guarded executor talks to [`QueryBackend`]; [`PostgresDriver`] is the
//! production implementation.

pub mod postgres;
pub mod result;
pub mod traits;

pub use postgres::PostgresDriver;
pub use result::{CellValue, ExecutionFailure, ExecutionResult, Row};
pub use traits::{PoolStatus, QueryBackend};
