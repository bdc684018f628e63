//! Error types for the session layer.

use thiserror::Error;

/// Errors from database backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The session cannot reach the database at all.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Database is locked by another process: {0}")]
    Locked(String),

    #[error("Operation requires write access but database is read-only")]
    ReadOnly,

    #[error("Query error: {0}")]
    Query(String),

    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    #[error("Backend not available: {0}")]
    NotAvailable(String),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),
}

impl BackendError {
    /// True when the error means the session itself is unusable, as opposed
    /// to a single statement failing.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            BackendError::Connection(_) | BackendError::Locked(_) | BackendError::NotAvailable(_)
        )
    }
}
