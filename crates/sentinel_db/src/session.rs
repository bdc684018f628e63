//! The session seam between the validator and a concrete database.

use crate::error::BackendError;
use crate::value::{DbRow, DbValue};

/// An open database session.
///
/// The validator only ever reads through `query_all`; `execute` exists for
/// collaborators such as audit sinks and for applying remediation scripts.
/// Sessions are owned by the caller and are not required to be safe for
/// concurrent statements.
pub trait Session {
    /// Run a query and return every row.
    fn query_all(&self, sql: &str, params: &[DbValue]) -> Result<Vec<DbRow>, BackendError>;

    /// Execute a single statement, returning affected rows.
    fn execute(&self, sql: &str, params: &[DbValue]) -> Result<u64, BackendError>;

    /// Execute a `;`-separated batch of statements.
    fn execute_batch(&self, sql: &str) -> Result<(), BackendError>;

    /// Human-readable backend name used in logs.
    fn backend_name(&self) -> &'static str;

    /// Query and return the first row, if any.
    fn query_optional(&self, sql: &str, params: &[DbValue]) -> Result<Option<DbRow>, BackendError> {
        Ok(self.query_all(sql, params)?.into_iter().next())
    }
}

impl<S: Session + ?Sized> Session for &S {
    fn query_all(&self, sql: &str, params: &[DbValue]) -> Result<Vec<DbRow>, BackendError> {
        (**self).query_all(sql, params)
    }

    fn execute(&self, sql: &str, params: &[DbValue]) -> Result<u64, BackendError> {
        (**self).execute(sql, params)
    }

    fn execute_batch(&self, sql: &str) -> Result<(), BackendError> {
        (**self).execute_batch(sql)
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}
