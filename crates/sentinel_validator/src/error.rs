//! Validation error taxonomy.
//!
//! Connection and introspection failures abort the run: a partial snapshot
//! would report false drift (or a false pass). Drift itself is data and only
//! becomes an error when the caller asks for `throw_on_drift`.

use sentinel_contract::{ContractError, ObjectKind};
use sentinel_db::BackendError;
use thiserror::Error;

use crate::dialect::Dialect;
use crate::result::ValidationResult;

#[derive(Debug, Error)]
pub enum ValidationError {
    /// The session cannot run queries at all.
    #[error("Cannot reach the database: {0}")]
    Connection(#[source] BackendError),

    /// One catalog query failed.
    #[error("Failed to introspect {kind} objects: {source}")]
    Introspection {
        kind: ObjectKind,
        #[source]
        source: BackendError,
    },

    /// The contract declares objects the dialect has no catalog for.
    #[error("{dialect} has no catalog for {kind} objects declared in the contract")]
    UnsupportedKind { kind: ObjectKind, dialect: Dialect },

    /// The contract cannot be put in canonical form for hashing.
    #[error("Cannot hash the contract: {0}")]
    Contract(#[from] ContractError),

    #[error("Schema drift detected: {}", .0.summary())]
    DriftDetected(Box<ValidationResult>),

    #[error("No validation has been run; validate before generating a remediation script")]
    NoValidationRun,
}

impl ValidationError {
    /// The result carried by `DriftDetected`.
    pub fn drift_result(&self) -> Option<&ValidationResult> {
        match self {
            ValidationError::DriftDetected(result) => Some(result),
            _ => None,
        }
    }
}
