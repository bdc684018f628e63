//! Schema drift validation.
//!
//! Compares a live database catalog with a [`SchemaContract`], classifies
//! every difference by severity, and renders an idempotent remediation
//! script for the blocking ones.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sentinel_contract::activity_contract;
//! use sentinel_db::DbConnection;
//! use sentinel_validator::{Dialect, SchemaSentinel, ValidateOptions};
//!
//! let conn = DbConnection::open_duckdb_readonly("warehouse.duckdb".as_ref())?;
//! let mut sentinel = SchemaSentinel::new(activity_contract(), Dialect::DuckDb);
//! let result = sentinel.validate(&conn, &ValidateOptions::default())?;
//! if !result.passed {
//!     println!("{}", sentinel.generate_remediation_script()?.render());
//! }
//! ```
//!
//! [`SchemaContract`]: sentinel_contract::SchemaContract

pub mod audit;
pub mod catalog;
pub mod dialect;
pub mod diff;
mod error;
mod finding;
mod options;
pub mod remediation;
mod result;
mod sentinel;
pub mod snapshot;

pub use audit::{AuditError, AuditRecord, AuditSink, EventTableSink, NullAuditSink, TracingAuditSink};
pub use catalog::{CatalogReader, CatalogScope};
pub use dialect::Dialect;
pub use error::ValidationError;
pub use finding::{DriftKind, Finding, Severity};
pub use options::ValidateOptions;
pub use remediation::{RemediationScript, RemediationStatement};
pub use result::{DriftCounts, ValidationResult};
pub use sentinel::SchemaSentinel;
pub use snapshot::{LiveColumn, LiveObject, LiveSnapshot};
