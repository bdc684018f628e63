//! Database session layer for Schema Sentinel
//!
//! The validator talks to databases only through the [`Session`] trait.
//! This crate ships the DuckDB implementation ([`DbConnection`]) used by the
//! CLI and the integration tests; other products plug in by implementing
//! `Session` over their own driver.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sentinel_db::{DbConnection, Session};
//!
//! let conn = DbConnection::open_duckdb_readonly("warehouse.duckdb".as_ref())?;
//! let rows = conn.query_all("SELECT table_name FROM information_schema.tables", &[])?;
//! ```

mod backend;
mod error;
pub mod lock;
mod session;
mod value;

pub use backend::{AccessMode, DbConnection};
pub use error::BackendError;
pub use session::Session;
pub use value::{DbRow, DbTimestamp, DbValue, FromDbValue};
