//! Schema Contracts
//!
//! The declared, expected structure of a live database: tables with typed
//! columns, views, stored procedures and functions with parameter
//! signatures, and stages.
//!
//! # Example
//!
//! ```
//! use sentinel_contract::{ColumnSpec, DataType, ObjectKey, SchemaContract};
//!
//! let contract = SchemaContract::new("1.0.0").with_table(
//!     "ACTIVITY",
//!     "EVENTS",
//!     vec![
//!         ColumnSpec::required("EVENT_ID", DataType::String).primary_key(),
//!         ColumnSpec::optional("ATTRIBUTES", DataType::Variant),
//!     ],
//! );
//! assert!(contract.get(&ObjectKey::table("activity", "events")).is_some());
//! ```

pub mod activity;
pub mod contract;
pub mod fingerprint;
pub mod storage;
pub mod types;

pub use activity::activity_contract;
pub use contract::{
    format_signature, normalize_ident, ColumnSpec, ContractIssue, ObjectKey, ObjectKind,
    ObjectSpec, ParamSpec, RoutineSpec, SchemaContract, StageSpec, TableSpec, ViewSpec,
};
pub use fingerprint::{ExactFingerprint, NormalizedFingerprint, ViewFingerprinter};
pub use storage::{from_json_str, from_toml_str, load_contract, to_json_pretty, ContractError};
pub use types::{parse_argument_signature, DataType};
