//! Command-line interface for schema-sentinel.

pub mod config;
pub mod error;
pub mod output;
pub mod validate;
