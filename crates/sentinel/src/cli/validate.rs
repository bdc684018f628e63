//! The validation command.
//!
//! Loads a contract, validates a DuckDB file against it, reports findings
//! and optionally writes the remediation script. Returns whether the
//! database passed.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use sentinel_contract::{activity_contract, load_contract, ExactFingerprint, ObjectKind, SchemaContract};
use sentinel_db::DbConnection;
use sentinel_validator::{
    Dialect, EventTableSink, RemediationScript, SchemaSentinel, ValidateOptions, ValidationError,
};

use crate::cli::config::{audit_actor, make_executable};
use crate::cli::error::HelpfulError;
use crate::cli::output::{self, ValidateOutput};

#[derive(Debug, Clone)]
pub struct ValidateArgs {
    pub database: PathBuf,
    pub contract: Option<PathBuf>,
    pub options: ValidateOptions,
    pub exact_fingerprints: bool,
    pub audit_table: bool,
    pub generate_fix: bool,
    pub fix_path: PathBuf,
    pub json: bool,
}

pub fn run(args: ValidateArgs) -> Result<bool> {
    let dialect = Dialect::DuckDb;
    let contract = match &args.contract {
        Some(path) => {
            load_contract(path).map_err(|e| HelpfulError::contract_load_failed(path, &e))?
        }
        None => activity_contract(),
    };
    let (contract, excluded_kinds) = portable_contract(contract, dialect);

    let conn = open_database(&args.database, args.audit_table)?;

    let mut sentinel = SchemaSentinel::new(contract, dialect);
    if args.exact_fingerprints {
        sentinel = sentinel.with_fingerprinter(ExactFingerprint);
    }
    if args.audit_table {
        sentinel =
            sentinel.with_audit_sink(EventTableSink::new(dialect).with_actor(audit_actor()));
    }

    let result = match sentinel.validate(&conn, &args.options) {
        Ok(result) => result,
        Err(ValidationError::DriftDetected(result)) => {
            error!("Schema drift detected: {}", result.summary());
            *result
        }
        Err(e) => return Err(HelpfulError::validation_failed(&e).into()),
    };

    let mut fix_written = None;
    if args.generate_fix {
        if result.findings.is_empty() {
            info!("No drift found; fix script not written");
        } else {
            let script = sentinel.generate_remediation_script()?;
            write_fix_script(&args.fix_path, &script)?;
            fix_written = Some(script);
        }
    }

    if args.json {
        output::print_json(&ValidateOutput {
            result: &result,
            excluded_kinds: &excluded_kinds,
            fix_path: fix_written
                .as_ref()
                .map(|_| args.fix_path.display().to_string()),
        })?;
    } else {
        output::print_report(&result);
        if let Some(script) = &fix_written {
            output::print_fix_written(
                &args.fix_path,
                script.statements.len(),
                script.advisories.len(),
            );
        }
    }

    Ok(result.passed)
}

/// Drop the kinds `dialect` cannot introspect, warning once per kind.
pub fn portable_contract(
    contract: SchemaContract,
    dialect: Dialect,
) -> (SchemaContract, Vec<ObjectKind>) {
    let unsupported: Vec<ObjectKind> = contract
        .kinds()
        .into_iter()
        .filter(|k| !dialect.supports(*k))
        .collect();

    let contract = unsupported.iter().fold(contract, |contract, kind| {
        warn!(
            kind = %kind,
            dialect = %dialect,
            "Skipping {} objects: not present in a {} catalog",
            kind,
            dialect
        );
        contract.without_kind(*kind)
    });
    (contract, unsupported)
}

/// Read-only unless the audit record goes to the event table.
fn open_database(path: &Path, writable: bool) -> Result<DbConnection> {
    if !path.exists() {
        return Err(HelpfulError::database_not_found(path).into());
    }
    let opened = if writable {
        DbConnection::open_duckdb(path)
    } else {
        DbConnection::open_duckdb_readonly(path)
    };
    opened.map_err(|e| HelpfulError::database_open_failed(path, &e).into())
}

fn write_fix_script(path: &Path, script: &RemediationScript) -> Result<()> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, script.render())?;
        make_executable(path)
    };
    write().map_err(|e| HelpfulError::cannot_write_fix(path, &e.to_string()))?;
    info!(path = %path.display(), statements = script.statements.len(), "Wrote fix script");
    Ok(())
}
