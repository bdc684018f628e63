//! schema-sentinel: validate a live database against its schema contract.
//!
//! Exit status is 0 when validation passes and 1 on blocking drift or any
//! fatal error.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use sentinel_logging::{init_logging, LogConfig};
use sentinel_validator::ValidateOptions;

mod cli;

use cli::config::{default_database_path, DEFAULT_FIX_PATH};
use cli::validate::ValidateArgs;

#[derive(Parser, Debug)]
#[command(
    name = "schema-sentinel",
    version,
    about = "Detect schema drift between a database and its contract"
)]
struct Cli {
    /// DuckDB database file to validate
    #[arg(long, env = "SCHEMA_SENTINEL_DATABASE")]
    database: Option<PathBuf>,

    /// Contract file (.json or .toml); defaults to the built-in ACTIVITY contract
    #[arg(long, env = "SCHEMA_SENTINEL_CONTRACT")]
    contract: Option<PathBuf>,

    /// Treat blocking drift as an error
    #[arg(long)]
    strict: bool,

    /// Do not record an audit event for this run
    #[arg(long)]
    no_log: bool,

    /// Leave views out of validation entirely
    #[arg(long)]
    skip_views: bool,

    /// Escalate extra objects, column order and view definition drift to blocking
    #[arg(long)]
    strict_mode: bool,

    /// Do not report objects and columns the contract does not declare
    #[arg(long)]
    no_extra: bool,

    /// Compare view definitions byte for byte instead of normalized
    #[arg(long)]
    exact_fingerprints: bool,

    /// Write the audit event to ACTIVITY.EVENTS (opens the database read-write)
    #[arg(long)]
    audit_table: bool,

    /// Write a remediation script for the drift found
    #[arg(long)]
    generate_fix: bool,

    /// Where --generate-fix writes the script
    #[arg(long, default_value = DEFAULT_FIX_PATH)]
    fix_path: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Cli {
    fn validate_args(&self) -> ValidateArgs {
        let options = ValidateOptions::default()
            .throw_on_drift(self.strict)
            .log_activity(!self.no_log)
            .skip_view_checks(self.skip_views)
            .strict_mode(self.strict_mode)
            .detect_extra(!self.no_extra);

        ValidateArgs {
            database: self
                .database
                .clone()
                .unwrap_or_else(default_database_path),
            contract: self.contract.clone(),
            options,
            exact_fingerprints: self.exact_fingerprints,
            audit_table: self.audit_table,
            generate_fix: self.generate_fix,
            fix_path: self.fix_path.clone(),
            json: self.json,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(LogConfig {
        app_name: "schema-sentinel",
        verbose: cli.verbose,
        quiet: cli.json,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match cli::validate::run(cli.validate_args()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            if cli.json {
                cli::error::print_json_error(&err);
            } else {
                cli::error::print_error(&err);
            }
            ExitCode::from(1)
        }
    }
}
