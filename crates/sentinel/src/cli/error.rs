//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use std::fmt;
use std::path::Path;

use sentinel_contract::ContractError;
use sentinel_db::BackendError;
use sentinel_validator::ValidationError;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions
            .extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Database file does not exist
    pub fn database_not_found(path: &Path) -> Self {
        Self::new(format!("Database not found: {}", path.display()))
            .with_context("Validation opens the database read-only and never creates it")
            .with_suggestions([
                format!("TRY: Check the path exists: ls -la {}", path.display()),
                "TRY: Point at another file with --database or SCHEMA_SENTINEL_DATABASE"
                    .to_string(),
            ])
    }

    /// Database could not be opened
    pub fn database_open_failed(path: &Path, err: &BackendError) -> Self {
        let base = Self::new(format!("Cannot open database: {}", path.display()))
            .with_context(err.to_string());
        if matches!(err, BackendError::Locked(_)) {
            base.with_suggestion("TRY: Another process holds the write lock; retry once it finishes")
        } else {
            base.with_suggestion("TRY: Verify the file is a DuckDB database")
        }
    }

    /// Contract file failed to load
    pub fn contract_load_failed(path: &Path, err: &ContractError) -> Self {
        let base = Self::new(format!("Cannot load contract: {}", path.display()))
            .with_context(err.to_string());
        match err {
            ContractError::Io { .. } => base.with_suggestions([
                format!("TRY: Check the file exists: ls -la {}", path.display()),
                "TRY: Omit --contract to use the built-in ACTIVITY contract".to_string(),
            ]),
            ContractError::Json(_) | ContractError::Toml(_) => base.with_suggestions([
                "TRY: Contract files are JSON (.json) or TOML (.toml)".to_string(),
                "TRY: Validate the syntax of the file".to_string(),
            ]),
            ContractError::Invalid(_) => base.with_suggestion(
                "TRY: Every object needs a non-empty name and unique column names",
            ),
        }
    }

    /// Validation aborted before producing a result
    pub fn validation_failed(err: &ValidationError) -> Self {
        let base = Self::new("Schema validation could not run").with_context(err.to_string());
        match err {
            ValidationError::Connection(_) => {
                base.with_suggestion("TRY: Check the database is reachable and not corrupted")
            }
            ValidationError::Introspection { .. } => base.with_suggestion(
                "TRY: Rerun with -v to see the failing catalog query",
            ),
            ValidationError::UnsupportedKind { kind, dialect } => base.with_suggestion(format!(
                "TRY: Remove {} objects from the contract; {} cannot introspect them",
                kind, dialect
            )),
            ValidationError::Contract(_) => {
                base.with_suggestion("TRY: Check the contract file is valid")
            }
            ValidationError::DriftDetected(_) | ValidationError::NoValidationRun => base,
        }
    }

    /// Fix script could not be written
    pub fn cannot_write_fix(path: &Path, reason: &str) -> Self {
        Self::new(format!("Cannot write fix script: {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: Check write permissions for the target directory".to_string(),
                "TRY: Choose another location with --fix-path".to_string(),
            ])
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Print a fatal error as JSON on stdout for `--json` callers.
pub fn print_json_error(err: &anyhow::Error) {
    let payload = match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => serde_json::json!({
            "error": {
                "message": helpful.message,
                "context": helpful.context,
                "suggestions": helpful.suggestions,
            }
        }),
        None => serde_json::json!({
            "error": { "message": format!("{:#}", err) }
        }),
    };
    println!("{}", payload);
}

/// Print a fatal error for humans on stderr.
pub fn print_error(err: &anyhow::Error) {
    match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => eprint!("{}", helpful),
        None => eprintln!("ERROR: {:#}", err),
    }
}
