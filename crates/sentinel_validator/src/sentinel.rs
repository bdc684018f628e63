//! The validator.
//!
//! `SchemaSentinel` owns a contract and the result of its most recent run.
//! It has two states: unvalidated (`last_result` is `None`) and validated.
//! Only [`SchemaSentinel::validate`] and [`SchemaSentinel::set_last_result`]
//! move it into the validated state.

use std::time::Instant;
use tracing::{info, info_span, warn};

use sentinel_contract::{NormalizedFingerprint, ObjectKind, SchemaContract, ViewFingerprinter};
use sentinel_db::Session;

use crate::audit::{AuditRecord, AuditSink, TracingAuditSink};
use crate::catalog::{CatalogReader, CatalogScope};
use crate::dialect::Dialect;
use crate::diff;
use crate::error::ValidationError;
use crate::options::ValidateOptions;
use crate::remediation::{self, RemediationScript};
use crate::result::ValidationResult;

pub struct SchemaSentinel {
    contract: SchemaContract,
    dialect: Dialect,
    fingerprinter: Box<dyn ViewFingerprinter>,
    audit_sink: Box<dyn AuditSink>,
    last_result: Option<ValidationResult>,
}

impl std::fmt::Debug for SchemaSentinel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaSentinel")
            .field("contract_version", &self.contract.version)
            .field("dialect", &self.dialect)
            .field("fingerprinter", &self.fingerprinter.name())
            .field("validated", &self.last_result.is_some())
            .finish()
    }
}

impl SchemaSentinel {
    /// Validator with normalized view fingerprints and audit records sent to
    /// the `tracing` log.
    pub fn new(contract: SchemaContract, dialect: Dialect) -> Self {
        Self {
            contract,
            dialect,
            fingerprinter: Box::new(NormalizedFingerprint),
            audit_sink: Box::new(TracingAuditSink),
            last_result: None,
        }
    }

    pub fn with_fingerprinter(mut self, fingerprinter: impl ViewFingerprinter + 'static) -> Self {
        self.fingerprinter = Box::new(fingerprinter);
        self
    }

    pub fn with_audit_sink(mut self, sink: impl AuditSink + 'static) -> Self {
        self.audit_sink = Box::new(sink);
        self
    }

    pub fn contract(&self) -> &SchemaContract {
        &self.contract
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn last_result(&self) -> Option<&ValidationResult> {
        self.last_result.as_ref()
    }

    /// Adopt a result produced elsewhere, e.g. loaded from a previous run.
    pub fn set_last_result(&mut self, result: ValidationResult) {
        self.last_result = Some(result);
    }

    /// Compare the live database behind `session` with the contract.
    ///
    /// Read-only against the database (audit sinks aside). The result is kept
    /// as the last result even when `throw_on_drift` turns it into
    /// [`ValidationError::DriftDetected`], so a fix can still be generated.
    pub fn validate(
        &mut self,
        session: &dyn Session,
        options: &ValidateOptions,
    ) -> Result<ValidationResult, ValidationError> {
        let span = info_span!(
            "sentinel.validate",
            dialect = %self.dialect,
            backend = session.backend_name(),
            contract_version = %self.contract.version
        );
        let _guard = span.enter();
        let start = Instant::now();

        let scope = self.scope(options)?;
        let snapshot = CatalogReader::new(session, self.dialect).read(&scope)?;

        let findings = diff::compare(
            &self.contract,
            &snapshot,
            options,
            self.fingerprinter.as_ref(),
        );
        let objects_checked = self
            .contract
            .objects()
            .filter(|(k, _)| scope.includes(k.kind))
            .count();
        let result = ValidationResult::new(
            findings,
            *options,
            self.dialect,
            self.contract.version.clone(),
            self.contract.content_hash()?,
            objects_checked,
        );

        info!(
            run_id = %result.run_id,
            passed = result.passed,
            blocking = result.blocking_count(),
            advisory = result.advisory_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Schema validation finished: {}",
            result.summary()
        );

        if options.log_activity {
            if let Err(e) = self
                .audit_sink
                .record(session, &AuditRecord::from_result(&result))
            {
                warn!(run_id = %result.run_id, "Audit record not written: {}", e);
            }
        }

        self.last_result = Some(result.clone());

        if options.throw_on_drift && !result.passed {
            return Err(ValidationError::DriftDetected(Box::new(result)));
        }
        Ok(result)
    }

    /// Remediation script for the last result.
    pub fn generate_remediation_script(&self) -> Result<RemediationScript, ValidationError> {
        let result = self
            .last_result
            .as_ref()
            .ok_or(ValidationError::NoValidationRun)?;
        Ok(remediation::generate(&self.contract, result, self.dialect))
    }

    /// Schemas and kinds to introspect. Fails before touching the session if
    /// the contract needs a kind the dialect cannot read.
    fn scope(&self, options: &ValidateOptions) -> Result<CatalogScope, ValidationError> {
        let skipped = |kind: ObjectKind| options.skip_view_checks && kind == ObjectKind::View;

        if let Some(kind) = self
            .contract
            .kinds()
            .into_iter()
            .find(|k| !skipped(*k) && !self.dialect.supports(*k))
        {
            return Err(ValidationError::UnsupportedKind {
                kind,
                dialect: self.dialect,
            });
        }

        Ok(CatalogScope {
            database: self.contract.database.clone(),
            schemas: self.contract.schemas_declaring(|k| !skipped(k)),
            kinds: self
                .dialect
                .supported_kinds()
                .into_iter()
                .filter(|k| !skipped(*k))
                .collect(),
        })
    }
}
