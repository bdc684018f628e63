//! Audit records for validation runs.
//!
//! One record per run, written to an [`AuditSink`]. Sinks are best effort:
//! the validator logs a sink failure and carries on.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use sentinel_db::{BackendError, DbValue, Session};

use crate::dialect::Dialect;
use crate::result::{DriftCounts, ValidationResult};

pub const AUDIT_ACTION: &str = "ccode.schema_validation";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Failed to write audit record: {0}")]
    Backend(#[from] BackendError),

    #[error("Failed to serialize audit record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub run_id: Uuid,
    pub validated_at: DateTime<Utc>,
    pub passed: bool,
    pub dialect: Dialect,
    pub contract_version: String,
    pub contract_hash: String,
    pub objects_checked: usize,
    pub blocking: usize,
    pub advisory: usize,
    pub counts: DriftCounts,
}

impl AuditRecord {
    pub fn from_result(result: &ValidationResult) -> Self {
        Self {
            run_id: result.run_id,
            validated_at: result.validated_at,
            passed: result.passed,
            dialect: result.dialect,
            contract_version: result.contract_version.clone(),
            contract_hash: result.contract_hash.clone(),
            objects_checked: result.objects_checked,
            blocking: result.blocking_count(),
            advisory: result.advisory_count(),
            counts: result.drift_counts(),
        }
    }
}

/// Destination for audit records.
///
/// Sinks receive the validation session so they can write alongside the
/// catalog they just read.
pub trait AuditSink {
    fn record(&self, session: &dyn Session, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Emits the record as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, _session: &dyn Session, record: &AuditRecord) -> Result<(), AuditError> {
        let c = &record.counts;
        info!(
            target: "schema_sentinel::audit",
            action = AUDIT_ACTION,
            run_id = %record.run_id,
            passed = record.passed,
            dialect = %record.dialect,
            contract_version = %record.contract_version,
            objects_checked = record.objects_checked,
            blocking = record.blocking,
            advisory = record.advisory,
            missing = c.missing,
            extra = c.extra,
            type_mismatch = c.type_mismatch,
            nullability_mismatch = c.nullability_mismatch,
            column_order_mismatch = c.column_order_mismatch,
            signature_mismatch = c.signature_mismatch,
            definition_mismatch = c.definition_mismatch,
            "schema validation {}",
            if record.passed { "passed" } else { "failed" }
        );
        Ok(())
    }
}

/// Discards records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _session: &dyn Session, _record: &AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Inserts one row per run into the activity event table.
#[derive(Debug, Clone)]
pub struct EventTableSink {
    dialect: Dialect,
    schema: String,
    table: String,
    actor_id: String,
    source: String,
}

impl EventTableSink {
    /// Sink writing to `ACTIVITY.EVENTS`.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            schema: sentinel_contract::activity::EVENTS_SCHEMA.to_string(),
            table: sentinel_contract::activity::EVENTS_TABLE.to_string(),
            actor_id: "schema_sentinel".to_string(),
            source: "schema_sentinel".to_string(),
        }
    }

    pub fn with_table(mut self, schema: impl Into<String>, table: impl Into<String>) -> Self {
        self.schema = schema.into();
        self.table = table.into();
        self
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = actor_id.into();
        self
    }

    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {}.{} \
             (EVENT_ID, OCCURRED_AT, ACTION, ACTOR_ID, OBJECT_TYPE, OBJECT_ID, ATTRIBUTES, SOURCE) \
             SELECT ?, CURRENT_TIMESTAMP, ?, ?, ?, ?, {}, ?",
            self.dialect.quote_ident(&self.schema),
            self.dialect.quote_ident(&self.table),
            self.dialect.json_param()
        )
    }
}

/// `act_` followed by 12 hex characters.
pub fn new_event_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("act_{}", &id[..12])
}

impl AuditSink for EventTableSink {
    fn record(&self, session: &dyn Session, record: &AuditRecord) -> Result<(), AuditError> {
        let attributes = serde_json::to_string(record)?;
        let params = [
            DbValue::from(new_event_id()),
            DbValue::from(AUDIT_ACTION),
            DbValue::from(self.actor_id.as_str()),
            DbValue::from("schema_contract"),
            DbValue::from(record.contract_version.as_str()),
            DbValue::from(attributes),
            DbValue::from(self.source.as_str()),
        ];
        session.execute(&self.insert_sql(), &params)?;
        Ok(())
    }
}
