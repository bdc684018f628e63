//! End-to-end validation against an in-memory DuckDB catalog.
//!
//! Each test builds a live schema with plain DDL, validates it, and where
//! drift is found applies the generated remediation script and validates
//! again.

use std::cell::Cell;

use sentinel_contract::{
    activity::{events_columns, EVENTS_SCHEMA, EVENTS_TABLE},
    activity_contract, ColumnSpec, DataType, ObjectKey, ObjectKind, SchemaContract, ViewSpec,
};
use sentinel_db::{BackendError, DbConnection, DbRow, DbValue, Session};
use sentinel_validator::{
    AuditError, AuditRecord, AuditSink, Dialect, DriftKind, EventTableSink, NullAuditSink,
    SchemaSentinel, Severity, ValidateOptions, ValidationError,
};

// =============================================================================
// Helpers
// =============================================================================

fn events_contract() -> SchemaContract {
    SchemaContract::new("1.0.0")
        .with_table(
            "ACTIVITY",
            "EVENTS",
            vec![
                ColumnSpec::required("EVENT_ID", DataType::String).primary_key(),
                ColumnSpec::required("ACTION", DataType::String),
                ColumnSpec::optional("ATTRIBUTES", DataType::Variant),
                ColumnSpec::optional("SCORE", DataType::Float),
            ],
        )
        .with_view(
            "ACTIVITY",
            "VW_ACTIONS",
            ViewSpec::new(vec!["ACTION", "EVENT_COUNT"]).with_definition(
                "SELECT ACTION, COUNT(*) AS EVENT_COUNT FROM ACTIVITY.EVENTS GROUP BY ACTION",
            ),
        )
}

fn sentinel(contract: SchemaContract) -> SchemaSentinel {
    SchemaSentinel::new(contract, Dialect::DuckDb).with_audit_sink(NullAuditSink)
}

fn create_matching_schema(conn: &DbConnection) {
    conn.execute_batch(
        "CREATE SCHEMA ACTIVITY;
         CREATE TABLE ACTIVITY.EVENTS (
             EVENT_ID VARCHAR NOT NULL PRIMARY KEY,
             ACTION VARCHAR NOT NULL,
             ATTRIBUTES JSON,
             SCORE DOUBLE
         );
         CREATE VIEW ACTIVITY.VW_ACTIONS AS
             SELECT ACTION, COUNT(*) AS EVENT_COUNT FROM ACTIVITY.EVENTS GROUP BY ACTION;",
    )
    .unwrap();
}

/// Apply the script for the validator's last result, then validate again.
fn fix_and_revalidate(sentinel: &mut SchemaSentinel, conn: &DbConnection) -> usize {
    let script = sentinel.generate_remediation_script().unwrap();
    assert!(!script.is_empty(), "expected executable statements");
    conn.execute_batch(&script.executable_sql()).unwrap();

    let after = sentinel
        .validate(conn, &ValidateOptions::default())
        .unwrap();
    after.blocking_count()
}

// =============================================================================
// Validation
// =============================================================================

/// Test that a database built from the contract passes.
#[test]
fn test_matching_database_passes() {
    let conn = DbConnection::open_duckdb_memory().unwrap();
    create_matching_schema(&conn);

    let mut sentinel = sentinel(events_contract());
    let result = sentinel.validate(&conn, &ValidateOptions::default()).unwrap();

    assert!(result.passed, "unexpected findings: {:?}", result.findings);
    assert_eq!(result.blocking_count(), 0);
    assert_eq!(result.objects_checked, 2);
}

/// Test that an empty database reports every object missing, and the fix
/// creates them.
#[test]
fn test_empty_database_is_fully_remediated() {
    let conn = DbConnection::open_duckdb_memory().unwrap();
    let mut sentinel = sentinel(events_contract());

    let result = sentinel.validate(&conn, &ValidateOptions::default()).unwrap();
    assert!(!result.passed);
    assert_eq!(result.blocking_count(), 2);
    assert!(result
        .findings
        .iter()
        .all(|f| f.drift == DriftKind::Missing && f.column.is_none()));

    assert_eq!(fix_and_revalidate(&mut sentinel, &conn), 0);
}

/// Test that a nullable column the contract requires is fixed with SET NOT NULL.
#[test]
fn test_nullability_drift_is_fixed_by_alter() {
    let conn = DbConnection::open_duckdb_memory().unwrap();
    conn.execute_batch(
        "CREATE SCHEMA ACTIVITY;
         CREATE TABLE ACTIVITY.EVENTS (EVENT_ID VARCHAR NOT NULL, ACTION VARCHAR, ATTRIBUTES JSON, SCORE DOUBLE);",
    )
    .unwrap();

    let mut sentinel = sentinel(events_contract());
    let options = ValidateOptions::default().skip_view_checks(true);
    let result = sentinel.validate(&conn, &options).unwrap();

    assert_eq!(result.findings.len(), 1);
    let finding = &result.findings[0];
    assert_eq!(finding.drift, DriftKind::NullabilityMismatch);
    assert_eq!(finding.column.as_deref(), Some("ACTION"));
    assert_eq!(finding.severity, Severity::Blocking);

    let script = sentinel.generate_remediation_script().unwrap();
    assert_eq!(
        script.executable_sql(),
        "ALTER TABLE ACTIVITY.EVENTS ALTER COLUMN ACTION SET NOT NULL;"
    );
    conn.execute_batch(&script.executable_sql()).unwrap();

    let after = sentinel.validate(&conn, &options).unwrap();
    assert!(after.passed, "{:?}", after.findings);
}

/// Test that type drift and a missing required column are both repaired.
#[test]
fn test_type_drift_and_missing_column() {
    let conn = DbConnection::open_duckdb_memory().unwrap();
    conn.execute_batch(
        "CREATE SCHEMA ACTIVITY;
         CREATE TABLE ACTIVITY.EVENTS (EVENT_ID VARCHAR NOT NULL, ATTRIBUTES JSON, SCORE INTEGER);",
    )
    .unwrap();

    let mut sentinel = sentinel(events_contract());
    let options = ValidateOptions::default().skip_view_checks(true);
    let result = sentinel.validate(&conn, &options).unwrap();

    let drifts: Vec<(DriftKind, Option<&str>)> = result
        .findings
        .iter()
        .map(|f| (f.drift, f.column.as_deref()))
        .collect();
    assert!(drifts.contains(&(DriftKind::Missing, Some("ACTION"))));
    assert!(drifts.contains(&(DriftKind::TypeMismatch, Some("SCORE"))));

    let script = sentinel.generate_remediation_script().unwrap();
    conn.execute_batch(&script.executable_sql()).unwrap();
    let after = sentinel.validate(&conn, &options).unwrap();
    assert_eq!(after.blocking_count(), 0, "{:?}", after.findings);
}

/// Test that applying the script twice is harmless and leaves no blocking drift.
#[test]
fn test_remediation_script_is_idempotent() {
    let conn = DbConnection::open_duckdb_memory().unwrap();
    conn.execute_batch(
        "CREATE SCHEMA ACTIVITY;
         CREATE TABLE ACTIVITY.EVENTS (EVENT_ID VARCHAR NOT NULL, ACTION VARCHAR, SCORE INTEGER);",
    )
    .unwrap();

    let mut sentinel = sentinel(events_contract());
    sentinel.validate(&conn, &ValidateOptions::default()).unwrap();
    let script = sentinel.generate_remediation_script().unwrap();

    conn.execute_batch(&script.executable_sql()).unwrap();
    conn.execute_batch(&script.executable_sql()).unwrap();

    let after = sentinel.validate(&conn, &ValidateOptions::default()).unwrap();
    assert!(after.passed, "{:?}", after.findings);

    let second = sentinel.generate_remediation_script().unwrap();
    assert!(second.is_empty());
}

/// Test that the portable part of the built-in contract can be created from scratch.
#[test]
fn test_activity_contract_bootstraps_on_duckdb() {
    let conn = DbConnection::open_duckdb_memory().unwrap();
    let contract = activity_contract()
        .without_kind(ObjectKind::Procedure)
        .without_kind(ObjectKind::Stage);
    let mut sentinel = sentinel(contract);

    let result = sentinel.validate(&conn, &ValidateOptions::default()).unwrap();
    assert_eq!(result.blocking_count(), 4);
    assert_eq!(fix_and_revalidate(&mut sentinel, &conn), 0);
}

/// Test that the full built-in contract is rejected on DuckDB rather than
/// reporting its procedure and stage as missing.
#[test]
fn test_activity_contract_needs_snowflake_catalog() {
    let conn = DbConnection::open_duckdb_memory().unwrap();
    let mut sentinel = sentinel(activity_contract());
    let err = sentinel
        .validate(&conn, &ValidateOptions::default())
        .unwrap_err();
    assert!(matches!(err, ValidationError::UnsupportedKind { .. }));
}

// =============================================================================
// Options
// =============================================================================

/// Test that skipped views are neither required nor reported as extra.
#[test]
fn test_skip_view_checks() {
    let conn = DbConnection::open_duckdb_memory().unwrap();
    conn.execute_batch(
        "CREATE SCHEMA ACTIVITY;
         CREATE TABLE ACTIVITY.EVENTS (EVENT_ID VARCHAR NOT NULL, ACTION VARCHAR NOT NULL, ATTRIBUTES JSON, SCORE DOUBLE);
         CREATE VIEW ACTIVITY.VW_UNDECLARED AS SELECT 1 AS X;",
    )
    .unwrap();

    let mut sentinel = sentinel(events_contract());

    let with_views = sentinel.validate(&conn, &ValidateOptions::default()).unwrap();
    assert!(!with_views.passed);

    let options = ValidateOptions::strict().skip_view_checks(true);
    let without_views = sentinel.validate(&conn, &options).unwrap();
    assert!(without_views.passed, "{:?}", without_views.findings);
    assert!(without_views
        .findings
        .iter()
        .all(|f| f.key.kind != ObjectKind::View));
    assert_eq!(without_views.objects_checked, 1);
}

/// Test that skipping views over a views-only contract leaves nothing to check,
/// even when the view's schema also holds undeclared tables.
#[test]
fn test_skip_view_checks_with_views_only_contract() {
    let conn = DbConnection::open_duckdb_memory().unwrap();
    conn.execute_batch(
        "CREATE SCHEMA RPT;
         CREATE TABLE RPT.BASE (ID INTEGER);
         CREATE VIEW RPT.V AS SELECT ID FROM RPT.BASE;",
    )
    .unwrap();

    let contract = SchemaContract::new("1.0.0").with_view("RPT", "V", ViewSpec::new(vec!["ID"]));
    let mut sentinel = sentinel(contract);

    for options in [
        ValidateOptions::default().skip_view_checks(true),
        ValidateOptions::strict().skip_view_checks(true),
    ] {
        let result = sentinel.validate(&conn, &options).unwrap();
        assert!(result.passed, "{:?}", result.findings);
        assert!(result.findings.is_empty(), "{:?}", result.findings);
        assert_eq!(result.objects_checked, 0);
    }

    // Without skipping, the base table sharing the view's schema is extra.
    let checked = sentinel.validate(&conn, &ValidateOptions::default()).unwrap();
    assert!(checked.passed);
    assert_eq!(checked.advisory_count(), 1);
    assert_eq!(checked.findings[0].key, ObjectKey::table("RPT", "BASE"));
}

/// Test that an undeclared table is advisory, and blocking in strict mode.
#[test]
fn test_extra_table_severity() {
    let conn = DbConnection::open_duckdb_memory().unwrap();
    create_matching_schema(&conn);
    conn.execute_batch("CREATE TABLE ACTIVITY.SCRATCH (X INTEGER);")
        .unwrap();

    let mut sentinel = sentinel(events_contract());
    let relaxed = sentinel.validate(&conn, &ValidateOptions::default()).unwrap();
    assert!(relaxed.passed);
    assert_eq!(relaxed.advisory_count(), 1);
    assert_eq!(relaxed.findings[0].key, ObjectKey::table("ACTIVITY", "SCRATCH"));

    let strict = sentinel.validate(&conn, &ValidateOptions::strict()).unwrap();
    assert!(!strict.passed);

    // Dropping is never automatic.
    let script = sentinel.generate_remediation_script().unwrap();
    assert!(script.is_empty());
    assert!(script.render().contains("DROP TABLE ACTIVITY.SCRATCH"));
}

/// Test that throw_on_drift returns the result inside the error and still
/// leaves the validator ready to generate a fix.
#[test]
fn test_drift_detected_keeps_result() {
    let conn = DbConnection::open_duckdb_memory().unwrap();
    let mut sentinel = sentinel(events_contract());

    let err = sentinel
        .validate(&conn, &ValidateOptions::default().throw_on_drift(true))
        .unwrap_err();
    let result = err.drift_result().expect("DriftDetected carries the result");
    assert!(!result.passed);
    assert_eq!(sentinel.last_result(), Some(result));
    assert!(sentinel.generate_remediation_script().is_ok());
}

/// Test that throw_on_drift does nothing when validation passes.
#[test]
fn test_throw_on_drift_passes_clean_database() {
    let conn = DbConnection::open_duckdb_memory().unwrap();
    create_matching_schema(&conn);
    let mut sentinel = sentinel(events_contract());
    let result = sentinel
        .validate(&conn, &ValidateOptions::default().throw_on_drift(true))
        .unwrap();
    assert!(result.passed);
}

// =============================================================================
// Audit
// =============================================================================

struct FailingSink {
    calls: Cell<usize>,
}

impl AuditSink for FailingSink {
    fn record(&self, _session: &dyn Session, _record: &AuditRecord) -> Result<(), AuditError> {
        self.calls.set(self.calls.get() + 1);
        Err(AuditError::Backend(BackendError::Database(
            "event table unavailable".to_string(),
        )))
    }
}

/// Test that a failing audit sink does not change the outcome.
#[test]
fn test_audit_failure_is_ignored() {
    let conn = DbConnection::open_duckdb_memory().unwrap();
    create_matching_schema(&conn);

    let mut sentinel = SchemaSentinel::new(events_contract(), Dialect::DuckDb).with_audit_sink(
        FailingSink {
            calls: Cell::new(0),
        },
    );
    let result = sentinel.validate(&conn, &ValidateOptions::default()).unwrap();
    assert!(result.passed);
}

/// Test that the event table sink writes one row per run, and none with logging off.
#[test]
fn test_event_table_sink_writes_activity_event() {
    let conn = DbConnection::open_duckdb_memory().unwrap();
    let contract =
        SchemaContract::new("1.0.0").with_table(EVENTS_SCHEMA, EVENTS_TABLE, events_columns());

    // Bootstrap the event table from the contract itself.
    let mut bootstrap = sentinel(contract.clone());
    bootstrap.validate(&conn, &ValidateOptions::default()).unwrap();
    let script = bootstrap.generate_remediation_script().unwrap();
    conn.execute_batch(&script.executable_sql()).unwrap();

    let mut sentinel = SchemaSentinel::new(contract, Dialect::DuckDb)
        .with_audit_sink(EventTableSink::new(Dialect::DuckDb).with_actor("ci"));
    let result = sentinel.validate(&conn, &ValidateOptions::default()).unwrap();
    assert!(result.passed, "{:?}", result.findings);
    sentinel
        .validate(&conn, &ValidateOptions::default().log_activity(false))
        .unwrap();

    let rows = conn
        .query_all(
            "SELECT EVENT_ID, ACTION, ACTOR_ID, CAST(ATTRIBUTES AS VARCHAR) AS ATTRS FROM ACTIVITY.EVENTS",
            &[],
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    let event_id: String = rows[0].get_by_name("EVENT_ID").unwrap();
    let action: String = rows[0].get_by_name("ACTION").unwrap();
    let actor: String = rows[0].get_by_name("ACTOR_ID").unwrap();
    let attrs: String = rows[0].get_by_name("ATTRS").unwrap();
    assert!(event_id.starts_with("act_"));
    assert_eq!(action, "ccode.schema_validation");
    assert_eq!(actor, "ci");

    let attrs: serde_json::Value = serde_json::from_str(&attrs).unwrap();
    assert_eq!(attrs["run_id"], result.run_id.to_string());
    assert_eq!(attrs["passed"], true);
}

// =============================================================================
// Session Failures
// =============================================================================

/// Session whose first `healthy_queries` queries succeed with no rows.
struct FlakySession {
    healthy_queries: usize,
    seen: Cell<usize>,
}

impl Session for FlakySession {
    fn query_all(&self, _sql: &str, _params: &[DbValue]) -> Result<Vec<DbRow>, BackendError> {
        let n = self.seen.get();
        self.seen.set(n + 1);
        if n < self.healthy_queries {
            Ok(vec![DbRow::from_pairs([("?column?", 1_i64)])])
        } else {
            Err(BackendError::Connection("connection reset".to_string()))
        }
    }

    fn execute(&self, _sql: &str, _params: &[DbValue]) -> Result<u64, BackendError> {
        Err(BackendError::ReadOnly)
    }

    fn execute_batch(&self, _sql: &str) -> Result<(), BackendError> {
        Err(BackendError::ReadOnly)
    }

    fn backend_name(&self) -> &'static str {
        "Flaky"
    }
}

/// Test that an unreachable session is a connection error and leaves no result.
#[test]
fn test_unreachable_session_is_connection_error() {
    let session = FlakySession {
        healthy_queries: 0,
        seen: Cell::new(0),
    };
    let mut sentinel = sentinel(events_contract());
    let err = sentinel
        .validate(&session, &ValidateOptions::default())
        .unwrap_err();
    assert!(matches!(err, ValidationError::Connection(_)));
    assert!(sentinel.last_result().is_none());
}

/// Test that a catalog query failing mid-run aborts with an introspection error.
#[test]
fn test_failed_catalog_query_aborts_run() {
    let session = FlakySession {
        healthy_queries: 1,
        seen: Cell::new(0),
    };
    let mut sentinel = sentinel(events_contract());
    let err = sentinel
        .validate(&session, &ValidateOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ValidationError::Introspection {
            kind: ObjectKind::Table,
            ..
        }
    ));
    assert!(sentinel.last_result().is_none());
}
