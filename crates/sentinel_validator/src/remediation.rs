//! Remediation scripts.
//!
//! Only blocking findings become executable statements. Everything else
//! (advisory findings, destructive fixes, objects the contract cannot
//! recreate) is rendered as commented-out notes for a human to review.
//!
//! Every executable statement is idempotent: `IF NOT EXISTS`, `OR REPLACE`,
//! or an `ALTER` that is a no-op once applied.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use uuid::Uuid;

use sentinel_contract::{ObjectKey, ObjectKind, ObjectSpec, SchemaContract};

use crate::dialect::Dialect;
use crate::finding::{DriftKind, Finding};
use crate::result::ValidationResult;

/// One executable statement, without the trailing `;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationStatement {
    /// What the statement changes, e.g. `TABLE ACTIVITY.EVENTS` or `SCHEMA MCP`.
    pub target: String,
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationScript {
    pub run_id: Uuid,
    pub validated_at: DateTime<Utc>,
    pub dialect: Dialect,
    /// In dependency order.
    pub statements: Vec<RemediationStatement>,
    /// Commented-out suggestions, one per line.
    pub advisories: Vec<String>,
}

impl RemediationScript {
    /// True when there is nothing to execute.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Statements joined as one batch, for applying through a session.
    pub fn executable_sql(&self) -> String {
        self.statements
            .iter()
            .map(|s| format!("{};", s.sql))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("-- Schema Sentinel remediation script\n");
        out.push_str(&format!("-- Validation run: {}\n", self.run_id));
        out.push_str(&format!(
            "-- Validated at: {}\n",
            self.validated_at.to_rfc3339()
        ));
        out.push_str(&format!("-- Dialect: {}\n", self.dialect));
        out.push_str(&format!(
            "-- Statements: {}, advisory notes: {}\n",
            self.statements.len(),
            self.advisories.len()
        ));

        if self.statements.is_empty() {
            out.push_str("\n-- No blocking drift; nothing to execute.\n");
        }
        for statement in &self.statements {
            out.push('\n');
            out.push_str(&statement.sql);
            out.push_str(";\n");
        }

        if !self.advisories.is_empty() {
            out.push_str("\n-- Advisory (review manually; not executed):\n");
            for note in &self.advisories {
                for line in note.lines() {
                    out.push_str("-- ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        out
    }
}

/// Build the remediation script for `result` against `contract`.
pub fn generate(
    contract: &SchemaContract,
    result: &ValidationResult,
    dialect: Dialect,
) -> RemediationScript {
    let mut builder = ScriptBuilder::new(dialect);

    let mut by_object: BTreeMap<&ObjectKey, Vec<&Finding>> = BTreeMap::new();
    for finding in &result.findings {
        if finding.is_blocking() {
            by_object.entry(&finding.key).or_default().push(finding);
        } else {
            builder.advise(advisory_note(dialect, finding));
        }
    }

    // Schemas of missing objects are created up front, once each.
    let schemas: BTreeSet<&str> = by_object
        .iter()
        .filter(|(_, fs)| fs.iter().any(|f| is_missing_object(f)))
        .map(|(key, _)| key.schema.as_str())
        .collect();
    for schema in schemas {
        builder.push(format!("SCHEMA {}", schema), dialect.create_schema(schema));
    }

    for (key, findings) in by_object {
        match contract.get(key) {
            Some(spec) => builder.fix_object(key, spec, &findings),
            None => {
                // Only EXTRA findings reference objects outside the contract.
                for finding in findings {
                    builder.advise(advisory_note(dialect, finding));
                }
            }
        }
    }

    RemediationScript {
        run_id: result.run_id,
        validated_at: result.validated_at,
        dialect,
        statements: builder.statements,
        advisories: builder.advisories,
    }
}

fn is_missing_object(finding: &Finding) -> bool {
    finding.drift == DriftKind::Missing && finding.column.is_none()
}

struct ScriptBuilder {
    dialect: Dialect,
    statements: Vec<RemediationStatement>,
    advisories: Vec<String>,
    seen: HashSet<String>,
}

impl ScriptBuilder {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            statements: Vec::new(),
            advisories: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn push(&mut self, target: impl ToString, sql: String) {
        if self.seen.insert(sql.clone()) {
            self.statements.push(RemediationStatement {
                target: target.to_string(),
                sql,
            });
        }
    }

    fn advise(&mut self, note: String) {
        if self.seen.insert(note.clone()) {
            self.advisories.push(note);
        }
    }

    fn fix_object(&mut self, key: &ObjectKey, spec: &ObjectSpec, findings: &[&Finding]) {
        let d = self.dialect;
        let missing = findings.iter().any(|f| is_missing_object(f));

        match spec {
            ObjectSpec::Table(table) => {
                if missing {
                    self.push(key, d.create_table(key, table));
                    return;
                }
                for finding in findings {
                    let column = finding.column.as_deref().and_then(|c| table.column(c));
                    match (finding.drift, column) {
                        (DriftKind::Missing, Some(col)) => {
                            self.push(key, d.add_column(key, col));
                            if !col.nullable {
                                self.push(key, d.set_nullability(key, &col.name, false));
                            }
                        }
                        (DriftKind::TypeMismatch, Some(col)) => {
                            self.push(key, d.set_column_type(key, col));
                        }
                        (DriftKind::NullabilityMismatch, Some(col)) => {
                            self.push(key, d.set_nullability(key, &col.name, col.nullable));
                        }
                        _ => self.advise(advisory_note(d, finding)),
                    }
                }
            }
            ObjectSpec::View(view) => match &view.definition {
                Some(definition) => self.push(key, d.create_view(key, definition)),
                None => self.advise(format!(
                    "{}: {} and the contract has no definition to recreate it from",
                    key,
                    describe(findings)
                )),
            },
            ObjectSpec::Procedure(routine) | ObjectSpec::Function(routine) => {
                match d.create_routine(key, routine) {
                    Some(sql) => self.push(key, sql),
                    None => self.advise(format!(
                        "{}: {}; recreate manually (no routine body in the contract or no {} support)",
                        key,
                        describe(findings),
                        d
                    )),
                }
            }
            ObjectSpec::Stage(stage) => match d.create_stage(key, stage) {
                Some(sql) => self.push(key, sql),
                None => self.advise(format!("{}: {}; {} has no stages", key, describe(findings), d)),
            },
        }
    }
}

fn describe(findings: &[&Finding]) -> String {
    let kinds: BTreeSet<&str> = findings.iter().map(|f| f.drift.as_str()).collect();
    kinds.into_iter().collect::<Vec<_>>().join(", ")
}

/// A commented note for a finding that is not fixed automatically.
fn advisory_note(dialect: Dialect, finding: &Finding) -> String {
    let suggestion = match (finding.drift, &finding.column) {
        (DriftKind::Extra, Some(column)) if finding.key.kind == ObjectKind::Table => {
            Some(dialect.drop_column(&finding.key, column))
        }
        (DriftKind::Extra, None) => Some(dialect.drop_object(&finding.key)),
        _ => None,
    };
    match suggestion {
        Some(sql) => format!("{}\n  suggestion: {};", finding, sql),
        None => finding.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Severity;
    use crate::options::ValidateOptions;
    use sentinel_contract::{ColumnSpec, DataType, ParamSpec, RoutineSpec, ViewSpec};

    fn contract() -> SchemaContract {
        SchemaContract::new("1")
            .with_table(
                "ACTIVITY",
                "EVENTS",
                vec![
                    ColumnSpec::required("EVENT_ID", DataType::String).primary_key(),
                    ColumnSpec::required("SOURCE", DataType::String),
                    ColumnSpec::optional("ATTRIBUTES", DataType::Variant),
                ],
            )
            .with_view(
                "ACTIVITY",
                "VW_IDS",
                ViewSpec::new(vec!["EVENT_ID"]).with_definition("SELECT EVENT_ID FROM ACTIVITY.EVENTS"),
            )
            .with_view("ACTIVITY", "VW_OPAQUE", ViewSpec::new(vec!["X"]))
            .with_procedure(
                "MCP",
                "LOG_EVENT",
                RoutineSpec::new(vec![ParamSpec::new("P", DataType::Variant)]).body("BEGIN RETURN 1; END"),
            )
    }

    fn result(findings: Vec<Finding>) -> ValidationResult {
        ValidationResult::new(findings, ValidateOptions::default(), Dialect::Snowflake, "1", "h", 4)
    }

    fn sql(script: &RemediationScript) -> Vec<&str> {
        script.statements.iter().map(|s| s.sql.as_str()).collect()
    }

    #[test]
    fn test_missing_objects_in_dependency_order() {
        let c = contract();
        let findings = vec![
            Finding::object(
                &ObjectKey::new("MCP", "LOG_EVENT", ObjectKind::Procedure),
                DriftKind::Missing,
                Severity::Blocking,
            ),
            Finding::object(&ObjectKey::view("ACTIVITY", "VW_IDS"), DriftKind::Missing, Severity::Blocking),
            Finding::object(&ObjectKey::table("ACTIVITY", "EVENTS"), DriftKind::Missing, Severity::Blocking),
        ];
        let script = generate(&c, &result(findings), Dialect::Snowflake);
        let statements = sql(&script);
        assert_eq!(statements[0], "CREATE SCHEMA IF NOT EXISTS ACTIVITY");
        assert_eq!(statements[1], "CREATE SCHEMA IF NOT EXISTS MCP");
        assert!(statements[2].starts_with("CREATE TABLE IF NOT EXISTS ACTIVITY.EVENTS"));
        assert!(statements[3].starts_with("CREATE OR REPLACE VIEW ACTIVITY.VW_IDS"));
        assert!(statements[4].starts_with("CREATE OR REPLACE PROCEDURE MCP.LOG_EVENT"));
        assert_eq!(statements.len(), 5);
    }

    #[test]
    fn test_missing_required_column_adds_then_sets_not_null() {
        let key = ObjectKey::table("ACTIVITY", "EVENTS");
        let findings = vec![
            Finding::column(&key, "SOURCE", DriftKind::Missing, Severity::Blocking),
            Finding::column(&key, "ATTRIBUTES", DriftKind::NullabilityMismatch, Severity::Blocking),
        ];
        let script = generate(&contract(), &result(findings), Dialect::Snowflake);
        assert_eq!(
            sql(&script),
            vec![
                "ALTER TABLE ACTIVITY.EVENTS ADD COLUMN IF NOT EXISTS SOURCE VARCHAR",
                "ALTER TABLE ACTIVITY.EVENTS ALTER COLUMN SOURCE SET NOT NULL",
                "ALTER TABLE ACTIVITY.EVENTS ALTER COLUMN ATTRIBUTES DROP NOT NULL",
            ]
        );
    }

    #[test]
    fn test_view_recreated_once_for_multiple_findings() {
        let key = ObjectKey::view("ACTIVITY", "VW_IDS");
        let findings = vec![
            Finding::column(&key, "EVENT_ID", DriftKind::Missing, Severity::Blocking),
            Finding::object(&key, DriftKind::DefinitionMismatch, Severity::Blocking),
        ];
        let script = generate(&contract(), &result(findings), Dialect::Snowflake);
        assert_eq!(script.statements.len(), 1);
    }

    #[test]
    fn test_view_without_definition_becomes_advisory() {
        let key = ObjectKey::view("ACTIVITY", "VW_OPAQUE");
        let findings = vec![Finding::object(&key, DriftKind::Missing, Severity::Blocking)];
        let script = generate(&contract(), &result(findings), Dialect::Snowflake);
        assert_eq!(sql(&script), vec!["CREATE SCHEMA IF NOT EXISTS ACTIVITY"]);
        assert_eq!(script.advisories.len(), 1);
        assert!(script.advisories[0].contains("no definition"));
    }

    #[test]
    fn test_advisory_findings_are_commented_out() {
        let key = ObjectKey::table("ACTIVITY", "EVENTS");
        let findings = vec![
            Finding::column(&key, "LEGACY", DriftKind::Extra, Severity::Advisory),
            Finding::object(&ObjectKey::table("ACTIVITY", "SCRATCH"), DriftKind::Extra, Severity::Blocking),
        ];
        let script = generate(&contract(), &result(findings), Dialect::Snowflake);
        assert!(script.is_empty());

        let rendered = script.render();
        assert!(rendered.contains("-- No blocking drift; nothing to execute."));
        assert!(rendered.contains("--   suggestion: ALTER TABLE ACTIVITY.EVENTS DROP COLUMN LEGACY;"));
        assert!(rendered.contains("--   suggestion: DROP TABLE ACTIVITY.SCRATCH;"));
        for line in rendered.lines().filter(|l| !l.is_empty()) {
            assert!(line.starts_with("--"), "executable line in advisory-only script: {}", line);
        }
    }

    #[test]
    fn test_render_terminates_statements() {
        let key = ObjectKey::table("ACTIVITY", "EVENTS");
        let findings = vec![Finding::column(&key, "EVENT_ID", DriftKind::TypeMismatch, Severity::Blocking)];
        let script = generate(&contract(), &result(findings), Dialect::DuckDb);
        let rendered = script.render();
        assert!(rendered.starts_with("-- Schema Sentinel remediation script\n"));
        assert!(rendered.contains("-- Dialect: DuckDB\n"));
        assert!(rendered.contains("\nALTER TABLE ACTIVITY.EVENTS ALTER COLUMN EVENT_ID SET DATA TYPE VARCHAR;\n"));
        assert_eq!(
            script.executable_sql(),
            "ALTER TABLE ACTIVITY.EVENTS ALTER COLUMN EVENT_ID SET DATA TYPE VARCHAR;"
        );
    }

    #[test]
    fn test_duckdb_routine_is_advisory() {
        let key = ObjectKey::new("MCP", "LOG_EVENT", ObjectKind::Procedure);
        let findings = vec![Finding::object(&key, DriftKind::SignatureMismatch, Severity::Blocking)];
        let script = generate(&contract(), &result(findings), Dialect::DuckDb);
        assert!(script.is_empty());
        assert!(script.advisories[0].contains("SIGNATURE_MISMATCH"));
    }
}
