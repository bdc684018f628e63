//! Contract vs. snapshot comparison.
//!
//! Pure: no I/O, deterministic for a given contract, snapshot and options.

use std::collections::{BTreeSet, HashMap};

use sentinel_contract::{
    format_signature, normalize_ident, ObjectKey, ObjectKind, ObjectSpec, RoutineSpec,
    SchemaContract, TableSpec, ViewFingerprinter, ViewSpec,
};

use crate::finding::{DriftKind, Finding, Severity};
use crate::options::ValidateOptions;
use crate::snapshot::{LiveColumn, LiveObject, LiveSnapshot};

/// Compare the contract with a snapshot and classify every difference.
pub fn compare(
    contract: &SchemaContract,
    snapshot: &LiveSnapshot,
    options: &ValidateOptions,
    fingerprinter: &dyn ViewFingerprinter,
) -> Vec<Finding> {
    let in_scope = |kind: ObjectKind| !(options.skip_view_checks && kind == ObjectKind::View);
    let mut findings = Vec::new();

    for (key, spec) in contract.objects().filter(|(k, _)| in_scope(k.kind)) {
        match snapshot.get(key) {
            None => findings.push(
                Finding::object(key, DriftKind::Missing, Severity::Blocking)
                    .expected(key.kind.as_str()),
            ),
            Some(live) => {
                compare_object(key, spec, live, options, fingerprinter, &mut findings)
            }
        }
    }

    if options.detect_extra {
        let declared = contract.schemas_declaring(in_scope);
        for (key, _) in snapshot.objects() {
            if in_scope(key.kind)
                && declared.contains(&key.schema)
                && contract.get(key).is_none()
            {
                findings.push(
                    Finding::object(
                        key,
                        DriftKind::Extra,
                        Severity::advisory_unless(options.strict_mode),
                    )
                    .actual(key.kind.as_str()),
                );
            }
        }
    }

    findings.sort_by(|a, b| a.key.cmp(&b.key));
    findings
}

fn compare_object(
    key: &ObjectKey,
    spec: &ObjectSpec,
    live: &LiveObject,
    options: &ValidateOptions,
    fingerprinter: &dyn ViewFingerprinter,
    findings: &mut Vec<Finding>,
) {
    match (spec, live) {
        (ObjectSpec::Table(table), LiveObject::Table { columns }) => {
            compare_table(key, table, columns, options, findings)
        }
        (ObjectSpec::View(view), LiveObject::View {
            columns,
            definition,
        }) => compare_view(
            key,
            view,
            columns,
            definition.as_deref(),
            options,
            fingerprinter,
            findings,
        ),
        (ObjectSpec::Procedure(routine) | ObjectSpec::Function(routine), LiveObject::Routine { overloads }) => {
            compare_routine(key, routine, overloads, findings)
        }
        // Existence is the whole check.
        (ObjectSpec::Stage(_), LiveObject::Stage) => {}
        // Keys carry the kind, so spec and live variants always agree.
        _ => {}
    }
}

fn compare_table(
    key: &ObjectKey,
    spec: &TableSpec,
    live: &[LiveColumn],
    options: &ValidateOptions,
    findings: &mut Vec<Finding>,
) {
    if spec.columns.is_empty() {
        return;
    }

    let live_by_name: HashMap<String, &LiveColumn> =
        live.iter().map(|c| (normalize_ident(&c.name), c)).collect();

    for expected in &spec.columns {
        let Some(actual) = live_by_name.get(&normalize_ident(&expected.name)) else {
            findings.push(
                Finding::column(key, &expected.name, DriftKind::Missing, Severity::Blocking)
                    .expected(format!(
                        "{} {}",
                        expected.data_type,
                        nullability(expected.nullable)
                    )),
            );
            continue;
        };

        if actual.data_type != expected.data_type {
            findings.push(
                Finding::column(key, &expected.name, DriftKind::TypeMismatch, Severity::Blocking)
                    .expected(expected.data_type.canonical_name())
                    .actual(actual.raw_type.clone()),
            );
        }
        if actual.nullable != expected.nullable {
            findings.push(
                Finding::column(
                    key,
                    &expected.name,
                    DriftKind::NullabilityMismatch,
                    Severity::Blocking,
                )
                .expected(nullability(expected.nullable))
                .actual(nullability(actual.nullable)),
            );
        }
    }

    let expected_names: Vec<String> = spec.columns.iter().map(|c| c.name.clone()).collect();
    let live_names: Vec<String> = live.iter().map(|c| c.name.clone()).collect();
    compare_column_sets(key, &expected_names, &live_names, false, options, findings);
}

fn compare_view(
    key: &ObjectKey,
    spec: &ViewSpec,
    live_columns: &[String],
    live_definition: Option<&str>,
    options: &ValidateOptions,
    fingerprinter: &dyn ViewFingerprinter,
    findings: &mut Vec<Finding>,
) {
    if !spec.columns.is_empty() {
        compare_column_sets(key, &spec.columns, live_columns, true, options, findings);
    }

    if let Some(expected) = spec.expected_fingerprint(fingerprinter) {
        let actual = live_definition.map(|d| fingerprinter.fingerprint(d));
        if actual.as_deref() != Some(expected.as_str()) {
            findings.push(
                Finding::object(
                    key,
                    DriftKind::DefinitionMismatch,
                    Severity::advisory_unless(options.strict_mode),
                )
                .expected(short_fingerprint(&expected))
                .actual(
                    actual
                        .as_deref()
                        .map(short_fingerprint)
                        .unwrap_or_else(|| "definition unavailable".to_string()),
                ),
            );
        }
    }
}

/// Extra columns and relative order of shared columns. Missing columns are
/// reported here only for views; tables report them with their type.
fn compare_column_sets(
    key: &ObjectKey,
    expected: &[String],
    live: &[String],
    report_missing: bool,
    options: &ValidateOptions,
    findings: &mut Vec<Finding>,
) {
    let expected_set: BTreeSet<String> = expected.iter().map(|c| normalize_ident(c)).collect();
    let live_set: BTreeSet<String> = live.iter().map(|c| normalize_ident(c)).collect();

    if report_missing {
        for name in expected {
            if !live_set.contains(&normalize_ident(name)) {
                findings.push(Finding::column(
                    key,
                    name,
                    DriftKind::Missing,
                    Severity::Blocking,
                ));
            }
        }
    }

    if options.detect_extra {
        for name in live {
            if !expected_set.contains(&normalize_ident(name)) {
                findings.push(Finding::column(
                    key,
                    name,
                    DriftKind::Extra,
                    Severity::advisory_unless(options.strict_mode),
                ));
            }
        }
    }

    let expected_order: Vec<String> = expected
        .iter()
        .map(|c| normalize_ident(c))
        .filter(|c| live_set.contains(c))
        .collect();
    let live_order: Vec<String> = live
        .iter()
        .map(|c| normalize_ident(c))
        .filter(|c| expected_set.contains(c))
        .collect();
    if expected_order != live_order {
        findings.push(
            Finding::object(
                key,
                DriftKind::ColumnOrderMismatch,
                Severity::advisory_unless(options.strict_mode),
            )
            .expected(expected_order.join(", "))
            .actual(live_order.join(", ")),
        );
    }
}

fn compare_routine(
    key: &ObjectKey,
    spec: &RoutineSpec,
    overloads: &[Vec<sentinel_contract::DataType>],
    findings: &mut Vec<Finding>,
) {
    let expected = spec.signature();
    if !overloads.contains(&expected) {
        let actual: Vec<String> = overloads.iter().map(|o| format_signature(o)).collect();
        findings.push(
            Finding::object(key, DriftKind::SignatureMismatch, Severity::Blocking)
                .expected(format_signature(&expected))
                .actual(actual.join(" | ")),
        );
    }
}

fn nullability(nullable: bool) -> &'static str {
    if nullable {
        "NULL"
    } else {
        "NOT NULL"
    }
}

fn short_fingerprint(fingerprint: &str) -> String {
    fingerprint.chars().take(12).collect()
}
