//! Property tests for the pure comparison step.

use proptest::prelude::*;
use sentinel_contract::{ColumnSpec, DataType, NormalizedFingerprint, ObjectKey, SchemaContract};
use sentinel_validator::{diff, DriftKind, LiveColumn, LiveSnapshot, Severity, ValidateOptions};

// =============================================================================
// Strategies
// =============================================================================

fn data_type() -> impl Strategy<Value = DataType> {
    prop_oneof![
        Just(DataType::String),
        Just(DataType::Number),
        Just(DataType::Float),
        Just(DataType::Boolean),
        Just(DataType::Date),
        Just(DataType::Timestamp),
        Just(DataType::TimestampTz),
        Just(DataType::Variant),
    ]
}

fn ident() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9_]{0,8}"
}

/// Tables keyed by name, each with distinct column names.
fn tables() -> impl Strategy<Value = Vec<(String, Vec<ColumnSpec>)>> {
    prop::collection::btree_map(
        ident(),
        prop::collection::btree_map(ident(), (data_type(), any::<bool>()), 1..6),
        1..5,
    )
    .prop_map(|tables| {
        tables
            .into_iter()
            .map(|(table, columns)| {
                let columns = columns
                    .into_iter()
                    .map(|(name, (data_type, nullable))| {
                        if nullable {
                            ColumnSpec::optional(name, data_type)
                        } else {
                            ColumnSpec::required(name, data_type)
                        }
                    })
                    .collect();
                (table, columns)
            })
            .collect()
    })
}

// =============================================================================
// Helpers
// =============================================================================

const SCHEMA: &str = "APP";

fn contract_for(tables: &[(String, Vec<ColumnSpec>)]) -> SchemaContract {
    tables
        .iter()
        .fold(SchemaContract::new("1"), |contract, (name, columns)| {
            contract.with_table(SCHEMA, name, columns.clone())
        })
}

/// Live snapshot that mirrors the contract, skipping the table at `skip`.
fn snapshot_for(tables: &[(String, Vec<ColumnSpec>)], skip: Option<usize>) -> LiveSnapshot {
    let mut snapshot = LiveSnapshot::new();
    for (i, (name, columns)) in tables.iter().enumerate() {
        if Some(i) == skip {
            continue;
        }
        let live = columns
            .iter()
            .map(|c| LiveColumn::new(&c.name, c.data_type.canonical_name(), c.nullable))
            .collect();
        snapshot.insert_table(SCHEMA, name, live);
    }
    snapshot
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A snapshot built from the contract itself produces no findings, even in strict mode.
    #[test]
    fn test_mirrored_snapshot_is_clean(tables in tables()) {
        let contract = contract_for(&tables);
        let snapshot = snapshot_for(&tables, None);

        let findings = diff::compare(
            &contract,
            &snapshot,
            &ValidateOptions::strict(),
            &NormalizedFingerprint,
        );
        prop_assert!(findings.is_empty(), "{:?}", findings);
    }

    /// Removing one table yields exactly one finding: that table, blocking, missing.
    #[test]
    fn test_removed_table_is_the_only_finding(
        tables in tables(),
        pick in any::<prop::sample::Index>(),
    ) {
        let skip = pick.index(tables.len());
        let contract = contract_for(&tables);
        let snapshot = snapshot_for(&tables, Some(skip));

        let findings = diff::compare(
            &contract,
            &snapshot,
            &ValidateOptions::default(),
            &NormalizedFingerprint,
        );
        prop_assert_eq!(findings.len(), 1);
        prop_assert_eq!(&findings[0].key, &ObjectKey::table(SCHEMA, &tables[skip].0));
        prop_assert_eq!(findings[0].drift, DriftKind::Missing);
        prop_assert_eq!(findings[0].severity, Severity::Blocking);
        prop_assert!(findings[0].column.is_none());
    }

    /// Strict mode only ever promotes findings; it never adds or drops one.
    #[test]
    fn test_strict_mode_only_promotes(
        tables in tables(),
        extra_columns in prop::collection::btree_set("X_[A-Z]{1,6}", 0..4),
        extra_tables in prop::collection::btree_set("EXTRA_[A-Z]{1,6}", 0..3),
    ) {
        let contract = contract_for(&tables);
        let mut snapshot = LiveSnapshot::new();
        for (name, columns) in &tables {
            let mut live: Vec<LiveColumn> = columns
                .iter()
                .map(|c| LiveColumn::new(&c.name, c.data_type.canonical_name(), c.nullable))
                .collect();
            live.extend(
                extra_columns
                    .iter()
                    .filter(|x| columns.iter().all(|c| &c.name != *x))
                    .map(|x| LiveColumn::new(x, "VARCHAR", true)),
            );
            snapshot.insert_table(SCHEMA, name, live);
        }
        for name in extra_tables.iter().filter(|x| tables.iter().all(|(t, _)| t != *x)) {
            snapshot.insert_table(SCHEMA, name, vec![LiveColumn::new("ID", "BIGINT", true)]);
        }

        let relaxed = diff::compare(&contract, &snapshot, &ValidateOptions::default(), &NormalizedFingerprint);
        let strict = diff::compare(&contract, &snapshot, &ValidateOptions::strict(), &NormalizedFingerprint);

        prop_assert_eq!(relaxed.len(), strict.len());
        let blocking = |f: &[sentinel_validator::Finding]| f.iter().filter(|x| x.is_blocking()).count();
        prop_assert!(blocking(&strict) >= blocking(&relaxed));
        prop_assert_eq!(blocking(&relaxed), 0);
    }
}
