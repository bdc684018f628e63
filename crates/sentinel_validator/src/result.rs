//! Validation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dialect::Dialect;
use crate::finding::{DriftKind, Finding, Severity};
use crate::options::ValidateOptions;

/// Finding counts per drift kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftCounts {
    pub missing: usize,
    pub extra: usize,
    pub type_mismatch: usize,
    pub nullability_mismatch: usize,
    pub column_order_mismatch: usize,
    pub signature_mismatch: usize,
    pub definition_mismatch: usize,
}

impl DriftCounts {
    pub fn add(&mut self, drift: DriftKind) {
        let slot = match drift {
            DriftKind::Missing => &mut self.missing,
            DriftKind::Extra => &mut self.extra,
            DriftKind::TypeMismatch => &mut self.type_mismatch,
            DriftKind::NullabilityMismatch => &mut self.nullability_mismatch,
            DriftKind::ColumnOrderMismatch => &mut self.column_order_mismatch,
            DriftKind::SignatureMismatch => &mut self.signature_mismatch,
            DriftKind::DefinitionMismatch => &mut self.definition_mismatch,
        };
        *slot += 1;
    }

    pub fn get(&self, drift: DriftKind) -> usize {
        match drift {
            DriftKind::Missing => self.missing,
            DriftKind::Extra => self.extra,
            DriftKind::TypeMismatch => self.type_mismatch,
            DriftKind::NullabilityMismatch => self.nullability_mismatch,
            DriftKind::ColumnOrderMismatch => self.column_order_mismatch,
            DriftKind::SignatureMismatch => self.signature_mismatch,
            DriftKind::DefinitionMismatch => self.definition_mismatch,
        }
    }
}

/// Outcome of one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub run_id: Uuid,
    /// True iff no finding is blocking.
    pub passed: bool,
    /// Ordered by object dependency rank, then object key.
    pub findings: Vec<Finding>,
    pub validated_at: DateTime<Utc>,
    pub options: ValidateOptions,
    pub dialect: Dialect,
    pub contract_version: String,
    pub contract_hash: String,
    /// Contract objects in scope for the run.
    pub objects_checked: usize,
}

impl ValidationResult {
    pub fn new(
        mut findings: Vec<Finding>,
        options: ValidateOptions,
        dialect: Dialect,
        contract_version: impl Into<String>,
        contract_hash: impl Into<String>,
        objects_checked: usize,
    ) -> Self {
        // Stable: findings for one object keep the order they were produced in.
        findings.sort_by(|a, b| a.key.cmp(&b.key));
        let passed = !findings.iter().any(Finding::is_blocking);
        Self {
            run_id: Uuid::new_v4(),
            passed,
            findings,
            validated_at: Utc::now(),
            options,
            dialect,
            contract_version: contract_version.into(),
            contract_hash: contract_hash.into(),
            objects_checked,
        }
    }

    pub fn blocking(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_blocking())
    }

    pub fn advisory(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Advisory)
    }

    pub fn blocking_count(&self) -> usize {
        self.blocking().count()
    }

    pub fn advisory_count(&self) -> usize {
        self.advisory().count()
    }

    pub fn drift_counts(&self) -> DriftCounts {
        let mut counts = DriftCounts::default();
        for finding in &self.findings {
            counts.add(finding.drift);
        }
        counts
    }

    /// One-line summary for logs and the CLI.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} object(s) checked, {} blocking, {} advisory",
            if self.passed { "PASSED" } else { "FAILED" },
            self.objects_checked,
            self.blocking_count(),
            self.advisory_count()
        )
    }
}
