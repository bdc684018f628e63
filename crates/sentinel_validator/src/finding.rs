//! Drift findings.

use serde::{Deserialize, Serialize};
use std::fmt;

use sentinel_contract::ObjectKey;

/// Classification of one difference between contract and catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftKind {
    Missing,
    Extra,
    TypeMismatch,
    NullabilityMismatch,
    ColumnOrderMismatch,
    SignatureMismatch,
    /// View fingerprint differs from the contract's.
    DefinitionMismatch,
}

impl DriftKind {
    pub const ALL: [DriftKind; 7] = [
        DriftKind::Missing,
        DriftKind::Extra,
        DriftKind::TypeMismatch,
        DriftKind::NullabilityMismatch,
        DriftKind::ColumnOrderMismatch,
        DriftKind::SignatureMismatch,
        DriftKind::DefinitionMismatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DriftKind::Missing => "MISSING",
            DriftKind::Extra => "EXTRA",
            DriftKind::TypeMismatch => "TYPE_MISMATCH",
            DriftKind::NullabilityMismatch => "NULLABILITY_MISMATCH",
            DriftKind::ColumnOrderMismatch => "COLUMN_ORDER_MISMATCH",
            DriftKind::SignatureMismatch => "SIGNATURE_MISMATCH",
            DriftKind::DefinitionMismatch => "DEFINITION_MISMATCH",
        }
    }
}

impl fmt::Display for DriftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Fails validation.
    Blocking,
    /// Reported only.
    Advisory,
}

impl Severity {
    /// Advisory unless strict mode escalates it.
    pub fn advisory_unless(strict: bool) -> Self {
        if strict {
            Severity::Blocking
        } else {
            Severity::Advisory
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Blocking => write!(f, "BLOCKING"),
            Severity::Advisory => write!(f, "ADVISORY"),
        }
    }
}

/// One unit of drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub key: ObjectKey,
    /// Column (or view output column) the finding is about; `None` for the
    /// object itself.
    pub column: Option<String>,
    pub drift: DriftKind,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub severity: Severity,
}

impl Finding {
    pub fn object(key: &ObjectKey, drift: DriftKind, severity: Severity) -> Self {
        Self {
            key: key.clone(),
            column: None,
            drift,
            expected: None,
            actual: None,
            severity,
        }
    }

    pub fn column(key: &ObjectKey, column: &str, drift: DriftKind, severity: Severity) -> Self {
        Self {
            column: Some(column.to_string()),
            ..Self::object(key, drift, severity)
        }
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }

    /// `SCHEMA.NAME` or `SCHEMA.NAME.COLUMN`.
    pub fn target(&self) -> String {
        match &self.column {
            Some(column) => format!("{}.{}", self.key.qualified_name(), column),
            None => self.key.qualified_name(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {}",
            self.severity,
            self.drift,
            self.key.kind,
            self.target()
        )?;
        match (&self.expected, &self.actual) {
            (Some(e), Some(a)) => write!(f, ": expected {}, found {}", e, a),
            (Some(e), None) => write!(f, ": expected {}", e),
            (None, Some(a)) => write!(f, ": found {}", a),
            (None, None) => Ok(()),
        }
    }
}
