//! View definition fingerprints.
//!
//! A fingerprint is a SHA-256 hex digest of a view's defining query. The
//! catalog and the contract rarely spell a definition identically, so the
//! default fingerprinter hashes a normalized form of the query body.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// Computes a comparable fingerprint for a view definition.
pub trait ViewFingerprinter: Send + Sync {
    fn fingerprint(&self, definition: &str) -> String;

    /// Short name for logs and audit records.
    fn name(&self) -> &'static str;
}

/// Hashes the query body with DDL prefix, trailing semicolon, case and
/// whitespace differences removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedFingerprint;

/// Hashes the trimmed definition exactly as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactFingerprint;

impl ViewFingerprinter for NormalizedFingerprint {
    fn fingerprint(&self, definition: &str) -> String {
        sha256_hex(&normalize_definition(definition))
    }

    fn name(&self) -> &'static str {
        "normalized"
    }
}

impl ViewFingerprinter for ExactFingerprint {
    fn fingerprint(&self, definition: &str) -> String {
        sha256_hex(definition.trim())
    }

    fn name(&self) -> &'static str {
        "exact"
    }
}

fn create_view_prefix() -> Option<&'static Regex> {
    static PREFIX: OnceLock<Option<Regex>> = OnceLock::new();
    PREFIX
        .get_or_init(|| {
            // CREATE [OR REPLACE] [SECURE|TEMP] [RECURSIVE] VIEW [IF NOT EXISTS] name [(cols)] [COMMENT='..'] AS
            Regex::new(
                r#"(?is)^\s*create\s+(or\s+replace\s+)?((secure|temp|temporary|local)\s+)*(recursive\s+)?view\s+(if\s+not\s+exists\s+)?("[^"]*"|[^\s(]+)\s*(\([^)]*\))?\s*(comment\s*=\s*'[^']*'\s*)?as\s+"#,
            )
            .ok()
        })
        .as_ref()
}

/// Reduce a view definition to its comparable query body.
pub fn normalize_definition(definition: &str) -> String {
    let body = match create_view_prefix() {
        Some(prefix) => prefix.replace(definition, ""),
        None => definition.into(),
    };
    let body = body.trim().trim_end_matches(';').trim();
    body.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
