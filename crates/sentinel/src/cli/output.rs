//! Output formatting for validation reports
//!
//! Human output is a findings table plus a summary line on stdout; `--json`
//! replaces both with one JSON document.

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use std::path::Path;

use sentinel_contract::ObjectKind;
use sentinel_validator::{Finding, Severity, ValidationResult};

/// JSON document printed by `--json`.
#[derive(Debug, Serialize)]
pub struct ValidateOutput<'a> {
    pub result: &'a ValidationResult,
    /// Kinds removed from the contract because the dialect cannot read them.
    pub excluded_kinds: &'a [ObjectKind],
    pub fix_path: Option<String>,
}

/// Build a table with the standard preset and a cyan header.
pub fn build_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);
    table
}

pub fn findings_table(findings: &[Finding]) -> Table {
    let mut table = build_table(&["SEVERITY", "DRIFT", "KIND", "TARGET", "EXPECTED", "ACTUAL"]);
    for finding in findings {
        let severity_color = match finding.severity {
            Severity::Blocking => Color::Red,
            Severity::Advisory => Color::Yellow,
        };
        table.add_row(vec![
            Cell::new(finding.severity).fg(severity_color),
            Cell::new(finding.drift),
            Cell::new(finding.key.kind),
            Cell::new(finding.target()),
            Cell::new(finding.expected.as_deref().unwrap_or("-")),
            Cell::new(finding.actual.as_deref().unwrap_or("-")),
        ]);
    }
    table
}

pub fn print_report(result: &ValidationResult) {
    if !result.findings.is_empty() {
        println!("{}", findings_table(&result.findings));
    }
    println!("{}", result.summary());
}

pub fn print_fix_written(path: &Path, statements: usize, advisories: usize) {
    println!(
        "Wrote fix script: {} ({} statement{}, {} advisory note{})",
        path.display(),
        statements,
        if statements == 1 { "" } else { "s" },
        advisories,
        if advisories == 1 { "" } else { "s" },
    );
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
