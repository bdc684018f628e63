//! Contract files.
//!
//! Contracts are stored as JSON or TOML, nested by schema and object kind:
//!
//! ```json
//! { "version": "2.0.0", "database": "CLAUDE_BI",
//!   "schemas": { "ACTIVITY": { "tables": { "EVENTS": { "columns": [] } } } } }
//! ```
//!
//! Unknown top-level sections are ignored so contracts shared with other
//! tools can carry their own settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::contract::{
    ObjectKey, ObjectSpec, RoutineSpec, SchemaContract, StageSpec, TableSpec, ViewSpec,
};

/// Errors from loading a contract file.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Failed to read contract {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON contract: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML contract: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid contract: {0}")]
    Invalid(String),
}

/// On-disk shape of a contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractFile {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaSection>,
}

/// Objects declared in one schema, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSection {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tables: BTreeMap<String, TableSpec>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub views: BTreeMap<String, ViewSpec>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub procedures: BTreeMap<String, RoutineSpec>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub functions: BTreeMap<String, RoutineSpec>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stages: BTreeMap<String, StageSpec>,
}

impl ContractFile {
    pub fn from_contract(contract: &SchemaContract) -> Self {
        let mut schemas: BTreeMap<String, SchemaSection> = BTreeMap::new();
        for (key, spec) in contract.objects() {
            let section = schemas.entry(key.schema.clone()).or_default();
            let name = key.name.clone();
            match spec {
                ObjectSpec::Table(t) => {
                    section.tables.insert(name, t.clone());
                }
                ObjectSpec::View(v) => {
                    section.views.insert(name, v.clone());
                }
                ObjectSpec::Procedure(r) => {
                    section.procedures.insert(name, r.clone());
                }
                ObjectSpec::Function(r) => {
                    section.functions.insert(name, r.clone());
                }
                ObjectSpec::Stage(s) => {
                    section.stages.insert(name, s.clone());
                }
            }
        }
        Self {
            version: contract.version.clone(),
            database: contract.database.clone(),
            schemas,
        }
    }

    /// Build and check the contract.
    ///
    /// Names that collide after case normalization (`events` and `EVENTS`)
    /// are rejected rather than silently merged.
    pub fn into_contract(self) -> Result<SchemaContract, ContractError> {
        if self.version.trim().is_empty() {
            return Err(ContractError::Invalid("version must be non-empty".to_string()));
        }

        let mut contract = SchemaContract::new(self.version);
        if let Some(db) = self.database.as_deref().filter(|db| !db.trim().is_empty()) {
            contract = contract.with_database(db);
        }

        for (schema, section) in self.schemas {
            let entries = section
                .tables
                .into_iter()
                .map(|(n, t)| (n, ObjectSpec::Table(t)))
                .chain(section.views.into_iter().map(|(n, v)| (n, ObjectSpec::View(v))))
                .chain(
                    section
                        .procedures
                        .into_iter()
                        .map(|(n, r)| (n, ObjectSpec::Procedure(r))),
                )
                .chain(
                    section
                        .functions
                        .into_iter()
                        .map(|(n, r)| (n, ObjectSpec::Function(r))),
                )
                .chain(section.stages.into_iter().map(|(n, s)| (n, ObjectSpec::Stage(s))));

            for (name, spec) in entries {
                let key = ObjectKey::new(&schema, &name, spec.kind());
                if contract.get(&key).is_some() {
                    return Err(ContractError::Invalid(format!(
                        "{} is declared more than once",
                        key
                    )));
                }
                contract.insert(key, spec);
            }
        }

        let issues = contract.issues();
        if !issues.is_empty() {
            let messages: Vec<String> = issues.iter().map(ToString::to_string).collect();
            return Err(ContractError::Invalid(messages.join("; ")));
        }

        Ok(contract)
    }
}

/// Parse a JSON contract.
pub fn from_json_str(input: &str) -> Result<SchemaContract, ContractError> {
    let file: ContractFile = serde_json::from_str(input)?;
    file.into_contract()
}

/// Parse a TOML contract.
pub fn from_toml_str(input: &str) -> Result<SchemaContract, ContractError> {
    let file: ContractFile = toml::from_str(input)?;
    file.into_contract()
}

/// Serialize a contract as pretty JSON.
pub fn to_json_pretty(contract: &SchemaContract) -> Result<String, ContractError> {
    Ok(serde_json::to_string_pretty(&ContractFile::from_contract(
        contract,
    ))?)
}

/// Load a contract file; the format follows the extension (`.json`, `.toml`).
pub fn load_contract(path: &Path) -> Result<SchemaContract, ContractError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ContractError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    let contract = match extension.as_deref() {
        Some("json") => from_json_str(&raw)?,
        Some("toml") => from_toml_str(&raw)?,
        other => {
            return Err(ContractError::Invalid(format!(
                "unsupported contract file extension {:?} (expected .json or .toml)",
                other.unwrap_or("")
            )))
        }
    };

    debug!(
        "Loaded contract {} (version {}, {} objects)",
        path.display(),
        contract.version,
        contract.len()
    );
    Ok(contract)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ObjectKind;
    use crate::types::DataType;

    const SAMPLE_JSON: &str = r#"{
        "version": "2.0.0",
        "database": "CLAUDE_BI",
        "schemas": {
            "ACTIVITY": {
                "tables": {
                    "EVENTS": {
                        "columns": [
                            {"name": "EVENT_ID", "type": "VARCHAR(255)", "nullable": false, "primary_key": true},
                            {"name": "ATTRIBUTES", "type": "VARIANT"}
                        ]
                    }
                }
            },
            "ACTIVITY_CCODE": {
                "tables": {"ARTIFACTS": {}},
                "views": {"VW_ACTIVITY_SUMMARY": {}}
            }
        },
        "security": {"max_rows_per_query": 10000}
    }"#;

    #[test]
    fn test_json_contract_loads() {
        let contract = from_json_str(SAMPLE_JSON).unwrap();
        assert_eq!(contract.version, "2.0.0");
        assert_eq!(contract.database.as_deref(), Some("CLAUDE_BI"));
        assert_eq!(contract.len(), 3);

        let events = contract.get(&ObjectKey::table("ACTIVITY", "EVENTS")).unwrap();
        let ObjectSpec::Table(table) = events else {
            panic!("expected table spec");
        };
        assert_eq!(table.columns[0].data_type, DataType::String);
        assert!(!table.columns[0].nullable);
        assert!(table.columns[1].nullable, "nullable defaults to true");
    }

    #[test]
    fn test_toml_contract_loads() {
        let toml = r#"
            version = "1.0.0"

            [schemas.mcp.stages.dash_apps]

            [schemas.mcp.procedures.log_claude_event]
            params = [{ name = "EVENT_PAYLOAD", type = "VARIANT" }]
            returns = "VARIANT"
        "#;
        let contract = from_toml_str(toml).unwrap();
        assert_eq!(contract.len(), 2);
        let key = ObjectKey::new("MCP", "LOG_CLAUDE_EVENT", ObjectKind::Procedure);
        let routine = contract.get(&key).and_then(ObjectSpec::as_routine).unwrap();
        assert_eq!(routine.signature(), vec![DataType::Variant]);
    }

    #[test]
    fn test_case_collisions_are_rejected() {
        let json = r#"{"version": "1", "schemas": {"A": {"tables": {"t": {}, "T": {}}}}}"#;
        let err = from_json_str(json).unwrap_err();
        assert!(matches!(err, ContractError::Invalid(_)));
    }

    #[test]
    fn test_empty_version_is_rejected() {
        let err = from_json_str(r#"{"version": " "}"#).unwrap_err();
        assert!(matches!(err, ContractError::Invalid(_)));
    }

    #[test]
    fn test_bad_type_is_a_parse_error() {
        let json = r#"{"version": "1", "schemas": {"A": {"tables": {"T": {"columns": [{"name": "X", "type": ""}]}}}}}"#;
        assert!(matches!(from_json_str(json), Err(ContractError::Json(_))));
    }

    #[test]
    fn test_json_round_trip_preserves_contract() {
        let contract = from_json_str(SAMPLE_JSON).unwrap();
        let rendered = to_json_pretty(&contract).unwrap();
        assert_eq!(from_json_str(&rendered).unwrap(), contract);
    }
}
