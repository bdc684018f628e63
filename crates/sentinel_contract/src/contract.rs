//! Schema Contract Types
//!
//! A contract is the declared, expected structure of a live database: a map
//! from `(schema, object name, kind)` to a kind-specific spec. Contracts are
//! built once (from a file or in code) and never mutated while validating.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::fingerprint::ViewFingerprinter;
use crate::storage::ContractError;
use crate::types::DataType;

/// The closed set of database object kinds a contract can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    Table,
    View,
    Procedure,
    Function,
    Stage,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 5] = [
        ObjectKind::Table,
        ObjectKind::View,
        ObjectKind::Procedure,
        ObjectKind::Function,
        ObjectKind::Stage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
            ObjectKind::Procedure => "PROCEDURE",
            ObjectKind::Function => "FUNCTION",
            ObjectKind::Stage => "STAGE",
        }
    }

    /// Creation order: objects with a lower rank never depend on objects
    /// with a higher one.
    pub fn dependency_rank(&self) -> u8 {
        match self {
            ObjectKind::Table => 0,
            ObjectKind::Stage => 1,
            ObjectKind::Function => 2,
            ObjectKind::View => 3,
            ObjectKind::Procedure => 4,
        }
    }

    pub fn is_routine(&self) -> bool {
        matches!(self, ObjectKind::Procedure | ObjectKind::Function)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a database object.
///
/// Schema and object names are stored upper-cased: unquoted identifiers are
/// case-insensitive in the target warehouse, so `activity.events` and
/// `ACTIVITY.EVENTS` name the same object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub schema: String,
    pub name: String,
    pub kind: ObjectKind,
}

impl ObjectKey {
    pub fn new(schema: impl AsRef<str>, name: impl AsRef<str>, kind: ObjectKind) -> Self {
        Self {
            schema: normalize_ident(schema.as_ref()),
            name: normalize_ident(name.as_ref()),
            kind,
        }
    }

    pub fn table(schema: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        Self::new(schema, name, ObjectKind::Table)
    }

    pub fn view(schema: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        Self::new(schema, name, ObjectKind::View)
    }

    /// `SCHEMA.NAME`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}", self.kind, self.schema, self.name)
    }
}

// Findings and snapshots sort by dependency rank first so remediation order
// falls out of iteration order.
impl Ord for ObjectKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.kind.dependency_rank(), &self.schema, &self.name, self.kind).cmp(&(
            other.kind.dependency_rank(),
            &other.schema,
            &other.name,
            other.kind,
        ))
    }
}

impl PartialOrd for ObjectKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Upper-case an identifier for comparison.
pub fn normalize_ident(ident: &str) -> String {
    ident.trim().trim_matches('"').to_ascii_uppercase()
}

/// A declared table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub data_type: DataType,

    #[serde(default = "default_nullable")]
    pub nullable: bool,

    #[serde(default)]
    pub primary_key: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnSpec {
    /// Create a new required (NOT NULL) column
    pub fn required(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            primary_key: false,
        }
    }

    /// Create a new nullable column
    pub fn optional(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            primary_key: false,
        }
    }

    /// Mark as primary key (implies NOT NULL)
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Columns in declared order. An empty list checks existence only.
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSpec {
    /// Expected output columns, order-sensitive. Empty checks existence only.
    #[serde(default)]
    pub columns: Vec<String>,

    /// Defining query (`SELECT ...`), used to recreate the view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,

    /// Pinned fingerprint; overrides the fingerprint of `definition`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl ViewSpec {
    pub fn new(columns: Vec<impl Into<String>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            definition: None,
            fingerprint: None,
        }
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    /// The fingerprint the live definition must match, if any is declared.
    pub fn expected_fingerprint(&self, fingerprinter: &dyn ViewFingerprinter) -> Option<String> {
        self.fingerprint
            .clone()
            .or_else(|| self.definition.as_deref().map(|d| fingerprinter.fingerprint(d)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A stored procedure or user-defined function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineSpec {
    #[serde(default)]
    pub params: Vec<ParamSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Routine body, used to recreate the routine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RoutineSpec {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn returns(mut self, returns: impl Into<String>) -> Self {
        self.returns = Some(returns.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Ordered parameter types; overload resolution depends only on these.
    pub fn signature(&self) -> Vec<DataType> {
        self.params.iter().map(|p| p.data_type.clone()).collect()
    }
}

/// Render a signature as `(VARCHAR, VARIANT)`.
pub fn format_signature(signature: &[DataType]) -> String {
    let parts: Vec<&str> = signature.iter().map(|t| t.canonical_name()).collect();
    format!("({})", parts.join(", "))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    /// External location; absent for internal stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Kind-specific expectation for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectSpec {
    Table(TableSpec),
    View(ViewSpec),
    Procedure(RoutineSpec),
    Function(RoutineSpec),
    Stage(StageSpec),
}

impl ObjectSpec {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectSpec::Table(_) => ObjectKind::Table,
            ObjectSpec::View(_) => ObjectKind::View,
            ObjectSpec::Procedure(_) => ObjectKind::Procedure,
            ObjectSpec::Function(_) => ObjectKind::Function,
            ObjectSpec::Stage(_) => ObjectKind::Stage,
        }
    }

    pub fn as_routine(&self) -> Option<&RoutineSpec> {
        match self {
            ObjectSpec::Procedure(r) | ObjectSpec::Function(r) => Some(r),
            _ => None,
        }
    }
}

/// Problems found in a contract definition itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractIssue {
    pub key: ObjectKey,
    pub message: String,
}

impl fmt::Display for ContractIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// The expected structure of a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaContract {
    /// Contract version (free-form, e.g. "2.0.0")
    pub version: String,

    /// Database the contract describes, when the catalog is database-scoped
    pub database: Option<String>,

    objects: BTreeMap<ObjectKey, ObjectSpec>,
}

impl SchemaContract {
    /// Create an empty contract.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            database: None,
            objects: BTreeMap::new(),
        }
    }

    pub fn with_database(mut self, database: impl AsRef<str>) -> Self {
        self.database = Some(normalize_ident(database.as_ref()));
        self
    }

    /// Add an object; the kind is taken from the `ObjectSpec`. A later object with
    /// the same key replaces the earlier one.
    pub fn with_object(mut self, schema: &str, name: &str, spec: ObjectSpec) -> Self {
        self.insert(ObjectKey::new(schema, name, spec.kind()), spec);
        self
    }

    pub fn with_table(self, schema: &str, name: &str, columns: Vec<ColumnSpec>) -> Self {
        self.with_object(schema, name, ObjectSpec::Table(TableSpec::new(columns)))
    }

    pub fn with_view(self, schema: &str, name: &str, view: ViewSpec) -> Self {
        self.with_object(schema, name, ObjectSpec::View(view))
    }

    pub fn with_procedure(self, schema: &str, name: &str, routine: RoutineSpec) -> Self {
        self.with_object(schema, name, ObjectSpec::Procedure(routine))
    }

    pub fn with_function(self, schema: &str, name: &str, routine: RoutineSpec) -> Self {
        self.with_object(schema, name, ObjectSpec::Function(routine))
    }

    pub fn with_stage(self, schema: &str, name: &str, stage: StageSpec) -> Self {
        self.with_object(schema, name, ObjectSpec::Stage(stage))
    }

    pub(crate) fn insert(&mut self, key: ObjectKey, spec: ObjectSpec) {
        self.objects.insert(key, spec);
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&ObjectSpec> {
        self.objects.get(key)
    }

    /// Objects in dependency order.
    pub fn objects(&self) -> impl Iterator<Item = (&ObjectKey, &ObjectSpec)> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Schemas the contract covers. Extra-object detection is confined to these.
    pub fn declared_schemas(&self) -> BTreeSet<String> {
        self.schemas_declaring(|_| true)
    }

    /// Schemas holding at least one object whose kind passes `include`.
    pub fn schemas_declaring(&self, include: impl Fn(ObjectKind) -> bool) -> BTreeSet<String> {
        self.objects
            .keys()
            .filter(|k| include(k.kind))
            .map(|k| k.schema.clone())
            .collect()
    }

    /// Object kinds the contract declares.
    pub fn kinds(&self) -> BTreeSet<ObjectKind> {
        self.objects.keys().map(|k| k.kind).collect()
    }

    /// A copy without objects of `kind`.
    pub fn without_kind(&self, kind: ObjectKind) -> SchemaContract {
        SchemaContract {
            version: self.version.clone(),
            database: self.database.clone(),
            objects: self
                .objects
                .iter()
                .filter(|(k, _)| k.kind != kind)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// SHA-256 of the canonical JSON form; identifies the contract in audit
    /// records and remediation headers.
    pub fn content_hash(&self) -> Result<String, ContractError> {
        let canonical = crate::storage::ContractFile::from_contract(self);
        let bytes = serde_json::to_vec(&canonical)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Structural problems: empty names, duplicate column or parameter names.
    pub fn issues(&self) -> Vec<ContractIssue> {
        let mut issues = Vec::new();
        for (key, spec) in &self.objects {
            if key.schema.is_empty() || key.name.is_empty() {
                issues.push(ContractIssue {
                    key: key.clone(),
                    message: "schema and object names must be non-empty".to_string(),
                });
            }
            let names: Vec<&str> = match spec {
                ObjectSpec::Table(t) => t.columns.iter().map(|c| c.name.as_str()).collect(),
                ObjectSpec::View(v) => v.columns.iter().map(String::as_str).collect(),
                ObjectSpec::Procedure(r) | ObjectSpec::Function(r) => {
                    r.params.iter().map(|p| p.name.as_str()).collect()
                }
                ObjectSpec::Stage(_) => Vec::new(),
            };
            let mut seen = BTreeSet::new();
            for name in names {
                let normalized = normalize_ident(name);
                if normalized.is_empty() {
                    issues.push(ContractIssue {
                        key: key.clone(),
                        message: "empty column or parameter name".to_string(),
                    });
                } else if !seen.insert(normalized.clone()) {
                    issues.push(ContractIssue {
                        key: key.clone(),
                        message: format!("duplicate name '{}'", normalized),
                    });
                }
            }
        }
        issues
    }
}
