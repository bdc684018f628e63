//! Live catalog snapshots.
//!
//! A snapshot is what the catalog reported for one run. It is rebuilt on
//! every validation and never cached.

use std::collections::BTreeMap;

use sentinel_contract::{DataType, ObjectKey, ObjectKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    /// Column name as reported by the catalog.
    pub name: String,
    pub data_type: DataType,
    /// Type spelling as reported by the catalog, kept for findings.
    pub raw_type: String,
    pub nullable: bool,
}

impl LiveColumn {
    pub fn new(name: impl Into<String>, raw_type: impl Into<String>, nullable: bool) -> Self {
        let raw_type = raw_type.into();
        Self {
            name: name.into(),
            data_type: DataType::parse(&raw_type),
            raw_type,
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveObject {
    Table {
        /// Ordinal order.
        columns: Vec<LiveColumn>,
    },
    View {
        columns: Vec<String>,
        /// `None` when the catalog hides the text (secure views, missing privileges).
        definition: Option<String>,
    },
    /// Procedure or function; one entry per overload.
    Routine { overloads: Vec<Vec<DataType>> },
    Stage,
}

/// Objects found in the live catalog, keyed like the contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSnapshot {
    objects: BTreeMap<ObjectKey, LiveObject>,
}

impl LiveSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_table(&mut self, schema: &str, name: &str, columns: Vec<LiveColumn>) {
        self.objects
            .insert(ObjectKey::table(schema, name), LiveObject::Table { columns });
    }

    pub fn insert_view(
        &mut self,
        schema: &str,
        name: &str,
        columns: Vec<String>,
        definition: Option<String>,
    ) {
        self.objects.insert(
            ObjectKey::view(schema, name),
            LiveObject::View {
                columns,
                definition,
            },
        );
    }

    /// Record one overload of a procedure or function.
    pub fn add_routine_overload(
        &mut self,
        schema: &str,
        name: &str,
        kind: ObjectKind,
        signature: Vec<DataType>,
    ) {
        let entry = self
            .objects
            .entry(ObjectKey::new(schema, name, kind))
            .or_insert_with(|| LiveObject::Routine {
                overloads: Vec::new(),
            });
        if let LiveObject::Routine { overloads } = entry {
            overloads.push(signature);
        }
    }

    pub fn insert_stage(&mut self, schema: &str, name: &str) {
        self.objects.insert(
            ObjectKey::new(schema, name, ObjectKind::Stage),
            LiveObject::Stage,
        );
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&LiveObject> {
        self.objects.get(key)
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    pub fn objects(&self) -> impl Iterator<Item = (&ObjectKey, &LiveObject)> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drop every object of `kind`.
    pub fn remove_kind(&mut self, kind: ObjectKind) {
        self.objects.retain(|k, _| k.kind != kind);
    }
}
