//! Catalog introspection.
//!
//! Reads the live catalog into a [`LiveSnapshot`]. Queries run one after
//! another on the caller's session; the first failure aborts the read.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use sentinel_contract::{normalize_ident, parse_argument_signature, ObjectKind};
use sentinel_db::{BackendError, DbRow, DbValue, Session};

use crate::dialect::{CatalogQuery, Dialect};
use crate::error::ValidationError;
use crate::snapshot::{LiveColumn, LiveSnapshot};

/// What to read: which schemas, which kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogScope {
    pub database: Option<String>,
    /// Upper-cased schema names.
    pub schemas: BTreeSet<String>,
    pub kinds: BTreeSet<ObjectKind>,
}

impl CatalogScope {
    pub fn includes(&self, kind: ObjectKind) -> bool {
        self.kinds.contains(&kind)
    }
}

pub struct CatalogReader<'a> {
    session: &'a dyn Session,
    dialect: Dialect,
}

type ColumnsByObject = BTreeMap<(String, String), Vec<LiveColumn>>;

impl<'a> CatalogReader<'a> {
    pub fn new(session: &'a dyn Session, dialect: Dialect) -> Self {
        Self { session, dialect }
    }

    /// Build a snapshot of every object in `scope`.
    pub fn read(&self, scope: &CatalogScope) -> Result<LiveSnapshot, ValidationError> {
        self.session
            .query_all("SELECT 1", &[])
            .map_err(ValidationError::Connection)?;

        let mut snapshot = LiveSnapshot::new();
        if scope.schemas.is_empty() {
            return Ok(snapshot);
        }

        let params: Vec<DbValue> = scope
            .schemas
            .iter()
            .map(|s| DbValue::from(s.as_str()))
            .collect();

        let mut columns = if scope.includes(ObjectKind::Table) || scope.includes(ObjectKind::View)
        {
            self.read_columns(scope, &params)?
        } else {
            ColumnsByObject::new()
        };

        if scope.includes(ObjectKind::Table) {
            for row in self.run(CatalogQuery::Tables, scope, &params)? {
                let (schema, name) = object_name(&row, ObjectKind::Table)?;
                let cols = columns
                    .remove(&(schema.clone(), name.clone()))
                    .unwrap_or_default();
                snapshot.insert_table(&schema, &name, cols);
            }
        }

        if scope.includes(ObjectKind::View) {
            for row in self.run(CatalogQuery::Views, scope, &params)? {
                let (schema, name) = object_name(&row, ObjectKind::View)?;
                let definition: Option<String> = row
                    .get_by_name("view_definition")
                    .map_err(introspection(ObjectKind::View))?;
                let cols = columns
                    .remove(&(schema.clone(), name.clone()))
                    .unwrap_or_default()
                    .into_iter()
                    .map(|c| c.name)
                    .collect();
                snapshot.insert_view(
                    &schema,
                    &name,
                    cols,
                    definition.filter(|d| !d.trim().is_empty()),
                );
            }
        }

        for (query, kind) in [
            (CatalogQuery::Procedures, ObjectKind::Procedure),
            (CatalogQuery::Functions, ObjectKind::Function),
        ] {
            if !scope.includes(kind) {
                continue;
            }
            for row in self.run(query, scope, &params)? {
                let (schema, name) = object_name(&row, kind)?;
                let signature: Option<String> = row
                    .get_by_name("argument_signature")
                    .map_err(introspection(kind))?;
                snapshot.add_routine_overload(
                    &schema,
                    &name,
                    kind,
                    parse_argument_signature(signature.as_deref().unwrap_or("()")),
                );
            }
        }

        if scope.includes(ObjectKind::Stage) {
            for row in self.run(CatalogQuery::Stages, scope, &params)? {
                let (schema, name) = object_name(&row, ObjectKind::Stage)?;
                snapshot.insert_stage(&schema, &name);
            }
        }

        debug!(
            "Catalog snapshot: {} object(s) in {} schema(s)",
            snapshot.len(),
            scope.schemas.len()
        );
        Ok(snapshot)
    }

    fn read_columns(
        &self,
        scope: &CatalogScope,
        params: &[DbValue],
    ) -> Result<ColumnsByObject, ValidationError> {
        let mut columns = ColumnsByObject::new();
        for row in self.run(CatalogQuery::Columns, scope, params)? {
            let (schema, name) = object_name(&row, ObjectKind::Table)?;
            let column = (|| -> Result<LiveColumn, BackendError> {
                let column_name: String = row.get_by_name("column_name")?;
                let data_type: String = row.get_by_name("data_type")?;
                let nullable: bool = row.get_by_name("is_nullable")?;
                Ok(LiveColumn::new(column_name, data_type, nullable))
            })()
            .map_err(introspection(ObjectKind::Table))?;
            columns.entry((schema, name)).or_default().push(column);
        }
        Ok(columns)
    }

    fn run(
        &self,
        query: CatalogQuery,
        scope: &CatalogScope,
        params: &[DbValue],
    ) -> Result<Vec<DbRow>, ValidationError> {
        let kind = query.kind();
        let sql = self
            .dialect
            .catalog_sql(query, scope.database.as_deref(), params.len())
            .ok_or(ValidationError::UnsupportedKind {
                kind,
                dialect: self.dialect,
            })?;
        let rows = self
            .session
            .query_all(&sql, params)
            .map_err(introspection(kind))?;
        debug!("Catalog query {:?} returned {} row(s)", query, rows.len());
        Ok(rows)
    }
}

fn introspection(kind: ObjectKind) -> impl Fn(BackendError) -> ValidationError {
    move |source| ValidationError::Introspection { kind, source }
}

fn object_name(row: &DbRow, kind: ObjectKind) -> Result<(String, String), ValidationError> {
    let schema: String = row
        .get_by_name("object_schema")
        .map_err(introspection(kind))?;
    let name: String = row
        .get_by_name("object_name")
        .map_err(introspection(kind))?;
    Ok((normalize_ident(&schema), normalize_ident(&name)))
}
