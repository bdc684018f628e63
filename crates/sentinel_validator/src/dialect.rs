//! SQL dialects.
//!
//! A dialect knows where its catalog lives, how to quote identifiers and how
//! to render the DDL a remediation script needs. The set is closed: every
//! dialect-specific decision is a `match` here rather than a trait object
//! somewhere else.

use serde::{Deserialize, Serialize};
use std::fmt;

use sentinel_contract::{
    ColumnSpec, DataType, ObjectKey, ObjectKind, RoutineSpec, StageSpec, TableSpec,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Snowflake,
    DuckDb,
}

/// Catalog queries issued while building a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogQuery {
    Tables,
    Columns,
    Views,
    Procedures,
    Functions,
    Stages,
}

impl CatalogQuery {
    /// The object kind a failure of this query is reported against.
    pub fn kind(&self) -> ObjectKind {
        match self {
            CatalogQuery::Tables | CatalogQuery::Columns => ObjectKind::Table,
            CatalogQuery::Views => ObjectKind::View,
            CatalogQuery::Procedures => ObjectKind::Procedure,
            CatalogQuery::Functions => ObjectKind::Function,
            CatalogQuery::Stages => ObjectKind::Stage,
        }
    }
}

// Words that cannot appear unquoted as a column or object name in either
// dialect. Not exhaustive; names outside the plain pattern are quoted anyway.
const RESERVED: &[&str] = &[
    "ALL", "ALTER", "AND", "AS", "BETWEEN", "BY", "CASE", "CAST", "CHECK", "COLUMN", "CONSTRAINT",
    "CREATE", "CROSS", "CURRENT", "DEFAULT", "DELETE", "DISTINCT", "DROP", "ELSE", "END",
    "EXISTS", "FALSE", "FOR", "FROM", "FULL", "GRANT", "GROUP", "HAVING", "IN", "INNER", "INSERT",
    "INTERSECT", "INTO", "IS", "JOIN", "LEFT", "LIKE", "LIMIT", "NATURAL", "NOT", "NULL", "OF",
    "ON", "OR", "ORDER", "PRIMARY", "REFERENCES", "RIGHT", "SELECT", "SET", "TABLE", "THEN", "TO",
    "TRUE", "UNION", "UNIQUE", "UPDATE", "USER", "USING", "VALUES", "VIEW", "WHEN", "WHERE",
    "WITH",
];

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Snowflake => "Snowflake",
            Dialect::DuckDb => "DuckDB",
        }
    }

    /// Whether the product has a catalog (and DDL) for objects of `kind`.
    pub fn supports(&self, kind: ObjectKind) -> bool {
        match self {
            Dialect::Snowflake => true,
            Dialect::DuckDb => matches!(kind, ObjectKind::Table | ObjectKind::View),
        }
    }

    /// Kinds this dialect can introspect, in dependency order.
    pub fn supported_kinds(&self) -> Vec<ObjectKind> {
        let mut kinds: Vec<ObjectKind> = ObjectKind::ALL
            .into_iter()
            .filter(|k| self.supports(*k))
            .collect();
        kinds.sort_by_key(|k| k.dependency_rank());
        kinds
    }

    /// Quote an identifier when it is not a plain, unreserved name.
    pub fn quote_ident(&self, ident: &str) -> String {
        let plain = ident
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !RESERVED.contains(&ident.to_ascii_uppercase().as_str());
        if plain {
            ident.to_string()
        } else {
            format!("\"{}\"", ident.replace('"', "\"\""))
        }
    }

    /// `SCHEMA.NAME`, quoted as needed.
    pub fn qualified(&self, key: &ObjectKey) -> String {
        format!(
            "{}.{}",
            self.quote_ident(&key.schema),
            self.quote_ident(&key.name)
        )
    }

    /// Native spelling of a canonical type.
    ///
    /// DuckDB spellings are chosen so that the catalog reports them back as
    /// the same canonical type.
    pub fn render_type(&self, data_type: &DataType) -> String {
        match self {
            Dialect::Snowflake => data_type.canonical_name().to_string(),
            Dialect::DuckDb => match data_type {
                DataType::String => "VARCHAR".to_string(),
                DataType::Number => "BIGINT".to_string(),
                DataType::Float => "DOUBLE".to_string(),
                DataType::Boolean => "BOOLEAN".to_string(),
                DataType::Date => "DATE".to_string(),
                DataType::Time => "TIME".to_string(),
                DataType::Timestamp => "TIMESTAMP".to_string(),
                // No session-local variant; TIMESTAMP_LTZ degrades to TIMESTAMPTZ.
                DataType::TimestampTz | DataType::TimestampLtz => "TIMESTAMPTZ".to_string(),
                DataType::Variant => "JSON".to_string(),
                DataType::Object => "MAP(VARCHAR, JSON)".to_string(),
                DataType::Array => "JSON[]".to_string(),
                DataType::Binary => "BLOB".to_string(),
                DataType::Other(name) => name.clone(),
            },
        }
    }

    /// Cast of a text parameter to the dialect's semi-structured type.
    pub fn json_param(&self) -> &'static str {
        match self {
            Dialect::Snowflake => "PARSE_JSON(?)",
            Dialect::DuckDb => "?::JSON",
        }
    }

    /// Catalog query for `query`, restricted to `schema_count` schemas bound
    /// as upper-cased text parameters. `None` when the product has no such
    /// catalog.
    pub fn catalog_sql(
        &self,
        query: CatalogQuery,
        database: Option<&str>,
        schema_count: usize,
    ) -> Option<String> {
        let placeholders = vec!["?"; schema_count].join(", ");
        match self {
            Dialect::Snowflake => {
                let info = match database {
                    Some(db) => format!("{}.INFORMATION_SCHEMA", self.quote_ident(db)),
                    None => "INFORMATION_SCHEMA".to_string(),
                };
                let sql = match query {
                    CatalogQuery::Tables => format!(
                        "SELECT TABLE_SCHEMA AS OBJECT_SCHEMA, TABLE_NAME AS OBJECT_NAME \
                         FROM {info}.TABLES \
                         WHERE TABLE_TYPE = 'BASE TABLE' AND UPPER(TABLE_SCHEMA) IN ({placeholders}) \
                         ORDER BY 1, 2"
                    ),
                    CatalogQuery::Columns => format!(
                        "SELECT TABLE_SCHEMA AS OBJECT_SCHEMA, TABLE_NAME AS OBJECT_NAME, \
                         COLUMN_NAME, DATA_TYPE, IS_NULLABLE \
                         FROM {info}.COLUMNS \
                         WHERE UPPER(TABLE_SCHEMA) IN ({placeholders}) \
                         ORDER BY TABLE_SCHEMA, TABLE_NAME, ORDINAL_POSITION"
                    ),
                    CatalogQuery::Views => format!(
                        "SELECT TABLE_SCHEMA AS OBJECT_SCHEMA, TABLE_NAME AS OBJECT_NAME, \
                         VIEW_DEFINITION \
                         FROM {info}.VIEWS \
                         WHERE UPPER(TABLE_SCHEMA) IN ({placeholders}) \
                         ORDER BY 1, 2"
                    ),
                    CatalogQuery::Procedures => format!(
                        "SELECT PROCEDURE_SCHEMA AS OBJECT_SCHEMA, PROCEDURE_NAME AS OBJECT_NAME, \
                         ARGUMENT_SIGNATURE \
                         FROM {info}.PROCEDURES \
                         WHERE UPPER(PROCEDURE_SCHEMA) IN ({placeholders}) \
                         ORDER BY 1, 2, 3"
                    ),
                    CatalogQuery::Functions => format!(
                        "SELECT FUNCTION_SCHEMA AS OBJECT_SCHEMA, FUNCTION_NAME AS OBJECT_NAME, \
                         ARGUMENT_SIGNATURE \
                         FROM {info}.FUNCTIONS \
                         WHERE UPPER(FUNCTION_SCHEMA) IN ({placeholders}) \
                         ORDER BY 1, 2, 3"
                    ),
                    CatalogQuery::Stages => format!(
                        "SELECT STAGE_SCHEMA AS OBJECT_SCHEMA, STAGE_NAME AS OBJECT_NAME \
                         FROM {info}.STAGES \
                         WHERE UPPER(STAGE_SCHEMA) IN ({placeholders}) \
                         ORDER BY 1, 2"
                    ),
                };
                Some(sql)
            }
            Dialect::DuckDb => match query {
                CatalogQuery::Tables => Some(format!(
                    "SELECT table_schema AS object_schema, table_name AS object_name \
                     FROM information_schema.tables \
                     WHERE table_catalog = current_database() \
                       AND table_type = 'BASE TABLE' \
                       AND upper(table_schema) IN ({placeholders}) \
                     ORDER BY 1, 2"
                )),
                CatalogQuery::Columns => Some(format!(
                    "SELECT table_schema AS object_schema, table_name AS object_name, \
                     column_name, data_type, is_nullable \
                     FROM information_schema.columns \
                     WHERE table_catalog = current_database() \
                       AND upper(table_schema) IN ({placeholders}) \
                     ORDER BY table_schema, table_name, ordinal_position"
                )),
                CatalogQuery::Views => Some(format!(
                    "SELECT schema_name AS object_schema, view_name AS object_name, \
                     sql AS view_definition \
                     FROM duckdb_views() \
                     WHERE NOT internal \
                       AND database_name = current_database() \
                       AND upper(schema_name) IN ({placeholders}) \
                     ORDER BY 1, 2"
                )),
                CatalogQuery::Procedures | CatalogQuery::Functions | CatalogQuery::Stages => None,
            },
        }
    }

    pub fn create_schema(&self, schema: &str) -> String {
        format!("CREATE SCHEMA IF NOT EXISTS {}", self.quote_ident(schema))
    }

    pub fn create_table(&self, key: &ObjectKey, spec: &TableSpec) -> String {
        let mut lines: Vec<String> = spec
            .columns
            .iter()
            .map(|c| format!("    {}", self.column_definition(c)))
            .collect();
        let primary_key: Vec<String> = spec
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| self.quote_ident(&c.name))
            .collect();
        if !primary_key.is_empty() {
            lines.push(format!("    PRIMARY KEY ({})", primary_key.join(", ")));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            self.qualified(key),
            lines.join(",\n")
        )
    }

    fn column_definition(&self, column: &ColumnSpec) -> String {
        let mut def = format!(
            "{} {}",
            self.quote_ident(&column.name),
            self.render_type(&column.data_type)
        );
        if !column.nullable {
            def.push_str(" NOT NULL");
        }
        def
    }

    /// Adds the column as nullable; NOT NULL is applied separately so the
    /// statement succeeds on tables that already hold rows.
    pub fn add_column(&self, key: &ObjectKey, column: &ColumnSpec) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
            self.qualified(key),
            self.quote_ident(&column.name),
            self.render_type(&column.data_type)
        )
    }

    pub fn drop_column(&self, key: &ObjectKey, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.qualified(key),
            self.quote_ident(column)
        )
    }

    pub fn set_column_type(&self, key: &ObjectKey, column: &ColumnSpec) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {} SET DATA TYPE {}",
            self.qualified(key),
            self.quote_ident(&column.name),
            self.render_type(&column.data_type)
        )
    }

    pub fn set_nullability(&self, key: &ObjectKey, column: &str, nullable: bool) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {} {} NOT NULL",
            self.qualified(key),
            self.quote_ident(column),
            if nullable { "DROP" } else { "SET" }
        )
    }

    /// `CREATE OR REPLACE VIEW` from a defining query. A definition that is
    /// already a full `CREATE` statement is used as written.
    pub fn create_view(&self, key: &ObjectKey, definition: &str) -> String {
        let body = definition.trim().trim_end_matches(';').trim_end();
        if body
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("create"))
        {
            return body.to_string();
        }
        format!("CREATE OR REPLACE VIEW {} AS\n{}", self.qualified(key), body)
    }

    /// `CREATE OR REPLACE PROCEDURE|FUNCTION`; `None` when the dialect has
    /// no stored routines or the routine has no body.
    pub fn create_routine(&self, key: &ObjectKey, spec: &RoutineSpec) -> Option<String> {
        if !self.supports(key.kind) || !key.kind.is_routine() {
            return None;
        }
        let body = spec.body.as_deref()?.trim();
        let params: Vec<String> = spec
            .params
            .iter()
            .map(|p| format!("{} {}", self.quote_ident(&p.name), self.render_type(&p.data_type)))
            .collect();
        Some(format!(
            "CREATE OR REPLACE {} {}({})\nRETURNS {}\nLANGUAGE {}\nAS\n$$\n{}\n$$",
            key.kind,
            self.qualified(key),
            params.join(", "),
            spec.returns.as_deref().unwrap_or("VARIANT"),
            spec.language.as_deref().unwrap_or("SQL"),
            body
        ))
    }

    pub fn create_stage(&self, key: &ObjectKey, spec: &StageSpec) -> Option<String> {
        if !self.supports(ObjectKind::Stage) {
            return None;
        }
        let mut sql = format!("CREATE STAGE IF NOT EXISTS {}", self.qualified(key));
        if let Some(url) = &spec.url {
            sql.push_str(&format!(" URL = '{}'", url.replace('\'', "''")));
        }
        Some(sql)
    }

    /// `DROP <KIND> <name>`, only ever rendered as a commented suggestion.
    pub fn drop_object(&self, key: &ObjectKey) -> String {
        format!("DROP {} {}", key.kind, self.qualified(key))
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_contract::ParamSpec;

    #[test]
    fn test_quote_ident() {
        let d = Dialect::Snowflake;
        assert_eq!(d.quote_ident("EVENT_ID"), "EVENT_ID");
        assert_eq!(d.quote_ident("ORDER"), "\"ORDER\"");
        assert_eq!(d.quote_ident("My Col"), "\"My Col\"");
        assert_eq!(d.quote_ident("1ST"), "\"1ST\"");
        assert_eq!(d.quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_duckdb_type_spellings_fold_back() {
        let d = Dialect::DuckDb;
        for t in [
            DataType::String,
            DataType::Number,
            DataType::Float,
            DataType::TimestampTz,
            DataType::Variant,
            DataType::Object,
            DataType::Array,
            DataType::Binary,
        ] {
            assert_eq!(DataType::parse(&d.render_type(&t)), t, "{}", t);
        }
    }

    #[test]
    fn test_duckdb_has_no_routine_catalog() {
        let d = Dialect::DuckDb;
        assert!(d.catalog_sql(CatalogQuery::Procedures, None, 1).is_none());
        assert!(d.catalog_sql(CatalogQuery::Tables, None, 2).unwrap().contains("(?, ?)"));
        assert_eq!(d.supported_kinds(), vec![ObjectKind::Table, ObjectKind::View]);
    }

    #[test]
    fn test_snowflake_catalog_is_database_qualified() {
        let sql = Dialect::Snowflake
            .catalog_sql(CatalogQuery::Procedures, Some("CLAUDE_BI"), 3)
            .unwrap();
        assert!(sql.contains("FROM CLAUDE_BI.INFORMATION_SCHEMA.PROCEDURES"));
        assert!(sql.contains("IN (?, ?, ?)"));
    }

    #[test]
    fn test_create_table_renders_not_null_and_primary_key() {
        let spec = TableSpec::new(vec![
            ColumnSpec::required("EVENT_ID", DataType::String).primary_key(),
            ColumnSpec::optional("ATTRIBUTES", DataType::Variant),
        ]);
        let sql = Dialect::Snowflake.create_table(&ObjectKey::table("ACTIVITY", "EVENTS"), &spec);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS ACTIVITY.EVENTS (\n    EVENT_ID VARCHAR NOT NULL,\n    ATTRIBUTES VARIANT,\n    PRIMARY KEY (EVENT_ID)\n)"
        );
    }

    #[test]
    fn test_alter_statements() {
        let d = Dialect::DuckDb;
        let key = ObjectKey::table("ACTIVITY", "EVENTS");
        let col = ColumnSpec::required("SOURCE", DataType::String);
        assert_eq!(
            d.add_column(&key, &col),
            "ALTER TABLE ACTIVITY.EVENTS ADD COLUMN IF NOT EXISTS SOURCE VARCHAR"
        );
        assert_eq!(
            d.set_nullability(&key, "SOURCE", false),
            "ALTER TABLE ACTIVITY.EVENTS ALTER COLUMN SOURCE SET NOT NULL"
        );
        assert_eq!(
            d.set_nullability(&key, "SOURCE", true),
            "ALTER TABLE ACTIVITY.EVENTS ALTER COLUMN SOURCE DROP NOT NULL"
        );
        assert_eq!(
            d.set_column_type(&key, &col),
            "ALTER TABLE ACTIVITY.EVENTS ALTER COLUMN SOURCE SET DATA TYPE VARCHAR"
        );
    }

    #[test]
    fn test_create_view_accepts_full_ddl() {
        let key = ObjectKey::view("A", "V");
        assert_eq!(
            Dialect::DuckDb.create_view(&key, "SELECT 1 AS X;"),
            "CREATE OR REPLACE VIEW A.V AS\nSELECT 1 AS X"
        );
        assert_eq!(
            Dialect::DuckDb.create_view(&key, "create or replace view A.V as select 1"),
            "create or replace view A.V as select 1"
        );
    }

    #[test]
    fn test_create_routine() {
        let key = ObjectKey::new("MCP", "LOG_CLAUDE_EVENT", ObjectKind::Procedure);
        let spec = RoutineSpec::new(vec![ParamSpec::new("EVENT_PAYLOAD", DataType::Variant)])
            .returns("VARIANT")
            .body("BEGIN RETURN 1; END");
        let sql = Dialect::Snowflake.create_routine(&key, &spec).unwrap();
        assert!(sql.starts_with("CREATE OR REPLACE PROCEDURE MCP.LOG_CLAUDE_EVENT(EVENT_PAYLOAD VARIANT)"));
        assert!(sql.contains("$$\nBEGIN RETURN 1; END\n$$"));

        assert!(Dialect::DuckDb.create_routine(&key, &spec).is_none());
        assert!(Dialect::Snowflake
            .create_routine(&key, &RoutineSpec::default())
            .is_none());
    }

    #[test]
    fn test_create_stage_escapes_url() {
        let key = ObjectKey::new("MCP", "DASH_APPS", ObjectKind::Stage);
        let spec = StageSpec {
            url: Some("s3://bucket/it's".to_string()),
        };
        assert_eq!(
            Dialect::Snowflake.create_stage(&key, &spec).unwrap(),
            "CREATE STAGE IF NOT EXISTS MCP.DASH_APPS URL = 's3://bucket/it''s'"
        );
        assert!(Dialect::DuckDb.create_stage(&key, &spec).is_none());
    }
}
