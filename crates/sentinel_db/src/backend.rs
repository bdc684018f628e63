//! DuckDB session backend.
//!
//! - Synchronous, single connection per session
//! - Single-writer enforced via file lock; read-only sessions skip the lock

use std::path::Path;
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug_span, info};

use crate::error::BackendError;
use crate::lock::{acquire_writer_lock, LockError, WriterLock};
use crate::session::Session;
use crate::value::{DbRow, DbTimestamp, DbValue};

/// Database access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-write access (requires exclusive lock)
    ReadWrite,
    /// Read-only access (can coexist with other readers)
    ReadOnly,
}

/// A DuckDB session.
#[derive(Clone)]
pub struct DbConnection {
    conn: Rc<duckdb::Connection>,
    access_mode: AccessMode,
    /// Dropping the last clone releases the writer lock.
    #[allow(dead_code)]
    writer_lock: Option<Rc<WriterLock>>,
}

impl std::fmt::Debug for DbConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConnection")
            .field("backend", &"DuckDB")
            .field("access_mode", &self.access_mode)
            .finish()
    }
}

impl DbConnection {
    /// Open a database from a URL.
    ///
    /// Supported scheme: `duckdb:<path>` (or `duckdb::memory:`).
    pub fn open_from_url(url: &str) -> Result<Self, BackendError> {
        match url.strip_prefix("duckdb:") {
            Some(":memory:") => Self::open_duckdb_memory(),
            Some(path) => Self::open_duckdb(Path::new(path)),
            None => Err(BackendError::NotAvailable(format!(
                "Unsupported database URL: {}",
                url
            ))),
        }
    }

    /// Open a DuckDB database with exclusive write lock.
    pub fn open_duckdb(path: &Path) -> Result<Self, BackendError> {
        let writer_lock = acquire_writer_lock(path).map_err(|e| match e {
            LockError::Locked { .. } => BackendError::Locked(e.to_string()),
            other => BackendError::Connection(other.to_string()),
        })?;

        let conn = duckdb::Connection::open(path)
            .map_err(|e| BackendError::Connection(format!("{}: {}", path.display(), e)))?;
        info!(
            "Opened DuckDB database with writer lock: {}",
            path.display()
        );

        Ok(Self {
            conn: Rc::new(conn),
            access_mode: AccessMode::ReadWrite,
            writer_lock: Some(Rc::new(writer_lock)),
        })
    }

    /// Open a DuckDB database in read-only mode (no lock required).
    pub fn open_duckdb_readonly(path: &Path) -> Result<Self, BackendError> {
        use duckdb::{AccessMode as DuckAccessMode, Config};

        if !path.exists() {
            return Err(BackendError::Connection(format!(
                "Database not found: {}",
                path.display()
            )));
        }

        let config = Config::default().access_mode(DuckAccessMode::ReadOnly)?;
        let conn = duckdb::Connection::open_with_flags(path, config)
            .map_err(|e| BackendError::Connection(format!("{}: {}", path.display(), e)))?;
        info!("Opened DuckDB database (read-only): {}", path.display());

        Ok(Self {
            conn: Rc::new(conn),
            access_mode: AccessMode::ReadOnly,
            writer_lock: None,
        })
    }

    /// Open an in-memory DuckDB database (for testing).
    pub fn open_duckdb_memory() -> Result<Self, BackendError> {
        let conn = Rc::new(duckdb::Connection::open_in_memory()?);
        info!("Opened in-memory DuckDB database");

        Ok(Self {
            conn,
            access_mode: AccessMode::ReadWrite,
            writer_lock: None,
        })
    }

    /// Get the access mode.
    pub fn access_mode(&self) -> AccessMode {
        self.access_mode
    }

    /// Check if this connection has write access.
    pub fn is_writable(&self) -> bool {
        self.access_mode == AccessMode::ReadWrite
    }

    fn execute_on_conn(
        conn: &duckdb::Connection,
        sql: &str,
        params: &[DbValue],
    ) -> Result<u64, BackendError> {
        let span = debug_span!(
            "db.exec",
            op = sql_op_name(sql),
            sql_hash = %hash_sql(sql),
            duration_ms = tracing::field::Empty
        );
        let _guard = span.enter();
        let start = Instant::now();

        let mut stmt = conn.prepare(sql)?;
        let duckdb_params = to_duckdb_params(params);
        let param_refs: Vec<&dyn duckdb::ToSql> = duckdb_params
            .iter()
            .map(|v| v as &dyn duckdb::ToSql)
            .collect();
        let rows = stmt.execute(param_refs.as_slice())?;
        span.record("duration_ms", start.elapsed().as_millis() as u64);
        Ok(rows as u64)
    }

    fn query_on_conn(
        conn: &duckdb::Connection,
        sql: &str,
        params: &[DbValue],
    ) -> Result<Vec<DbRow>, BackendError> {
        let span = debug_span!(
            "db.query",
            op = sql_op_name(sql),
            sql_hash = %hash_sql(sql),
            duration_ms = tracing::field::Empty
        );
        let _guard = span.enter();
        let start = Instant::now();

        let mut stmt = conn.prepare(sql)?;
        let duckdb_params = to_duckdb_params(params);
        let param_refs: Vec<&dyn duckdb::ToSql> = duckdb_params
            .iter()
            .map(|v| v as &dyn duckdb::ToSql)
            .collect();

        let mut rows_iter = stmt.query(param_refs.as_slice())?;

        let (column_count, columns) = if let Some(stmt_ref) = rows_iter.as_ref() {
            let count = stmt_ref.column_count();
            let cols: Vec<String> = (0..count)
                .map(|i| {
                    stmt_ref
                        .column_name(i)
                        .map(|s| s.to_string())
                        .unwrap_or_else(|_| format!("col{}", i))
                })
                .collect();
            (count, cols)
        } else {
            return Ok(Vec::new());
        };

        let mut result = Vec::new();
        while let Some(row) = rows_iter.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(duckdb_value_to_db_value(row, i)?);
            }
            result.push(DbRow::new(columns.clone(), values));
        }

        span.record("duration_ms", start.elapsed().as_millis() as u64);
        Ok(result)
    }
}

impl Session for DbConnection {
    fn query_all(&self, sql: &str, params: &[DbValue]) -> Result<Vec<DbRow>, BackendError> {
        Self::query_on_conn(self.conn.as_ref(), sql, params)
    }

    fn execute(&self, sql: &str, params: &[DbValue]) -> Result<u64, BackendError> {
        if self.access_mode == AccessMode::ReadOnly {
            return Err(BackendError::ReadOnly);
        }
        Self::execute_on_conn(self.conn.as_ref(), sql, params)
    }

    fn execute_batch(&self, sql: &str) -> Result<(), BackendError> {
        if self.access_mode == AccessMode::ReadOnly {
            return Err(BackendError::ReadOnly);
        }
        let span = debug_span!(
            "db.exec_batch",
            op = "BATCH",
            sql_hash = %hash_sql(sql),
            duration_ms = tracing::field::Empty
        );
        let _guard = span.enter();
        let start = Instant::now();
        self.conn.execute_batch(sql)?;
        span.record("duration_ms", start.elapsed().as_millis() as u64);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "DuckDB"
    }
}

fn to_duckdb_params(params: &[DbValue]) -> Vec<duckdb::types::Value> {
    params
        .iter()
        .map(|p| match p {
            DbValue::Null => duckdb::types::Value::Null,
            DbValue::Integer(v) => duckdb::types::Value::BigInt(*v),
            DbValue::Real(v) => duckdb::types::Value::Double(*v),
            DbValue::Text(v) => duckdb::types::Value::Text(v.clone()),
            DbValue::Blob(v) => duckdb::types::Value::Blob(v.clone()),
            DbValue::Boolean(v) => duckdb::types::Value::Boolean(*v),
            DbValue::Timestamp(v) => {
                let micros = v.as_chrono().timestamp_micros();
                duckdb::types::Value::Timestamp(duckdb::types::TimeUnit::Microsecond, micros)
            }
        })
        .collect()
}

fn duckdb_value_to_db_value(row: &duckdb::Row, index: usize) -> Result<DbValue, duckdb::Error> {
    use duckdb::types::ValueRef;

    match row.get_ref(index)? {
        ValueRef::Null => Ok(DbValue::Null),
        ValueRef::Boolean(v) => Ok(DbValue::Boolean(v)),
        ValueRef::TinyInt(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::SmallInt(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::Int(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::BigInt(v) => Ok(DbValue::Integer(v)),
        ValueRef::HugeInt(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::UTinyInt(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::USmallInt(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::UInt(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::UBigInt(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::Float(v) => Ok(DbValue::Real(v as f64)),
        ValueRef::Double(v) => Ok(DbValue::Real(v)),
        ValueRef::Text(v) => Ok(DbValue::Text(String::from_utf8_lossy(v).to_string())),
        ValueRef::Blob(v) => Ok(DbValue::Blob(v.to_vec())),
        ValueRef::Timestamp(unit, v) => {
            let micros = match unit {
                duckdb::types::TimeUnit::Second => v * 1_000_000,
                duckdb::types::TimeUnit::Millisecond => v * 1_000,
                duckdb::types::TimeUnit::Microsecond => v,
                duckdb::types::TimeUnit::Nanosecond => v / 1_000,
            };
            let secs = micros.div_euclid(1_000_000);
            let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
            match chrono::DateTime::from_timestamp(secs, nanos) {
                Some(dt) => Ok(DbValue::Timestamp(DbTimestamp::from_chrono(dt))),
                None => Ok(DbValue::Integer(micros)),
            }
        }
        other => {
            tracing::warn!(
                "DuckDB type {:?} at column {} mapped to debug string",
                std::mem::discriminant(&other),
                index
            );
            Ok(DbValue::Text(format!("{:?}", other)))
        }
    }
}

fn sql_op_name(sql: &str) -> &str {
    sql.split_whitespace().next().unwrap_or("unknown")
}

fn hash_sql(sql: &str) -> String {
    // FNV-1a 64-bit hash for low-cardinality, stable identification.
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in sql.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    format!("{:016x}", hash)
}
