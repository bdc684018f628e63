//! Single-writer lock for DuckDB files.
//!
//! DuckDB allows one writer process per file. Read-write sessions (bootstrap,
//! applying a fix script, table-backed audit) hold an exclusive lock on
//! `<db>.lock` for their lifetime. The lock file records the holder so a
//! second writer can say who is in the way. Read-only validation takes no lock.

use chrono::Utc;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("{} is held by {holder}", path.display())]
    Locked { path: PathBuf, holder: String },

    #[error("Cannot open lock file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot lock {}: {source}", path.display())]
    Acquire {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Exclusive writer lock, released on drop.
pub struct WriterLock {
    _file: File,
    path: PathBuf,
}

impl WriterLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for WriterLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterLock").field("path", &self.path).finish()
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        debug!("Releasing writer lock: {}", self.path.display());
    }
}

/// `/data/warehouse.duckdb` → `/data/warehouse.duckdb.lock`
pub fn lock_path_for(db_path: &Path) -> PathBuf {
    let mut name = db_path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// Take the writer lock for `db_path` without blocking.
pub fn acquire_writer_lock(db_path: &Path) -> Result<WriterLock, LockError> {
    let path = lock_path_for(db_path);
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .map_err(|source| LockError::Open {
            path: path.clone(),
            source,
        })?;

    // Fully qualified: std has its own File::try_lock_exclusive.
    match FileExt::try_lock_exclusive(&file) {
        Ok(()) => {
            // Holder info is advisory; a failed write does not give up the lock.
            if let Err(e) = record_holder(&mut file) {
                debug!("Cannot record lock holder in {}: {}", path.display(), e);
            }
            debug!("Acquired writer lock: {}", path.display());
            Ok(WriterLock { _file: file, path })
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(LockError::Locked {
            holder: read_holder(&mut file),
            path: db_path.to_path_buf(),
        }),
        Err(source) => Err(LockError::Acquire { path, source }),
    }
}

fn record_holder(file: &mut File) -> io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    write!(
        file,
        "pid {} since {}",
        std::process::id(),
        Utc::now().to_rfc3339()
    )?;
    file.flush()
}

fn read_holder(file: &mut File) -> String {
    let mut holder = String::new();
    match file.read_to_string(&mut holder) {
        Ok(_) if !holder.trim().is_empty() => holder.trim().to_string(),
        _ => "another process".to_string(),
    }
}
