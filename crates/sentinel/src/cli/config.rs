//! Configuration paths for schema-sentinel
//!
//! All defaults live under ~/.schema_sentinel/ unless overridden by flags or
//! environment variables.

use std::path::{Path, PathBuf};

pub use sentinel_logging::{logs_dir, sentinel_home};

/// Where `--generate-fix` writes when no `--fix-path` is given.
pub const DEFAULT_FIX_PATH: &str = "scripts/fix-schema-drift.sql";

/// Default database: ~/.schema_sentinel/warehouse.duckdb
pub fn default_database_path() -> PathBuf {
    sentinel_home().join("warehouse.duckdb")
}

/// Actor recorded by table-backed audit events.
pub fn audit_actor() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "schema-sentinel".to_string())
}

/// Mark a generated script executable (0o755). No-op off Unix.
pub fn make_executable(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
