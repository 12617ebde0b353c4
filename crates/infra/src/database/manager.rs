//! SQLite connection manager for the local override store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ivy_domain::{IvyError, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tracing::info;

use crate::errors::to_ivy;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the single SQLite connection used by the override store.
///
/// Calls are serialized through a mutex; callers are expected to run inside
/// `spawn_blocking`.
pub struct DbManager {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl DbManager {
    /// Open (or create) the database file at `db_path`.
    ///
    /// Missing parent directories are created.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                IvyError::Storage(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(&path).map_err(to_ivy)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(to_ivy)?;

        info!(db_path = %path.display(), "sqlite override store opened");

        Ok(Self { conn: Mutex::new(conn), path: Some(path) })
    }

    /// Private in-memory database, gone when the manager is dropped.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(to_ivy)?;
        Ok(Self { conn: Mutex::new(conn), path: None })
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn).map_err(to_ivy)
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        self.with_connection(create_schema)
    }

    /// Return the database path, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Verify the database is accessible and responding.
    pub fn health_check(&self) -> Result<()> {
        self.with_connection(|conn| conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0)))?;
        Ok(())
    }
}

fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, CAST(strftime('%s','now') AS INTEGER))",
        params![SCHEMA_VERSION],
    )?;
    Ok(())
}
