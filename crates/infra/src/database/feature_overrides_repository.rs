//! SQLite-backed local override store.
//!
//! Implements the `LocalOverrideStore` port. Values are stored as JSON
//! scalars so boolean and variant overrides share one column. All database
//! operations run in `spawn_blocking` to avoid blocking the async runtime.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use ivy_core::{LocalOverrideStore, OverrideMap};
use ivy_domain::{FlagValue, IvyError, Result};
use rusqlite::{params, Connection};
use tokio::task;

use super::manager::DbManager;
use crate::errors::map_join_error;

/// SQLite-backed store for user-set flag overrides.
///
/// Provides upsert semantics keyed by flag key.
pub struct SqliteOverrideStore {
    db: Arc<DbManager>,
}

impl SqliteOverrideStore {
    /// Wrap an existing manager. The schema is created if missing.
    pub fn new(db: Arc<DbManager>) -> Result<Self> {
        db.run_migrations()?;
        Ok(Self { db })
    }

    /// Open the database file at `path` and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(Arc::new(DbManager::new(path)?))
    }

    /// Store backed by a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::new(Arc::new(DbManager::in_memory()?))
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&DbManager) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || f(&db)).await.map_err(map_join_error)?
    }
}

#[async_trait]
impl LocalOverrideStore for SqliteOverrideStore {
    async fn load_all(&self) -> Result<OverrideMap> {
        let rows = self.blocking(|db| db.with_connection(query_all_overrides)).await?;

        let mut overrides = OverrideMap::new();
        for (key, value_json) in rows {
            match serde_json::from_str::<FlagValue>(&value_json) {
                Ok(value) => {
                    overrides.insert(key, value);
                }
                Err(err) => {
                    tracing::warn!(flag_key = %key, error = %err, "Skipping undecodable stored override");
                }
            }
        }
        Ok(overrides)
    }

    async fn set(&self, key: &str, value: &FlagValue) -> Result<()> {
        let key = key.to_string();
        let value_json = serde_json::to_string(value)
            .map_err(|e| IvyError::Internal(format!("failed to encode override: {e}")))?;

        self.blocking(move |db| db.with_connection(|conn| upsert_override(conn, &key, &value_json)))
            .await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.blocking(move |db| db.with_connection(|conn| delete_override(conn, &key))).await
    }
}

// ============================================================================
// Synchronous SQL Operations (called inside spawn_blocking)
// ============================================================================

/// Query all stored overrides ordered by key.
fn query_all_overrides(conn: &Connection) -> rusqlite::Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT flag_key, value_json
         FROM feature_overrides
         ORDER BY flag_key",
    )?;

    let rows = stmt.query_map(params![], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

/// Insert or replace the override for `flag_key`.
fn upsert_override(conn: &Connection, flag_key: &str, value_json: &str) -> rusqlite::Result<()> {
    let now = chrono::Utc::now().timestamp();

    conn.execute(
        "INSERT INTO feature_overrides (flag_key, value_json, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(flag_key) DO UPDATE SET
            value_json = excluded.value_json,
            updated_at = excluded.updated_at",
        params![flag_key, value_json, now],
    )?;
    Ok(())
}

/// Delete the override for `flag_key`; reports whether a row existed.
fn delete_override(conn: &Connection, flag_key: &str) -> rusqlite::Result<bool> {
    let affected =
        conn.execute("DELETE FROM feature_overrides WHERE flag_key = ?1", params![flag_key])?;
    Ok(affected > 0)
}

// ============================================================================
// Tests
// ============================================================================
