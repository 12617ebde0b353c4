//! Shared helpers for ivy-infra integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use ivy_core::FeatureRegistry;
use ivy_infra::{IvyFeatures, SqliteOverrideStore, StaticOverrideSource};
use tempfile::TempDir;

/// Registry with Ivy's built-in flags.
pub fn registry() -> Arc<FeatureRegistry> {
    Arc::new(FeatureRegistry::ivy_defaults())
}

/// Service wired to a controllable in-memory source.
pub fn service_with_static_source() -> (Arc<IvyFeatures>, Arc<StaticOverrideSource>) {
    let source = Arc::new(StaticOverrideSource::default());
    let features = Arc::new(IvyFeatures::new(registry()).with_source(Arc::clone(&source) as _));
    (features, source)
}

/// SQLite store in a temporary directory that lives as long as the wrapper.
pub struct TestStore {
    pub store: Arc<SqliteOverrideStore>,
    pub path: PathBuf,
    _temp_dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let path = temp_dir.path().join("ivy-features.db");
        let store = SqliteOverrideStore::open(&path).expect("store should open");
        Self { store: Arc::new(store), path, _temp_dir: temp_dir }
    }

    /// Open a second handle on the same database file.
    pub fn reopen(&self) -> Arc<SqliteOverrideStore> {
        Arc::new(SqliteOverrideStore::open(&self.path).expect("store should reopen"))
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Write `contents` to `name` inside a fresh temporary directory.
pub fn write_temp_file(name: &str, contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir should be created");
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("file should be written");
    (dir, path)
}
