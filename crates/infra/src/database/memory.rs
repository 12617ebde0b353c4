//! In-memory local override store, for embedding without persistence and
//! for tests.

use async_trait::async_trait;
use ivy_core::{LocalOverrideStore, OverrideMap};
use ivy_domain::{FlagValue, Result};
use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryOverrideStore {
    overrides: RwLock<OverrideMap>,
}

impl InMemoryOverrideStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `overrides`.
    pub fn with_overrides(overrides: OverrideMap) -> Self {
        Self { overrides: RwLock::new(overrides) }
    }
}

#[async_trait]
impl LocalOverrideStore for InMemoryOverrideStore {
    async fn load_all(&self) -> Result<OverrideMap> {
        Ok(self.overrides.read().clone())
    }

    async fn set(&self, key: &str, value: &FlagValue) -> Result<()> {
        self.overrides.write().insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.overrides.write().remove(key).is_some())
    }
}
