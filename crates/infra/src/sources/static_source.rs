//! In-memory override source
//!
//! Holds a fixed map that can be swapped at runtime or switched into a
//! failing state. Used when embedding the service without a backend and to
//! drive refreshes in tests.

use async_trait::async_trait;
use ivy_core::{OverrideMap, OverrideSource};
use ivy_domain::{FlagValue, IvyError, Result};
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct State {
    overrides: OverrideMap,
    failure: Option<String>,
    fetches: u64,
}

#[derive(Debug, Default)]
pub struct StaticOverrideSource {
    state: RwLock<State>,
}

impl StaticOverrideSource {
    /// Source serving `overrides`.
    pub fn new(overrides: OverrideMap) -> Self {
        Self { state: RwLock::new(State { overrides, ..State::default() }) }
    }

    /// Build from `(key, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<FlagValue>,
    {
        Self::new(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Replace the served map. Clears any injected failure.
    pub fn replace(&self, overrides: OverrideMap) {
        let mut state = self.state.write();
        state.overrides = overrides;
        state.failure = None;
    }

    /// Insert or replace one served value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<FlagValue>) {
        self.state.write().overrides.insert(key.into(), value.into());
    }

    /// Make subsequent fetches fail with `IvyError::Network(reason)`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        self.state.write().failure = Some(reason.into());
    }

    /// Clear an injected failure.
    pub fn recover(&self) {
        self.state.write().failure = None;
    }

    /// Number of fetches served so far, failed ones included.
    pub fn fetch_count(&self) -> u64 {
        self.state.read().fetches
    }
}

#[async_trait]
impl OverrideSource for StaticOverrideSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_overrides(&self) -> Result<OverrideMap> {
        let mut state = self.state.write();
        state.fetches += 1;
        match &state.failure {
            Some(reason) => Err(IvyError::Network(reason.clone())),
            None => Ok(state.overrides.clone()),
        }
    }
}
