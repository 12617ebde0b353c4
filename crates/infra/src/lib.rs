//! # Ivy Infrastructure
//!
//! Infrastructure implementations of the `ivy-core` feature flag ports.
//!
//! This crate contains:
//! - `IvyFeatures`, the concrete `Features` service with atomic snapshots
//! - Override sources (HTTP remote config, file, environment, layered)
//! - SQLite-backed local override store
//! - Background refresh scheduling
//! - Configuration loading and logging setup
//!
//! ## Architecture
//! - Implements traits defined in `ivy-core`
//! - Depends on `ivy-domain` and `ivy-core`
//! - Contains all "impure" code (I/O, network, storage)

pub mod config;
pub mod database;
pub mod errors;
pub mod observability;
pub mod scheduling;
pub mod services;
pub mod sources;

#[cfg(test)]
pub(crate) mod test_env {
    use std::sync::Mutex;

    use once_cell::sync::Lazy;

    /// Serializes unit tests that mutate the process environment.
    pub(crate) static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
}

// Re-export commonly used items
pub use database::{InMemoryOverrideStore, SqliteOverrideStore};
pub use errors::InfraError;
pub use scheduling::{RefreshScheduler, RefreshSchedulerConfig, SchedulerError, SchedulerResult};
pub use services::{IvyFeatures, IvyFeaturesOptions, RefreshOutcome, RefreshStatus};
pub use sources::{
    EnvOverrideSource, FileOverrideSource, HttpOverrideSource, LayeredOverrideSource,
    StaticOverrideSource,
};
