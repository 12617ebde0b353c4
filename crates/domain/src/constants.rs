//! Application constants
//!
//! Centralized location for the domain-level defaults used by the feature
//! flag service and its loaders.

// Refresh scheduling
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const SCHEDULER_JOIN_TIMEOUT_SECS: u64 = 5;

// Environment overrides
pub const DEFAULT_ENV_OVERRIDE_PREFIX: &str = "IVY_FEATURE_";

// Local override store
pub const DEFAULT_LOCAL_STORE_PATH: &str = "ivy-features.db";

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";
