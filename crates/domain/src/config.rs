//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ENV_OVERRIDE_PREFIX, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_LOG_LEVEL,
    DEFAULT_REFRESH_INTERVAL_SECS,
};
use crate::errors::{IvyError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the service cannot run with.
    ///
    /// # Errors
    /// Returns `IvyError::Config` for zero intervals/timeouts or a remote URL
    /// without an http(s) scheme.
    pub fn validate(&self) -> Result<()> {
        self.features.validate()
    }
}

/// Feature flag service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Remote override endpoint; `None` disables remote fetching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    /// TOML/JSON file with overrides, re-read on every refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides_file: Option<String>,
    /// SQLite file holding user-set overrides; `None` keeps them in memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_store_path: Option<String>,
    /// Whether `IVY_FEATURE_*` environment variables act as overrides
    #[serde(default)]
    pub env_overrides: bool,
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
    /// Drop fetched overrides once they are older than this; `None` keeps the
    /// last successful fetch indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_staleness_seconds: Option<u64>,
}

impl FeaturesConfig {
    fn validate(&self) -> Result<()> {
        if self.refresh_interval_seconds == 0 {
            return Err(IvyError::Config("refresh_interval_seconds must be > 0".into()));
        }
        if self.fetch_timeout_seconds == 0 {
            return Err(IvyError::Config("fetch_timeout_seconds must be > 0".into()));
        }
        if self.max_staleness_seconds == Some(0) {
            return Err(IvyError::Config("max_staleness_seconds must be > 0".into()));
        }
        if let Some(url) = &self.remote_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(IvyError::Config(format!("remote_url must be http(s): {url}")));
            }
        }
        if self.env_overrides && self.env_prefix.is_empty() {
            return Err(IvyError::Config("env_prefix must not be empty".into()));
        }
        Ok(())
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            overrides_file: None,
            local_store_path: None,
            env_overrides: false,
            env_prefix: default_env_prefix(),
            refresh_interval_seconds: default_refresh_interval(),
            fetch_timeout_seconds: default_fetch_timeout(),
            max_staleness_seconds: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `ivy_infra=debug`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

fn default_env_prefix() -> String {
    DEFAULT_ENV_OVERRIDE_PREFIX.to_string()
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
