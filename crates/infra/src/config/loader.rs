//! Configuration loader
//!
//! Loads application configuration from files and environment variables.
//!
//! ## Loading Strategy
//! 1. Probe the standard locations for a config file (JSON or TOML)
//! 2. Start from that file, or from defaults if none exists
//! 3. Apply environment variables on top (environment wins)
//! 4. Validate the result
//!
//! ## Environment Variables
//! - `IVY_REMOTE_URL`: Remote override endpoint
//! - `IVY_OVERRIDES_FILE`: Override file re-read on every refresh
//! - `IVY_LOCAL_STORE_PATH`: SQLite file for user-set overrides
//! - `IVY_ENV_OVERRIDES`: Whether `IVY_FEATURE_*` variables act as overrides
//! - `IVY_ENV_PREFIX`: Prefix for environment overrides
//! - `IVY_REFRESH_INTERVAL_SECS`: Refresh interval in seconds
//! - `IVY_FETCH_TIMEOUT_SECS`: Per-fetch timeout in seconds
//! - `IVY_MAX_STALENESS_SECS`: Age after which fetched overrides expire
//! - `IVY_LOG_LEVEL`: Log filter directive
//! - `IVY_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./ivy.json` or `./ivy.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use ivy_domain::{Config, IvyError, Result};

/// Load configuration with automatic fallback strategy
///
/// Reads the first config file found by [`probe_config_paths`] (or starts
/// from defaults), then applies environment variables on top.
///
/// # Errors
/// Returns `IvyError::Config` if:
/// - A config file exists but cannot be read or parsed
/// - An environment variable has an invalid value
/// - The merged configuration fails validation
pub fn load() -> Result<Config> {
    let base = match probe_config_paths() {
        Some(path) => read_config_file(&path)?,
        None => {
            tracing::debug!("No config file found, starting from defaults");
            Config::default()
        }
    };

    let config = apply_env(base)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from defaults plus environment variables only
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `IvyError::Config` if a variable has an invalid value or the
/// result fails validation.
pub fn load_from_env() -> Result<Config> {
    let config = apply_env(Config::default())?;
    config.validate()?;
    tracing::info!("Configuration loaded from environment variables");
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
/// Environment variables are *not* applied.
///
/// # Errors
/// Returns `IvyError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The configuration fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(IvyError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            IvyError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    let config = read_config_file(&config_path)?;
    config.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Config> {
    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| IvyError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `IvyError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| IvyError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| IvyError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(IvyError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory (`./config.{json,toml}`, `./ivy.{json,toml}`)
/// 2. Parent directory
/// 3. Relative to executable location
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_files(&cwd));
        candidates.push(cwd.join("../config.json"));
        candidates.push(cwd.join("../config.toml"));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidate_files(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.is_file())
}

fn candidate_files(dir: &Path) -> [PathBuf; 4] {
    [
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("ivy.json"),
        dir.join("ivy.toml"),
    ]
}

/// Overlay `IVY_*` environment variables onto `config`.
fn apply_env(mut config: Config) -> Result<Config> {
    let features = &mut config.features;

    if let Some(url) = env_opt("IVY_REMOTE_URL") {
        features.remote_url = Some(url);
    }
    if let Some(path) = env_opt("IVY_OVERRIDES_FILE") {
        features.overrides_file = Some(path);
    }
    if let Some(path) = env_opt("IVY_LOCAL_STORE_PATH") {
        features.local_store_path = Some(path);
    }
    features.env_overrides = env_bool("IVY_ENV_OVERRIDES", features.env_overrides);
    if let Some(prefix) = env_opt("IVY_ENV_PREFIX") {
        features.env_prefix = prefix;
    }
    if let Some(secs) = env_u64("IVY_REFRESH_INTERVAL_SECS")? {
        features.refresh_interval_seconds = secs;
    }
    if let Some(secs) = env_u64("IVY_FETCH_TIMEOUT_SECS")? {
        features.fetch_timeout_seconds = secs;
    }
    if let Some(secs) = env_u64("IVY_MAX_STALENESS_SECS")? {
        features.max_staleness_seconds = Some(secs);
    }

    if let Some(level) = env_opt("IVY_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("IVY_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Get a non-empty environment variable
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Parse an optional numeric environment variable
///
/// # Errors
/// Returns `IvyError::Config` if the variable is set but not a number.
fn env_u64(key: &str) -> Result<Option<u64>> {
    env_opt(key)
        .map(|s| {
            s.parse::<u64>().map_err(|e| IvyError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
///
/// # Returns
/// The parsed boolean value, or `default` if not set.
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
