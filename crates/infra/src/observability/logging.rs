//! Global tracing subscriber setup.

use ivy_domain::{IvyError, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber described by `config`.
///
/// `RUST_LOG`, when set, takes precedence over `config.level`.
///
/// # Errors
/// Returns `IvyError::Config` if the level directive cannot be parsed and
/// `IvyError::Internal` if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = build_env_filter(&config.level)?;

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_current_span(false))
            .try_init()
    } else {
        tracing_subscriber::registry().with(filter).with(fmt::layer().with_target(false)).try_init()
    };

    installed
        .map_err(|err| IvyError::Internal(format!("failed to install tracing subscriber: {err}")))
}

/// Build the event filter, preferring `RUST_LOG` over the configured level.
///
/// # Errors
/// Returns `IvyError::Config` when `level` is not a valid filter directive.
pub fn build_env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|err| IvyError::Config(format!("invalid log level '{level}': {err}")))
}
