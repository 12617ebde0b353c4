use std::time::Duration;

use ivy_domain::{FlagOrigin, IvyError};
use tracing::{debug, info, warn};

/// Log the outcome of a command execution with structured fields.
///
/// # Parameters
/// * `command` - Logical command identifier (e.g. `"feature_flags::set_feature_flag"`).
/// * `elapsed` - Duration the command execution took.
/// * `error_type` - Stable error label when the command failed.
///
/// Callers must avoid forwarding sensitive values in `command`.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error_type: Option<&str>) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    match error_type {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(error_type) => {
            warn!(command, duration_ms, error_type, "command_execution_failure");
        }
    }
}

/// Log the outcome of a feature flag evaluation.
///
/// `flag_key` should be a stable identifier without sensitive data.
#[inline]
pub fn log_feature_flag_check(flag_key: &str, is_enabled: bool, origin: Option<FlagOrigin>) {
    let origin = origin.map_or_else(|| "unknown".to_string(), |origin| origin.to_string());
    debug!(flag_key, is_enabled, origin = %origin, "feature_flag_evaluated");
}

/// Convert an `IvyError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &IvyError) -> &'static str {
    error.label()
}
