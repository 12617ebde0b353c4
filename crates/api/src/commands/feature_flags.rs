//! Feature flag commands
//!
//! Front-end facing operations over [`AppContext`]. Each handler is timed and
//! logged, and reports failures as display strings.

use ivy_core::FlagState;
use ivy_domain::{FlagValue, IvyError};
use ivy_infra::RefreshOutcome;
use tracing::info;

use crate::utils::command_helpers::execute_with_string_error;
use crate::utils::logging::log_feature_flag_check;
use crate::AppContext;

/// Whether `flag` is enabled. Unknown flags are disabled.
pub async fn is_feature_enabled(ctx: &AppContext, flag: &str) -> Result<bool, String> {
    execute_with_string_error("feature_flags::is_feature_enabled", || async {
        let snapshot = ctx.feature_flags.snapshot();
        let is_enabled = snapshot.is_enabled(flag);
        log_feature_flag_check(flag, is_enabled, snapshot.get(flag).map(|resolved| resolved.origin));
        Ok::<_, IvyError>(is_enabled)
    })
    .await
}

/// Resolved variant of a variant flag; `None` for boolean or unknown flags.
pub async fn get_feature_variant(ctx: &AppContext, flag: &str) -> Result<Option<String>, String> {
    execute_with_string_error("feature_flags::get_feature_variant", || async {
        Ok::<_, IvyError>(ctx.feature_flags.variant(flag))
    })
    .await
}

/// Set a local override from a loosely typed value (`on`, `false`, `compact`).
pub async fn set_feature_flag(ctx: &AppContext, flag: &str, value: &str) -> Result<(), String> {
    let value = FlagValue::parse_lenient(value);
    info!(command = "feature_flags::set_feature_flag", flag, %value, "Setting feature flag");

    execute_with_string_error("feature_flags::set_feature_flag", || async {
        ctx.features.set_local_override(flag, value).await
    })
    .await
}

/// Remove the local override of `flag`.
pub async fn clear_feature_flag(ctx: &AppContext, flag: &str) -> Result<(), String> {
    info!(command = "feature_flags::clear_feature_flag", flag, "Clearing feature flag");

    execute_with_string_error("feature_flags::clear_feature_flag", || async {
        ctx.features.clear_local_override(flag).await
    })
    .await
}

/// Every registered flag with its resolved state.
pub async fn list_feature_flags(ctx: &AppContext) -> Result<Vec<FlagState>, String> {
    execute_with_string_error("feature_flags::list_feature_flags", || async {
        Ok::<_, IvyError>(ctx.features.list())
    })
    .await
}

/// Refresh overrides now instead of waiting for the scheduler.
///
/// Fetch failures are part of the returned outcome, not an error.
pub async fn refresh_feature_flags(ctx: &AppContext) -> Result<RefreshOutcome, String> {
    execute_with_string_error("feature_flags::refresh_feature_flags", || async {
        let outcome = ctx.features.refresh().await;
        match &outcome {
            RefreshOutcome::Failed { reason } => {
                tracing::warn!(reason = %reason, "Manual refresh failed");
            }
            other => tracing::debug!(outcome = ?other, "Manual refresh finished"),
        }
        Ok::<_, IvyError>(outcome)
    })
    .await
}
