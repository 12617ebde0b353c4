//! Command execution helpers
//!
//! Every command handler times itself and logs one structured record; these
//! helpers keep that boilerplate out of the handlers.

use std::future::Future;
use std::time::Instant;

use ivy_domain::Result as DomainResult;

use crate::utils::logging::{error_label, log_command_execution};

/// Execute a command with automatic timing and logging
///
/// # Example
///
/// ```rust,ignore
/// pub async fn my_command(ctx: &AppContext) -> Result<MyResponse, String> {
///     execute_with_string_error("my_module::my_command", || async {
///         ctx.features.do_something().await
///     })
///     .await
/// }
/// ```
pub async fn execute_with_logging<F, Fut, T>(command_name: &str, command_fn: F) -> DomainResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = DomainResult<T>>,
{
    let start = Instant::now();

    let result = command_fn().await;

    let error_type = result.as_ref().err().map(error_label);
    log_command_execution(command_name, start.elapsed(), error_type);

    result
}

/// Execute a command and render its error as a `String`
///
/// Command handlers return `Result<T, String>` so any front end can display
/// the failure without depending on `IvyError`.
pub async fn execute_with_string_error<F, Fut, T>(
    command_name: &str,
    command_fn: F,
) -> Result<T, String>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = DomainResult<T>>,
{
    execute_with_logging(command_name, command_fn).await.map_err(|e| e.to_string())
}
