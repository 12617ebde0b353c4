//! Scheduling infrastructure for background refreshes
//!
//! Schedulers follow the same runtime rules:
//! - Explicit lifecycle management (start/stop)
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Timeout on join during shutdown

pub mod error;
pub mod refresh_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use refresh_scheduler::{RefreshScheduler, RefreshSchedulerConfig};
