//! Periodic feature override refresh.
//!
//! Drives [`IvyFeatures::refresh`] on a fixed interval. The first refresh
//! runs as soon as the scheduler starts.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use ivy_core::FeatureRegistry;
//! use ivy_infra::scheduling::{RefreshScheduler, RefreshSchedulerConfig};
//! use ivy_infra::services::IvyFeatures;
//!
//! # async fn example() -> Result<(), ivy_infra::scheduling::SchedulerError> {
//! let features = Arc::new(IvyFeatures::new(Arc::new(FeatureRegistry::ivy_defaults())));
//! let mut scheduler = RefreshScheduler::new(
//!     features,
//!     RefreshSchedulerConfig { interval: Duration::from_secs(300), ..Default::default() },
//! );
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use ivy_domain::constants::{DEFAULT_REFRESH_INTERVAL_SECS, SCHEDULER_JOIN_TIMEOUT_SECS};
use ivy_domain::FeaturesConfig;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};
use crate::services::IvyFeatures;

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the refresh scheduler
#[derive(Debug, Clone)]
pub struct RefreshSchedulerConfig {
    /// Delay between refreshes
    pub interval: Duration,
    /// How long `stop` waits for the loop to finish
    pub join_timeout: Duration,
}

impl Default for RefreshSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            join_timeout: Duration::from_secs(SCHEDULER_JOIN_TIMEOUT_SECS),
        }
    }
}

impl From<&FeaturesConfig> for RefreshSchedulerConfig {
    fn from(config: &FeaturesConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.refresh_interval_seconds),
            ..Self::default()
        }
    }
}

/// Background task refreshing feature overrides
pub struct RefreshScheduler {
    features: Arc<IvyFeatures>,
    config: RefreshSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl RefreshScheduler {
    /// Create a stopped scheduler; call [`start`](Self::start) to run it.
    pub fn new(features: Arc<IvyFeatures>, config: RefreshSchedulerConfig) -> Self {
        Self {
            features,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the scheduler
    ///
    /// Spawns a background task that refreshes immediately and then once per
    /// interval.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(interval_secs = self.config.interval.as_secs(), "Starting refresh scheduler");

        // New token so the scheduler can be restarted after stop
        self.cancellation_token = CancellationToken::new();

        let features = Arc::clone(&self.features);
        let interval = self.config.interval;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::refresh_loop(features, interval, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!("Refresh scheduler started");
        Ok(())
    }

    /// Stop the scheduler gracefully
    ///
    /// Cancels the background task and awaits completion.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is not running, or the task does not finish
    /// within the join timeout
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping refresh scheduler");

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })??;
        }

        info!("Refresh scheduler stopped");
        Ok(())
    }

    /// Check if scheduler is running
    ///
    /// A scheduler is considered running if it has an active task handle that
    /// hasn't finished.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn refresh_loop(
        features: Arc<IvyFeatures>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Refresh loop cancelled");
                    break;
                }
                outcome = features.refresh() => {
                    debug!(?outcome, "Scheduled refresh finished");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Refresh loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        // Can't await the handle here; cancel if a task might still be live
        if self.is_running() && !self.cancellation_token.is_cancelled() {
            warn!("RefreshScheduler dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}
