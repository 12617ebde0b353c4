//! Application context - dependency injection container

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ivy_core::{FeatureRegistry, Features, LocalOverrideStore, OverrideSource};
use ivy_domain::{Config, FeaturesConfig, IvyError, Result};
use ivy_infra::{
    EnvOverrideSource, FileOverrideSource, HttpOverrideSource, InMemoryOverrideStore, IvyFeatures,
    IvyFeaturesOptions, LayeredOverrideSource, RefreshScheduler, RefreshSchedulerConfig,
    SqliteOverrideStore,
};
use tokio::sync::Mutex;

/// Type alias for the feature query capability trait object
type DynFeatures = dyn Features + Send + Sync + 'static;

const SCHEDULER_START_TIMEOUT: Duration = Duration::from_secs(10);

/// Application context - holds the feature service and its background work
pub struct AppContext {
    pub config: Config,
    /// Concrete service, used by commands that mutate overrides
    pub features: Arc<IvyFeatures>,
    /// Read-only view handed to UI and business logic
    pub feature_flags: Arc<DynFeatures>,
    scheduler: Mutex<Option<RefreshScheduler>>,
}

impl AppContext {
    /// Build the context from configuration.
    ///
    /// Opens the local store, loads persisted overrides and runs one refresh
    /// so the first queries already see remote values. The background
    /// refresh is started separately with [`AppContext::start_background_refresh`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the local store or
    /// an override source cannot be created.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(FeatureRegistry::ivy_defaults());
        let store = build_store(&config.features)?;
        let mut features = IvyFeatures::new(registry)
            .with_store(store)
            .with_options(IvyFeaturesOptions::from(&config.features));

        if let Some(source) = build_source(&config.features)? {
            features = features.with_source(source);
        }

        let features = Arc::new(features);
        let loaded = features.load_local_overrides().await;
        let outcome = features.refresh().await;

        tracing::info!(
            local_overrides = loaded,
            has_source = features.has_source(),
            ?outcome,
            "Feature flags initialized"
        );

        Ok(Self::from_features(config, features))
    }

    /// Wrap an already built service. No I/O is performed.
    pub fn from_features(config: Config, features: Arc<IvyFeatures>) -> Self {
        let feature_flags: Arc<DynFeatures> = features.clone();
        Self { config, features, feature_flags, scheduler: Mutex::new(None) }
    }

    /// Start the periodic refresh task.
    ///
    /// Does nothing when no override source is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler is already running or fails to start
    /// within 10 seconds.
    pub async fn start_background_refresh(&self) -> Result<()> {
        if !self.features.has_source() {
            tracing::debug!("No override source configured, background refresh not started");
            return Ok(());
        }

        let mut guard = self.scheduler.lock().await;
        let scheduler = guard.get_or_insert_with(|| {
            RefreshScheduler::new(
                Arc::clone(&self.features),
                RefreshSchedulerConfig::from(&self.config.features),
            )
        });

        // Start the scheduler with timeout (fail-fast initialization)
        tokio::time::timeout(SCHEDULER_START_TIMEOUT, scheduler.start())
            .await
            .map_err(|_| {
                tracing::error!(
                    timeout_secs = SCHEDULER_START_TIMEOUT.as_secs(),
                    "RefreshScheduler start timed out"
                );
                IvyError::Internal("RefreshScheduler start timed out after 10s".into())
            })?
            .map_err(|err| {
                tracing::error!(error = %err, "failed to start RefreshScheduler");
                IvyError::from(err)
            })
    }

    /// Whether the periodic refresh task is active.
    pub async fn is_refreshing_in_background(&self) -> bool {
        self.scheduler.lock().await.as_ref().is_some_and(RefreshScheduler::is_running)
    }

    /// Stop background work. Safe to call when nothing was started.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh task does not stop in time.
    pub async fn shutdown(&self) -> Result<()> {
        let mut guard = self.scheduler.lock().await;
        if let Some(scheduler) = guard.as_mut() {
            if scheduler.is_running() {
                scheduler.stop().await?;
            }
        }
        tracing::info!("Application context shut down");
        Ok(())
    }
}

/// Local overrides persist in SQLite when a path is configured.
fn build_store(config: &FeaturesConfig) -> Result<Arc<dyn LocalOverrideStore>> {
    match &config.local_store_path {
        Some(path) => {
            tracing::info!(path = %path, "Opening local override store");
            Ok(Arc::new(SqliteOverrideStore::open(Path::new(path))?))
        }
        None => Ok(Arc::new(InMemoryOverrideStore::new())),
    }
}

/// Combine the configured sources; later layers win (remote, file, env).
fn build_source(config: &FeaturesConfig) -> Result<Option<Arc<dyn OverrideSource>>> {
    let mut layered = LayeredOverrideSource::new();

    if let Some(url) = &config.remote_url {
        let source = HttpOverrideSource::new(url.as_str())?
            .with_timeout(Duration::from_secs(config.fetch_timeout_seconds));
        layered.push(Arc::new(source));
    }

    if let Some(path) = &config.overrides_file {
        layered.push(Arc::new(FileOverrideSource::new(path.as_str())?));
    }

    if config.env_overrides {
        layered.push(Arc::new(EnvOverrideSource::new(config.env_prefix.clone())));
    }

    Ok(match layered.len() {
        0 => None,
        _ => Some(Arc::new(layered)),
    })
}
