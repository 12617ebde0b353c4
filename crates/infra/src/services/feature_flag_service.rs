//! Ivy feature flag service.
//!
//! Answers `is_enabled` from an immutable [`FlagSnapshot`] held behind an
//! `Arc`. Every change (remote refresh, local toggle, staleness expiry)
//! rebuilds a complete snapshot and swaps it in with a single assignment, so
//! readers see either the old or the new flag set and never a mix.
//!
//! # Layers
//!
//! Resolution order, highest first:
//! 1. **Local** overrides persisted through [`LocalOverrideStore`]
//! 2. **Remote** overrides pulled from the [`OverrideSource`]
//! 3. Compiled-in defaults from the [`FeatureRegistry`]
//!
//! Overrides that do not fit the registry are dropped when they enter a
//! layer, never at query time.
//!
//! # Failure handling
//!
//! - A failed or timed-out refresh keeps the previous remote layer
//! - With `max_staleness` set, a remote layer older than that is discarded
//!   on the next failed refresh and flags fall back to their defaults
//! - Queries never fail; unknown keys are disabled
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ivy_core::{keys, FeatureRegistry, Features};
//! use ivy_infra::services::IvyFeatures;
//! use ivy_infra::sources::HttpOverrideSource;
//!
//! # async fn example() -> ivy_domain::Result<()> {
//! let source = HttpOverrideSource::new("https://flags.example.com/ivy.json")?;
//! let features = IvyFeatures::new(Arc::new(FeatureRegistry::ivy_defaults()))
//!     .with_source(Arc::new(source));
//!
//! features.refresh().await;
//! if features.is_enabled(keys::DARK_MODE_V2) {
//!     // render the new theme
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ivy_core::{
    sanitize_overrides, FeatureRegistry, Features, FlagSnapshot, FlagState, LocalOverrideStore,
    OverrideMap, OverrideSource,
};
use ivy_domain::constants::DEFAULT_FETCH_TIMEOUT_SECS;
use ivy_domain::{FeaturesConfig, FlagValue, IvyError, Result};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::database::InMemoryOverrideStore;

/// Tuning knobs for [`IvyFeatures`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IvyFeaturesOptions {
    /// Upper bound for a single `fetch_overrides` call
    pub fetch_timeout: Duration,
    /// Age after which the remote layer is discarded; `None` keeps it forever
    pub max_staleness: Option<Duration>,
}

impl Default for IvyFeaturesOptions {
    fn default() -> Self {
        Self { fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS), max_staleness: None }
    }
}

impl From<&FeaturesConfig> for IvyFeaturesOptions {
    fn from(config: &FeaturesConfig) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(config.fetch_timeout_seconds),
            max_staleness: config.max_staleness_seconds.map(Duration::from_secs),
        }
    }
}

/// What a call to [`IvyFeatures::refresh`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// A new snapshot was published
    Applied { revision: u64, changed: Vec<String> },
    /// Fetch succeeded but nothing changed, or no source is configured
    Unchanged,
    /// Fetch failed; the previous remote layer is still in effect
    Failed { reason: String },
    /// Fetch failed and the remote layer was past `max_staleness`, so it was
    /// dropped
    Expired,
}

impl RefreshOutcome {
    /// Whether the refresh did not apply fresh values.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Expired)
    }
}

/// Bookkeeping about recent refreshes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshStatus {
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

#[derive(Debug, Default)]
struct Layers {
    remote: OverrideMap,
    local: OverrideMap,
    remote_fetched_at: Option<Instant>,
}

/// Snapshot-backed implementation of [`Features`].
pub struct IvyFeatures {
    registry: Arc<FeatureRegistry>,
    source: Option<Arc<dyn OverrideSource>>,
    store: Arc<dyn LocalOverrideStore>,
    options: IvyFeaturesOptions,
    current: RwLock<Arc<FlagSnapshot>>,
    // Serializes writers; held across store writes so the store and the
    // local layer cannot diverge.
    layers: AsyncMutex<Layers>,
    // Held from fetch to publish so overlapping refreshes apply in order.
    refresh_lock: AsyncMutex<()>,
    status: Mutex<RefreshStatus>,
    changes: watch::Sender<Arc<FlagSnapshot>>,
}

impl IvyFeatures {
    /// Service with every flag at its default, no override source and an
    /// in-memory local store.
    pub fn new(registry: Arc<FeatureRegistry>) -> Self {
        let initial = Arc::new(FlagSnapshot::defaults(&registry));
        let (changes, _) = watch::channel(Arc::clone(&initial));

        Self {
            registry,
            source: None,
            store: Arc::new(InMemoryOverrideStore::new()),
            options: IvyFeaturesOptions::default(),
            current: RwLock::new(initial),
            layers: AsyncMutex::new(Layers::default()),
            refresh_lock: AsyncMutex::new(()),
            status: Mutex::new(RefreshStatus::default()),
            changes,
        }
    }

    /// Pull remote overrides from `source` on [`refresh`](Self::refresh).
    pub fn with_source(mut self, source: Arc<dyn OverrideSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Persist local overrides in `store`.
    pub fn with_store(mut self, store: Arc<dyn LocalOverrideStore>) -> Self {
        self.store = store;
        self
    }

    /// Override fetch timeout and staleness settings.
    pub fn with_options(mut self, options: IvyFeaturesOptions) -> Self {
        self.options = options;
        self
    }

    /// Flags this service resolves.
    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    /// Current tuning options.
    pub fn options(&self) -> IvyFeaturesOptions {
        self.options
    }

    /// Whether an override source is configured.
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Pull overrides from the source and publish the result.
    ///
    /// Never returns an error: failures are logged, counted in
    /// [`last_refresh`](Self::last_refresh) and leave the previous values in
    /// place (subject to `max_staleness`). Concurrent calls run one after
    /// another, so a slow fetch never overwrites a newer one.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(source) = self.source.as_ref() else {
            debug!("No override source configured, nothing to refresh");
            return RefreshOutcome::Unchanged;
        };

        let _refreshing = self.refresh_lock.lock().await;

        let fetched =
            match tokio::time::timeout(self.options.fetch_timeout, source.fetch_overrides()).await
            {
                Ok(result) => result,
                Err(_) => Err(IvyError::Network(format!(
                    "override fetch timed out after {}ms",
                    self.options.fetch_timeout.as_millis()
                ))),
            };

        match fetched {
            Ok(raw) => self.apply_remote(source.name(), raw).await,
            Err(err) => self.handle_failure(source.name(), &err).await,
        }
    }

    async fn apply_remote(&self, source: &str, raw: OverrideMap) -> RefreshOutcome {
        let report = sanitize_overrides(&self.registry, raw);

        let mut layers = self.layers.lock().await;
        layers.remote = report.accepted;
        layers.remote_fetched_at = Some(Instant::now());
        self.status.lock().record_success();

        match self.publish(&layers) {
            Some((revision, changed)) => {
                info!(
                    source,
                    revision,
                    changed = ?changed,
                    rejected = report.rejected.len(),
                    "Feature overrides refreshed"
                );
                RefreshOutcome::Applied { revision, changed }
            }
            None => {
                debug!(source, rejected = report.rejected.len(), "Feature overrides unchanged");
                RefreshOutcome::Unchanged
            }
        }
    }

    async fn handle_failure(&self, source: &str, err: &IvyError) -> RefreshOutcome {
        let failures = self.status.lock().record_failure(err);
        warn!(
            source,
            error = %err,
            consecutive_failures = failures,
            "Feature override refresh failed, keeping last known values"
        );

        let mut layers = self.layers.lock().await;
        let expired = match (self.options.max_staleness, layers.remote_fetched_at) {
            (Some(max), Some(fetched_at)) => fetched_at.elapsed() > max,
            _ => false,
        };
        if !expired {
            return RefreshOutcome::Failed { reason: err.to_string() };
        }

        layers.remote.clear();
        layers.remote_fetched_at = None;
        let revision = self.publish(&layers).map(|(revision, _)| revision);
        warn!(source, ?revision, "Remote feature overrides expired, reverting to defaults");
        RefreshOutcome::Expired
    }

    /// Seed the local layer from the store.
    ///
    /// Store failures are logged and leave the local layer as it was.
    /// Returns the number of overrides that were accepted.
    pub async fn load_local_overrides(&self) -> usize {
        let stored = match self.store.load_all().await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "Failed to load local feature overrides");
                return 0;
            }
        };

        let report = sanitize_overrides(&self.registry, stored);
        let accepted = report.accepted.len();

        let mut layers = self.layers.lock().await;
        layers.local = report.accepted;
        self.publish(&layers);

        info!(accepted, rejected = report.rejected.len(), "Local feature overrides loaded");
        accepted
    }

    /// Persist a user override for `key` and apply it immediately.
    ///
    /// # Errors
    /// - `IvyError::NotFound` if `key` is not registered
    /// - `IvyError::InvalidInput` if `value` does not fit the flag
    /// - Storage errors from the local store; the flag is left unchanged
    pub async fn set_local_override(&self, key: &str, value: FlagValue) -> Result<()> {
        self.registry.check_value(key, &value)?;

        let mut layers = self.layers.lock().await;
        self.store.set(key, &value).await?;
        info!(flag_key = %key, value = %value, "Local feature override set");
        layers.local.insert(key.to_string(), value);
        self.publish(&layers);
        Ok(())
    }

    /// Remove the user override for `key`, revealing the remote or default
    /// value. Clearing a flag without an override is a no-op.
    ///
    /// # Errors
    /// `IvyError::NotFound` for unregistered keys, or a storage error.
    pub async fn clear_local_override(&self, key: &str) -> Result<()> {
        if !self.registry.contains(key) {
            return Err(IvyError::NotFound(format!("feature flag '{key}'")));
        }

        let mut layers = self.layers.lock().await;
        let existed = self.store.remove(key).await?;
        layers.local.remove(key);
        self.publish(&layers);

        if existed {
            info!(flag_key = %key, "Local feature override cleared");
        } else {
            debug!(flag_key = %key, "No local feature override to clear");
        }
        Ok(())
    }

    /// Receive every published snapshot, starting with the current one.
    pub fn subscribe(&self) -> watch::Receiver<Arc<FlagSnapshot>> {
        self.changes.subscribe()
    }

    /// Registry metadata joined with the current resolution.
    pub fn list(&self) -> Vec<FlagState> {
        FlagState::collect(&self.registry, &self.snapshot())
    }

    /// Success and failure bookkeeping of past refreshes.
    pub fn last_refresh(&self) -> RefreshStatus {
        self.status.lock().clone()
    }

    /// Rebuild the snapshot from `layers` and swap it in.
    ///
    /// Returns the new revision and the keys whose value changed, or `None`
    /// when the resolution is identical to the current one.
    fn publish(&self, layers: &Layers) -> Option<(u64, Vec<String>)> {
        let current = self.snapshot();
        let next = FlagSnapshot::resolve(
            &self.registry,
            &layers.remote,
            &layers.local,
            current.revision() + 1,
        );
        if next.same_resolution(&current) {
            return None;
        }

        let changed = next.changed_keys(&current);
        let revision = next.revision();
        let next = Arc::new(next);
        *self.current.write() = Arc::clone(&next);
        self.changes.send_replace(next);
        Some((revision, changed))
    }
}

impl Features for IvyFeatures {
    fn is_enabled(&self, key: &str) -> bool {
        self.current.read().is_enabled(key)
    }

    fn snapshot(&self) -> Arc<FlagSnapshot> {
        Arc::clone(&self.current.read())
    }

    fn value(&self, key: &str) -> Option<FlagValue> {
        self.current.read().get(key).map(|flag| flag.value.clone())
    }

    fn variant(&self, key: &str) -> Option<String> {
        self.current.read().variant(key).map(str::to_string)
    }
}

impl RefreshStatus {
    fn record_success(&mut self) {
        self.last_success = Some(Utc::now());
        self.last_error = None;
        self.consecutive_failures = 0;
    }

    fn record_failure(&mut self, err: &IvyError) -> u32 {
        self.last_failure = Some(Utc::now());
        self.last_error = Some(err.to_string());
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for services::feature_flag_service.
    use ivy_core::keys;
    use ivy_domain::FlagOrigin;

    use super::*;
    use crate::sources::StaticOverrideSource;

    fn service_with(source: Arc<StaticOverrideSource>) -> IvyFeatures {
        IvyFeatures::new(Arc::new(FeatureRegistry::ivy_defaults())).with_source(source)
    }

    /// Tests the dark_mode_v2 rollout: off by default, on once the source
    /// says so.
    #[tokio::test]
    async fn test_dark_mode_rollout() {
        let source = Arc::new(StaticOverrideSource::default());
        let features = service_with(Arc::clone(&source));

        assert!(!features.is_enabled(keys::DARK_MODE_V2));

        source.set(keys::DARK_MODE_V2, true);
        let outcome = features.refresh().await;

        assert_eq!(
            outcome,
            RefreshOutcome::Applied { revision: 1, changed: vec![keys::DARK_MODE_V2.to_string()] }
        );
        assert!(features.is_enabled(keys::DARK_MODE_V2));
    }

    #[tokio::test]
    async fn test_refresh_without_source_is_unchanged() {
        let features = IvyFeatures::new(Arc::new(FeatureRegistry::ivy_defaults()));
        assert!(!features.has_source());
        assert_eq!(features.refresh().await, RefreshOutcome::Unchanged);
        assert_eq!(features.snapshot().revision(), 0);
    }

    #[tokio::test]
    async fn test_identical_refresh_keeps_revision() {
        let source = Arc::new(StaticOverrideSource::from_pairs([(keys::HIDE_TOTAL_BALANCE, true)]));
        let features = service_with(source);

        assert!(matches!(features.refresh().await, RefreshOutcome::Applied { revision: 1, .. }));
        assert_eq!(features.refresh().await, RefreshOutcome::Unchanged);
        assert_eq!(features.snapshot().revision(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_known_good() {
        let source = Arc::new(StaticOverrideSource::from_pairs([(keys::DARK_MODE_V2, true)]));
        let features = service_with(Arc::clone(&source));
        features.refresh().await;

        source.fail_with("connection reset");
        let outcome = features.refresh().await;

        assert!(matches!(outcome, RefreshOutcome::Failed { reason } if reason.contains("connection reset")));
        assert!(features.is_enabled(keys::DARK_MODE_V2));

        let status = features.last_refresh();
        assert_eq!(status.consecutive_failures, 1);
        assert!(status.last_success.is_some());
        assert!(status.last_failure.is_some());
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let source = Arc::new(StaticOverrideSource::default());
        let features = service_with(Arc::clone(&source));

        source.fail_with("down");
        features.refresh().await;
        features.refresh().await;
        assert_eq!(features.last_refresh().consecutive_failures, 2);

        source.recover();
        features.refresh().await;
        let status = features.last_refresh();
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.last_error, None);
    }

    #[tokio::test]
    async fn test_invalid_overrides_are_dropped() {
        let source = Arc::new(StaticOverrideSource::from_pairs([
            (keys::DARK_MODE_V2, FlagValue::from("definitely")),
            (keys::HOME_BALANCE_STYLE, FlagValue::from("neon")),
            ("unregistered", FlagValue::Bool(true)),
        ]));
        let features = service_with(source);

        assert_eq!(features.refresh().await, RefreshOutcome::Unchanged);
        assert!(!features.is_enabled(keys::DARK_MODE_V2));
        assert_eq!(features.variant(keys::HOME_BALANCE_STYLE).as_deref(), Some("classic"));
        assert!(!features.is_enabled("unregistered"));
    }

    #[tokio::test]
    async fn test_local_override_beats_remote_until_cleared() {
        let source = Arc::new(StaticOverrideSource::from_pairs([(keys::DARK_MODE_V2, true)]));
        let features = service_with(source);
        features.refresh().await;

        features.set_local_override(keys::DARK_MODE_V2, FlagValue::Bool(false)).await.unwrap();
        assert!(!features.is_enabled(keys::DARK_MODE_V2));
        assert_eq!(features.snapshot().get(keys::DARK_MODE_V2).unwrap().origin, FlagOrigin::Local);

        features.clear_local_override(keys::DARK_MODE_V2).await.unwrap();
        assert!(features.is_enabled(keys::DARK_MODE_V2));
        assert_eq!(features.snapshot().get(keys::DARK_MODE_V2).unwrap().origin, FlagOrigin::Remote);
    }

    #[tokio::test]
    async fn test_set_local_override_validates() {
        let features = IvyFeatures::new(Arc::new(FeatureRegistry::ivy_defaults()));

        let unknown = features.set_local_override("nope", FlagValue::Bool(true)).await;
        assert!(matches!(unknown, Err(IvyError::NotFound(_))));

        let mismatch =
            features.set_local_override(keys::HOME_BALANCE_STYLE, FlagValue::Bool(true)).await;
        assert!(matches!(mismatch, Err(IvyError::InvalidInput(_))));

        assert!(matches!(features.clear_local_override("nope").await, Err(IvyError::NotFound(_))));
        assert_eq!(features.snapshot().revision(), 0);
    }

    #[tokio::test]
    async fn test_load_local_overrides_from_store() {
        let stored: OverrideMap = [
            (keys::COMPACT_ACCOUNTS_MODE.to_string(), FlagValue::Bool(true)),
            ("retired_flag".to_string(), FlagValue::Bool(true)),
        ]
        .into();
        let store = Arc::new(InMemoryOverrideStore::with_overrides(stored));
        let features =
            IvyFeatures::new(Arc::new(FeatureRegistry::ivy_defaults())).with_store(store);

        assert_eq!(features.load_local_overrides().await, 1);
        assert!(features.is_enabled(keys::COMPACT_ACCOUNTS_MODE));
    }

    #[tokio::test]
    async fn test_subscribers_see_published_snapshots() {
        let source = Arc::new(StaticOverrideSource::default());
        let features = service_with(Arc::clone(&source));
        let mut changes = features.subscribe();
        assert_eq!(changes.borrow().revision(), 0);

        source.set(keys::SHOW_CATEGORY_SEARCH_BAR, true);
        features.refresh().await;

        changes.changed().await.unwrap();
        let latest = changes.borrow_and_update().clone();
        assert_eq!(latest.revision(), 1);
        assert!(latest.is_enabled(keys::SHOW_CATEGORY_SEARCH_BAR));
    }

    #[tokio::test]
    async fn test_list_reports_origin() {
        let source = Arc::new(StaticOverrideSource::from_pairs([(keys::HOME_BALANCE_STYLE, "compact")]));
        let features = service_with(source);
        features.refresh().await;

        let listed = features.list();
        assert_eq!(listed.len(), features.registry().len());
        let style = listed.iter().find(|state| state.key == keys::HOME_BALANCE_STYLE).unwrap();
        assert_eq!(style.value, FlagValue::from("compact"));
        assert_eq!(style.origin, FlagOrigin::Remote);
        assert!(style.enabled);
    }

    /// Serves a different document per call; the first call is slow.
    struct SequencedSource {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl OverrideSource for SequencedSource {
        fn name(&self) -> &str {
            "sequenced"
        }

        async fn fetch_overrides(&self) -> Result<OverrideMap> {
            let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let style = if call == 0 {
                tokio::time::sleep(Duration::from_millis(200)).await;
                "compact"
            } else {
                "hidden"
            };
            Ok([(keys::HOME_BALANCE_STYLE.to_string(), FlagValue::from(style))].into())
        }
    }

    /// Tests that a slow refresh started first cannot overwrite the result of
    /// a refresh started after it.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_overlapping_refreshes_apply_in_order() {
        let source = Arc::new(SequencedSource { calls: Default::default() });
        let features = Arc::new(
            IvyFeatures::new(Arc::new(FeatureRegistry::ivy_defaults())).with_source(source),
        );

        let first = tokio::spawn({
            let features = Arc::clone(&features);
            async move { features.refresh().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = tokio::spawn({
            let features = Arc::clone(&features);
            async move { features.refresh().await }
        });

        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(features.variant(keys::HOME_BALANCE_STYLE).as_deref(), Some("hidden"));
        assert_eq!(features.snapshot().revision(), 2);
    }

    #[test]
    fn test_options_from_config() {
        let config = FeaturesConfig {
            fetch_timeout_seconds: 3,
            max_staleness_seconds: Some(600),
            ..FeaturesConfig::default()
        };
        let options = IvyFeaturesOptions::from(&config);
        assert_eq!(options.fetch_timeout, Duration::from_secs(3));
        assert_eq!(options.max_staleness, Some(Duration::from_secs(600)));
    }
}
