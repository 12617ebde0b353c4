//! Feature flag ports.
//!
//! `Features` is the capability every call site depends on: a synchronous,
//! infallible query over the current flag snapshot. The two async ports feed
//! that snapshot: [`OverrideSource`] supplies remotely managed values and
//! [`LocalOverrideStore`] persists values the user toggled on the device.
//!
//! # Example
//!
//! ```no_run
//! use ivy_core::{keys, Features};
//!
//! fn balance_label(features: &dyn Features, total: &str) -> String {
//!     if features.is_enabled(keys::HIDE_TOTAL_BALANCE) {
//!         "****".to_string()
//!     } else {
//!         total.to_string()
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ivy_domain::{FlagValue, Result};

use crate::features::snapshot::FlagSnapshot;

/// Flag key to value mapping produced by override layers.
pub type OverrideMap = BTreeMap<String, FlagValue>;

/// Capability interface for querying feature flags.
///
/// Implementations must answer from an in-memory snapshot: no I/O, no
/// blocking, no errors. Unknown keys resolve to disabled.
pub trait Features: Send + Sync {
    /// Whether the capability named `key` is enabled.
    ///
    /// Boolean flags return their resolved value. Variant flags are enabled
    /// when the resolved variant is anything other than the control (first)
    /// variant.
    fn is_enabled(&self, key: &str) -> bool;

    /// Current consistent view of every flag.
    ///
    /// Read several flags from one snapshot when they must agree with each
    /// other; separate `is_enabled` calls may straddle a refresh.
    fn snapshot(&self) -> Arc<FlagSnapshot>;

    /// Resolved value of `key`, or `None` if the flag is not registered.
    fn value(&self, key: &str) -> Option<FlagValue> {
        self.snapshot().get(key).map(|flag| flag.value.clone())
    }

    /// Resolved variant name of a variant flag.
    ///
    /// Returns `None` for unknown keys and for boolean flags.
    fn variant(&self, key: &str) -> Option<String> {
        self.snapshot().variant(key).map(str::to_string)
    }
}

/// Source of override values, such as a remote config service.
///
/// Fetching is independent of queries; callers swap the result into the
/// service snapshot. Failures are returned here and absorbed by the service.
#[async_trait]
pub trait OverrideSource: Send + Sync {
    /// Stable identifier used in logs.
    fn name(&self) -> &str;

    /// Fetch the complete current override set.
    ///
    /// An empty map means "no overrides", not "unchanged".
    async fn fetch_overrides(&self) -> Result<OverrideMap>;
}

/// Persistent storage for overrides set by the user on this device.
#[async_trait]
pub trait LocalOverrideStore: Send + Sync {
    /// Load every stored override.
    async fn load_all(&self) -> Result<OverrideMap>;

    /// Store (insert or replace) the override for `key`.
    async fn set(&self, key: &str, value: &FlagValue) -> Result<()>;

    /// Remove the override for `key`; returns whether one existed.
    async fn remove(&self, key: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::registry::FeatureRegistry;

    struct SnapshotOnly(Arc<FlagSnapshot>);

    impl Features for SnapshotOnly {
        fn is_enabled(&self, key: &str) -> bool {
            self.0.is_enabled(key)
        }

        fn snapshot(&self) -> Arc<FlagSnapshot> {
            Arc::clone(&self.0)
        }
    }

    /// Tests that the provided `value`/`variant` methods read from the
    /// snapshot.
    #[test]
    fn test_default_methods_use_snapshot() {
        let registry = FeatureRegistry::ivy_defaults();
        let features = SnapshotOnly(Arc::new(FlagSnapshot::defaults(&registry)));

        assert_eq!(features.value(crate::keys::DARK_MODE_V2), Some(FlagValue::Bool(false)));
        assert_eq!(features.variant(crate::keys::HOME_BALANCE_STYLE).as_deref(), Some("classic"));
        assert_eq!(features.variant(crate::keys::DARK_MODE_V2), None);
        assert_eq!(features.value("missing"), None);
    }
}
