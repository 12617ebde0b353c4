//! Snapshot resolution.
//!
//! A [`FlagSnapshot`] is the fully resolved answer for every registered flag
//! at one point in time. Snapshots are immutable; the service replaces the
//! whole snapshot on every change so readers never see a half-applied update.
//!
//! Resolution order, highest first: local override, remote override,
//! compiled-in default.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use ivy_domain::{FeatureGroup, FlagKind, FlagOrigin, FlagValue};
use serde::Serialize;
use tracing::warn;

use crate::feature_flags_ports::OverrideMap;
use crate::features::registry::{FeatureFlag, FeatureRegistry};

/// Resolved state of one flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFlag {
    pub value: FlagValue,
    pub origin: FlagOrigin,
    /// `value` collapsed to on/off
    pub enabled: bool,
}

/// Immutable, fully resolved view of all registered flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagSnapshot {
    revision: u64,
    built_at: DateTime<Utc>,
    flags: HashMap<String, ResolvedFlag>,
}

impl FlagSnapshot {
    /// Snapshot with every flag at its default (revision 0).
    pub fn defaults(registry: &FeatureRegistry) -> Self {
        Self::resolve(registry, &OverrideMap::new(), &OverrideMap::new(), 0)
    }

    /// Resolve every registered flag against the override layers.
    ///
    /// Layers are expected to be sanitized already; a value that does not fit
    /// its flag is ignored here as a last line so a snapshot can never hold an
    /// illegal value.
    pub fn resolve(
        registry: &FeatureRegistry,
        remote: &OverrideMap,
        local: &OverrideMap,
        revision: u64,
    ) -> Self {
        let flags = registry
            .iter()
            .map(|flag| {
                let (value, origin) = if let Some(value) = layer_value(local, flag) {
                    (value.clone(), FlagOrigin::Local)
                } else if let Some(value) = layer_value(remote, flag) {
                    (value.clone(), FlagOrigin::Remote)
                } else {
                    (flag.default.clone(), FlagOrigin::Default)
                };
                let enabled = flag.is_on(&value);
                (flag.key.clone(), ResolvedFlag { value, origin, enabled })
            })
            .collect();

        Self { revision, built_at: Utc::now(), flags }
    }

    /// Monotonic counter, bumped on every published change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// When this snapshot was resolved.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Resolved state of `key`, if registered.
    pub fn get(&self, key: &str) -> Option<&ResolvedFlag> {
        self.flags.get(key)
    }

    /// On/off answer for `key`; unknown keys are off.
    pub fn is_enabled(&self, key: &str) -> bool {
        self.flags.get(key).is_some_and(|flag| flag.enabled)
    }

    /// Variant name for variant flags; `None` for boolean or unknown flags.
    pub fn variant(&self, key: &str) -> Option<&str> {
        self.flags.get(key).and_then(|flag| flag.value.as_variant())
    }

    /// Number of resolved flags.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether the snapshot holds no flags.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Resolved flags in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedFlag)> {
        self.flags.iter().map(|(key, flag)| (key.as_str(), flag))
    }

    /// Keys whose resolved value differs between `self` and `other`.
    pub fn changed_keys(&self, other: &Self) -> Vec<String> {
        let mut changed: Vec<String> = self
            .flags
            .iter()
            .filter(|(key, flag)| other.flags.get(*key).map(|o| &o.value) != Some(&flag.value))
            .map(|(key, _)| key.clone())
            .collect();
        changed.sort();
        changed
    }

    /// Same resolved values as `other`, ignoring revision and origin.
    pub fn same_values(&self, other: &Self) -> bool {
        self.changed_keys(other).is_empty() && self.flags.len() == other.flags.len()
    }

    /// Same values and origins as `other`, ignoring revision and build time.
    pub fn same_resolution(&self, other: &Self) -> bool {
        self.flags == other.flags
    }
}

fn layer_value<'a>(layer: &'a OverrideMap, flag: &FeatureFlag) -> Option<&'a FlagValue> {
    layer.get(&flag.key).filter(|value| flag.accepts(value))
}

/// Why an override was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    UnknownFlag,
    KindMismatch,
    UnknownVariant,
}

/// An override that did not fit the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedOverride {
    pub key: String,
    pub value: FlagValue,
    pub reason: RejectReason,
}

/// Result of checking a raw override map against the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideReport {
    pub accepted: OverrideMap,
    pub rejected: Vec<RejectedOverride>,
}

/// Split `raw` into overrides that fit the registry and ones that do not.
///
/// Rejections are logged at warn level with the offending key.
pub fn sanitize_overrides(registry: &FeatureRegistry, raw: OverrideMap) -> OverrideReport {
    let mut report = OverrideReport::default();

    for (key, value) in raw {
        let reason = match registry.get(&key) {
            None => Some(RejectReason::UnknownFlag),
            Some(flag) if flag.accepts(&value) => None,
            Some(flag) if flag.kind() == value.kind() => Some(RejectReason::UnknownVariant),
            Some(_) => Some(RejectReason::KindMismatch),
        };

        match reason {
            None => {
                report.accepted.insert(key, value);
            }
            Some(reason) => {
                warn!(flag_key = %key, value = %value, ?reason, "Ignoring feature override");
                report.rejected.push(RejectedOverride { key, value, reason });
            }
        }
    }

    report
}

/// Registry metadata joined with the resolved state, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagState {
    pub key: String,
    pub name: String,
    pub description: String,
    pub group: FeatureGroup,
    pub kind: FlagKind,
    pub default: FlagValue,
    pub variants: Vec<String>,
    pub value: FlagValue,
    pub origin: FlagOrigin,
    pub enabled: bool,
}

impl FlagState {
    /// Every registered flag, ordered by group then key.
    pub fn collect(registry: &FeatureRegistry, snapshot: &FlagSnapshot) -> Vec<Self> {
        let mut states: Vec<Self> = registry
            .iter()
            .map(|flag| {
                let (value, origin, enabled) = snapshot.get(&flag.key).map_or_else(
                    || (flag.default.clone(), FlagOrigin::Default, flag.is_on(&flag.default)),
                    |resolved| (resolved.value.clone(), resolved.origin, resolved.enabled),
                );
                Self {
                    key: flag.key.clone(),
                    name: flag.name.clone(),
                    description: flag.description.clone(),
                    group: flag.group,
                    kind: flag.kind(),
                    default: flag.default.clone(),
                    variants: flag.variants.clone(),
                    value,
                    origin,
                    enabled,
                }
            })
            .collect();
        states.sort_by(|a, b| a.group.cmp(&b.group).then_with(|| a.key.cmp(&b.key)));
        states
    }
}
