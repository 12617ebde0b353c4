//! Static registry of known feature flags.
//!
//! The flag set is fixed at process start. Overrides can only change the
//! value of a registered flag, never introduce a new one.

use std::collections::BTreeMap;

use ivy_domain::{FeatureGroup, FlagKind, FlagValue, IvyError, Result};
use serde::Serialize;

/// Keys of the flags shipped with Ivy.
pub mod keys {
    pub const SORT_CATEGORIES_ALPHABETICALLY: &str = "sort_categories_alphabetically";
    pub const COMPACT_ACCOUNTS_MODE: &str = "compact_accounts_mode";
    pub const COMPACT_CATEGORIES_MODE: &str = "compact_categories_mode";
    pub const SHOW_TITLE_SUGGESTIONS: &str = "show_title_suggestions";
    pub const SHOW_CATEGORY_SEARCH_BAR: &str = "show_category_search_bar";
    pub const HIDE_TOTAL_BALANCE: &str = "hide_total_balance";
    pub const SHOW_DECIMAL_NUMBER: &str = "show_decimal_number";
    pub const INCLUDE_TRANSFERS_IN_CATEGORY: &str = "include_transfers_in_category";
    pub const DARK_MODE_V2: &str = "dark_mode_v2";
    pub const HOME_BALANCE_STYLE: &str = "home_balance_style";
}

/// Feature flag definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureFlag {
    /// Stable identifier (e.g., "dark_mode_v2")
    pub key: String,
    /// Human-readable name shown in settings
    pub name: String,
    pub description: String,
    pub group: FeatureGroup,
    /// Compiled-in value used when no override applies
    pub default: FlagValue,
    /// Closed variant set for variant flags; empty for boolean flags.
    /// The first entry is the control position.
    pub variants: Vec<String>,
}

impl FeatureFlag {
    /// Define an on/off flag.
    pub fn boolean(
        key: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        group: FeatureGroup,
        default: bool,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: description.into(),
            group,
            default: FlagValue::Bool(default),
            variants: Vec::new(),
        }
    }

    /// Define a flag choosing among `variants`; `variants[0]` is the control.
    pub fn variant(
        key: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        group: FeatureGroup,
        variants: &[&str],
        default: &str,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: description.into(),
            group,
            default: FlagValue::Variant(default.to_string()),
            variants: variants.iter().map(|v| (*v).to_string()).collect(),
        }
    }

    /// Boolean or variant, derived from the default value.
    pub fn kind(&self) -> FlagKind {
        self.default.kind()
    }

    /// Whether `value` is a legal value for this flag.
    pub fn accepts(&self, value: &FlagValue) -> bool {
        match (self.kind(), value) {
            (FlagKind::Boolean, FlagValue::Bool(_)) => true,
            (FlagKind::Variant, FlagValue::Variant(name)) => self.variants.contains(name),
            _ => false,
        }
    }

    /// Collapse a value of this flag into the on/off answer of `is_enabled`.
    pub fn is_on(&self, value: &FlagValue) -> bool {
        match value {
            FlagValue::Bool(enabled) => *enabled,
            FlagValue::Variant(name) => self.variants.first().is_some_and(|control| control != name),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(IvyError::InvalidInput("feature flag key must not be empty".into()));
        }
        if self.kind() == FlagKind::Variant {
            if self.variants.is_empty() {
                return Err(IvyError::InvalidInput(format!(
                    "variant flag '{}' declares no variants",
                    self.key
                )));
            }
            if !self.accepts(&self.default) {
                return Err(IvyError::InvalidInput(format!(
                    "default '{}' of flag '{}' is not one of its variants",
                    self.default, self.key
                )));
            }
        } else if !self.variants.is_empty() {
            return Err(IvyError::InvalidInput(format!(
                "boolean flag '{}' must not declare variants",
                self.key
            )));
        }
        Ok(())
    }
}

/// Immutable set of registered flags, keyed by flag key.
#[derive(Debug, Clone, Default)]
pub struct FeatureRegistry {
    flags: BTreeMap<String, FeatureFlag>,
}

impl FeatureRegistry {
    /// Build a registry, rejecting duplicate or malformed definitions.
    ///
    /// # Errors
    /// Returns `IvyError::InvalidInput` if a key is empty or repeated, or a
    /// variant flag's default is not one of its variants.
    pub fn new(flags: impl IntoIterator<Item = FeatureFlag>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for flag in flags {
            flag.validate()?;
            if map.contains_key(&flag.key) {
                return Err(IvyError::InvalidInput(format!(
                    "feature flag '{}' registered twice",
                    flag.key
                )));
            }
            map.insert(flag.key.clone(), flag);
        }
        Ok(Self { flags: map })
    }

    /// Registry holding Ivy's built-in flags.
    pub fn ivy_defaults() -> Self {
        let flags = ivy_default_flags().into_iter().map(|flag| (flag.key.clone(), flag)).collect();
        Self { flags }
    }

    /// Definition of `key`, if registered.
    pub fn get(&self, key: &str) -> Option<&FeatureFlag> {
        self.flags.get(key)
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.flags.contains_key(key)
    }

    /// Number of registered flags.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether no flag is registered.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Flags in key order.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureFlag> {
        self.flags.values()
    }

    /// Check that `value` may be assigned to `key`.
    ///
    /// # Errors
    /// `IvyError::NotFound` for unregistered keys, `IvyError::InvalidInput`
    /// when the value does not fit the flag.
    pub fn check_value(&self, key: &str, value: &FlagValue) -> Result<&FeatureFlag> {
        let flag = self
            .get(key)
            .ok_or_else(|| IvyError::NotFound(format!("feature flag '{key}'")))?;
        if !flag.accepts(value) {
            return Err(IvyError::InvalidInput(format!(
                "value '{value}' is not valid for {} flag '{key}'",
                flag.kind()
            )));
        }
        Ok(flag)
    }
}

/// Definitions of Ivy's built-in flags.
pub fn ivy_default_flags() -> Vec<FeatureFlag> {
    vec![
        FeatureFlag::boolean(
            keys::SORT_CATEGORIES_ALPHABETICALLY,
            "Sort categories alphabetically",
            "Sort income and expense categories alphabetically",
            FeatureGroup::Category,
            false,
        ),
        FeatureFlag::boolean(
            keys::COMPACT_ACCOUNTS_MODE,
            "Compact account mode",
            "Make the accounts tab UI more compact",
            FeatureGroup::Account,
            false,
        ),
        FeatureFlag::boolean(
            keys::COMPACT_CATEGORIES_MODE,
            "Compact category mode",
            "Make the categories screen UI more compact",
            FeatureGroup::Category,
            false,
        ),
        FeatureFlag::boolean(
            keys::SHOW_TITLE_SUGGESTIONS,
            "Show previous title suggestions",
            "Suggest titles from earlier transactions while typing",
            FeatureGroup::Transaction,
            true,
        ),
        FeatureFlag::boolean(
            keys::SHOW_CATEGORY_SEARCH_BAR,
            "Category search bar",
            "Show a search bar on the categories screen",
            FeatureGroup::Category,
            false,
        ),
        FeatureFlag::boolean(
            keys::HIDE_TOTAL_BALANCE,
            "Hide total balance",
            "Hide the total balance on the accounts tab",
            FeatureGroup::Account,
            false,
        ),
        FeatureFlag::boolean(
            keys::SHOW_DECIMAL_NUMBER,
            "Show decimal numbers",
            "Show the decimal part of amounts",
            FeatureGroup::Display,
            true,
        ),
        FeatureFlag::boolean(
            keys::INCLUDE_TRANSFERS_IN_CATEGORY,
            "Include transfers in category",
            "Count transfers towards category totals",
            FeatureGroup::Category,
            false,
        ),
        FeatureFlag::boolean(
            keys::DARK_MODE_V2,
            "Dark mode v2",
            "Use the redesigned dark theme",
            FeatureGroup::Display,
            false,
        ),
        FeatureFlag::variant(
            keys::HOME_BALANCE_STYLE,
            "Home balance style",
            "Layout of the balance header on the home tab",
            FeatureGroup::Display,
            &["classic", "compact", "hidden"],
            "classic",
        ),
    ]
}
