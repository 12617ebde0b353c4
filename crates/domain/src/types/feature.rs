//! Feature flag value types
//!
//! A flag resolves either to a boolean or to one entry of a small, closed set
//! of named variants. Values travel as plain JSON/TOML scalars (`true`,
//! `"compact"`), so `FlagValue` is serialized untagged.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::impl_domain_label_conversions;

/// Resolved or overriding value of a feature flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// On/off switch
    Bool(bool),
    /// Named variant out of the flag's declared variant list
    Variant(String),
}

impl FlagValue {
    /// Parse a loosely typed string (environment variables, CLI arguments).
    ///
    /// `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive) are
    /// booleans; anything else is taken as a variant name.
    pub fn parse_lenient(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Self::Bool(true),
            "0" | "false" | "no" | "off" => Self::Bool(false),
            _ => Self::Variant(trimmed.to_string()),
        }
    }

    /// The boolean payload, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Variant(_) => None,
        }
    }

    /// The variant name, if this is a variant value.
    pub fn as_variant(&self) -> Option<&str> {
        match self {
            Self::Bool(_) => None,
            Self::Variant(name) => Some(name),
        }
    }

    /// Kind of flag this value belongs to.
    pub fn kind(&self) -> FlagKind {
        match self {
            Self::Bool(_) => FlagKind::Boolean,
            Self::Variant(_) => FlagKind::Variant,
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Variant(name) => f.write_str(name),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        Self::Variant(value.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        Self::Variant(value)
    }
}

/// Shape of a flag's value space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagKind {
    Boolean,
    Variant,
}

impl_domain_label_conversions!(FlagKind {
    Boolean => "boolean",
    Variant => "variant",
});

/// Settings area a flag belongs to; drives ordering in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureGroup {
    Account,
    Category,
    Transaction,
    Display,
    Other,
}

impl_domain_label_conversions!(FeatureGroup {
    Account => "account",
    Category => "category",
    Transaction => "transaction",
    Display => "display",
    Other => "other",
});

/// Which layer produced a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagOrigin {
    /// Compiled-in default from the registry
    Default,
    /// Value fetched from an override source
    Remote,
    /// Value set locally by the user
    Local,
}

impl_domain_label_conversions!(FlagOrigin {
    Default => "default",
    Remote => "remote",
    Local => "local",
});
