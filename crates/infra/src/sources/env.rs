//! Environment-variable override source
//!
//! `IVY_FEATURE_DARK_MODE_V2=on` overrides `dark_mode_v2`. Values are parsed
//! with [`FlagValue::parse_lenient`].

use async_trait::async_trait;
use ivy_core::{OverrideMap, OverrideSource};
use ivy_domain::constants::DEFAULT_ENV_OVERRIDE_PREFIX;
use ivy_domain::{FlagValue, Result};

#[derive(Debug, Clone)]
pub struct EnvOverrideSource {
    prefix: String,
}

impl EnvOverrideSource {
    /// Source reading variables that start with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Variable name prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Collect overrides from an arbitrary variable list.
    pub fn collect<I, K, V>(&self, vars: I) -> OverrideMap
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        vars.into_iter()
            .filter_map(|(name, value)| {
                let key = name.as_ref().strip_prefix(&self.prefix)?;
                if key.is_empty() {
                    return None;
                }
                Some((key.to_ascii_lowercase(), FlagValue::parse_lenient(value.as_ref())))
            })
            .collect()
    }
}

impl Default for EnvOverrideSource {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_OVERRIDE_PREFIX)
    }
}

#[async_trait]
impl OverrideSource for EnvOverrideSource {
    fn name(&self) -> &str {
        "env"
    }

    async fn fetch_overrides(&self) -> Result<OverrideMap> {
        Ok(self.collect(std::env::vars()))
    }
}
