//! File-backed override source
//!
//! The file is re-read on every fetch so edits take effect on the next
//! refresh. Format follows the extension: `.toml` or `.json`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ivy_core::{OverrideMap, OverrideSource};
use ivy_domain::{IvyError, Result};

use super::OverrideDocument;
use crate::errors::to_ivy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Toml,
    Json,
}

/// Override source reading an [`OverrideDocument`] from disk.
#[derive(Debug, Clone)]
pub struct FileOverrideSource {
    path: PathBuf,
    format: FileFormat,
}

impl FileOverrideSource {
    /// # Errors
    /// Returns `IvyError::Config` if the extension is neither `toml` nor
    /// `json`. The file itself need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("json") => FileFormat::Json,
            other => {
                return Err(IvyError::Config(format!(
                    "unsupported override file format {:?} for {}",
                    other.unwrap_or(""),
                    path.display()
                )))
            }
        };
        Ok(Self { path, format })
    }

    /// File read on every fetch.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, contents: &str) -> Result<OverrideDocument> {
        match self.format {
            FileFormat::Toml => toml::from_str(contents).map_err(to_ivy),
            FileFormat::Json => serde_json::from_str(contents).map_err(to_ivy),
        }
    }
}

#[async_trait]
impl OverrideSource for FileOverrideSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch_overrides(&self) -> Result<OverrideMap> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(to_ivy)?;
        let document = self.parse(&contents)?;

        tracing::debug!(
            path = %self.path.display(),
            version = ?document.version,
            flag_count = document.flags.len(),
            "Override file read"
        );
        Ok(document.flags)
    }
}
