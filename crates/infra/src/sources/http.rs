//! Remote override source
//!
//! Fetches the override document over HTTP(S).

use std::time::Duration;

use async_trait::async_trait;
use ivy_core::{OverrideMap, OverrideSource};
use ivy_domain::constants::DEFAULT_FETCH_TIMEOUT_SECS;
use ivy_domain::{IvyError, Result};

use super::OverrideDocument;
use crate::errors::to_ivy;

/// Client for the remote override endpoint
pub struct HttpOverrideSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpOverrideSource {
    /// Create a source for `url` with the default request timeout.
    ///
    /// # Errors
    /// Returns `IvyError::Config` if the URL is malformed or not http(s), or
    /// the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();

        let parsed = url::Url::parse(&url)
            .map_err(|e| IvyError::Config(format!("invalid remote override URL '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(IvyError::Config(format!(
                "remote override URL must be http(s), got '{}'",
                parsed.scheme()
            )));
        }

        let timeout = Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| IvyError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, url, timeout })
    }

    /// Set custom timeout for HTTP requests
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint the document is fetched from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and decode the full override document.
    ///
    /// # Errors
    /// - `IvyError::Network` for transport failures, timeouts and 5xx
    /// - `IvyError::Remote` for other non-2xx statuses and undecodable bodies
    /// - `IvyError::NotFound` for 404
    pub async fn fetch_document(&self) -> Result<OverrideDocument> {
        tracing::debug!(url = %self.url, "Fetching remote feature overrides");

        let response =
            self.client.get(&self.url).timeout(self.timeout).send().await.map_err(to_ivy)?;
        let response = response.error_for_status().map_err(to_ivy)?;
        let document: OverrideDocument = response.json().await.map_err(to_ivy)?;

        tracing::info!(
            url = %self.url,
            version = ?document.version,
            flag_count = document.flags.len(),
            "Remote feature overrides fetched"
        );
        Ok(document)
    }
}

#[async_trait]
impl OverrideSource for HttpOverrideSource {
    fn name(&self) -> &str {
        "remote"
    }

    async fn fetch_overrides(&self) -> Result<OverrideMap> {
        Ok(self.fetch_document().await?.flags)
    }
}
