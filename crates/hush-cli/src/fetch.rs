//! HTTP-backed source fetcher.

use std::time::Duration;

use async_trait::async_trait;

use hush_core::{SourceError, SourceFetch};

/// Fetches source payloads over HTTP with a hard per-request timeout, so a
/// stalled source cannot suspend a synchronization pass indefinitely.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SourceError::new(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetch for HttpFetcher {
    async fn fetch_raw(&self, name: &str, url: &str) -> Result<String, SourceError> {
        tracing::debug!(source = %name, url = %url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::new(format!("{name}: {e}")))?;

        let response = response
            .error_for_status()
            .map_err(|e| SourceError::new(format!("{name}: {e}")))?;

        response
            .text()
            .await
            .map_err(|e| SourceError::new(format!("{name}: {e}")))
    }
}
