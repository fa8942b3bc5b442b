//! Download collaborator

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::FetchError;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;
pub const DEFAULT_FETCH_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Fetches dataset packages and metadata documents
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Download `url` to `path`, returning the number of bytes written
    async fn fetch_to_file(&self, url: &str, path: &Path) -> Result<u64, FetchError>;

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    pub timeout_secs: u64,
    /// Total attempts per request, including the first
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            max_attempts: DEFAULT_FETCH_ATTEMPTS,
            retry_delay: DEFAULT_FETCH_RETRY_DELAY,
            user_agent: format!("SOS-Harvest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// reqwest-based fetcher with bounded retries
pub struct HttpFileFetcher {
    client: Client,
    config: HttpFetcherConfig,
}

impl HttpFileFetcher {
    pub fn new(config: HttpFetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    async fn with_retry<T, F, Fut>(&self, url: &str, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(url, attempt, max_attempts = attempts, error = %e, "Fetch attempt failed");
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts,
            message: last_error,
        })
    }

    async fn download_once(&self, url: &str, path: &Path) -> Result<u64, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }

    async fn text_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl FileFetcher for HttpFileFetcher {
    async fn fetch_to_file(&self, url: &str, path: &Path) -> Result<u64, FetchError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        info!(url, path = %path.display(), "Downloading dataset package");
        let bytes = self.with_retry(url, || self.download_once(url, path)).await?;
        info!(url, bytes, "Downloaded dataset package");
        Ok(bytes)
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let text = self.with_retry(url, || self.text_once(url)).await?;
        debug!(url, bytes = text.len(), "Fetched document");
        Ok(text)
    }
}
