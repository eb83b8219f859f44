//! Cover art download.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CoverError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches an image into a directory, returning the written file.
#[async_trait]
pub trait CoverFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, CoverError>;
}

/// Plain HTTP GET with a bounded timeout.
pub struct HttpCoverFetcher {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpCoverFetcher {
    pub fn new(timeout: Duration) -> Result<Self, CoverError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoverError::Network(e.to_string()))?;
        Ok(Self {
            http_client,
            timeout,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, CoverError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| CoverError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoverError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CoverError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl CoverFetcher for HttpCoverFetcher {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, CoverError> {
        let data = tokio::time::timeout(self.timeout, self.download(url))
            .await
            .map_err(|_| CoverError::Timeout(self.timeout))??;

        let path = dest_dir.join(format!("cover{}", cover_suffix(url)));
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }
}

/// File suffix taken from the URL path, `.jpg` when it has none.
pub fn cover_suffix(url: &str) -> String {
    let url = url.split(['?', '#']).next().unwrap_or("");
    // The host is never a file name
    let path = match url.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map_or("", |(_, path)| path),
        None => url,
    };
    let last = path.rsplit('/').next().unwrap_or("");
    match last.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!(".{}", ext.to_lowercase())
        }
        _ => ".jpg".to_string(),
    }
}
