//! Audio search and retrieval providers.
//!
//! A [`Source`] is a named entry in the configured priority list; it pairs a
//! provider search hint (e.g. `scsearch`) with a shared [`SearchProvider`].
//! All sources in a run share one provider handle, whose requests go through
//! a single [`Throttle`].

mod dto;
mod throttle;
mod ytdlp;

pub use dto::InfoDto;
pub use throttle::Throttle;
pub use ytdlp::YtDlpProvider;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::model::SearchCandidate;

/// Errors from a search/download provider.
///
/// The acquisition pipeline treats every variant as a step failure.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Required tool not found: {0}")]
    ToolMissing(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse provider output: {0}")]
    Parse(String),
}

/// Keyword search and media retrieval.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Up to `max_results` ranked candidates for `query` on the source named by `source_hint`.
    async fn search(
        &self,
        query: &str,
        source_hint: &str,
        max_results: usize,
    ) -> Result<Vec<SearchCandidate>, ProviderError>;

    /// Best-audio bitrate in kbps; `Ok(None)` when the source doesn't report one.
    async fn probe_bitrate(&self, locator: &str) -> Result<Option<f64>, ProviderError>;

    /// Downloads to `destination_template` (a path whose extension is
    /// chosen by the provider). Returns the file written, if any.
    async fn download(
        &self,
        locator: &str,
        destination_template: &Path,
    ) -> Result<Option<PathBuf>, ProviderError>;
}

/// One configured source.
#[derive(Clone)]
pub struct Source {
    pub name: String,
    pub hint: String,
    pub provider: Arc<dyn SearchProvider>,
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("name", &self.name)
            .field("hint", &self.hint)
            .finish()
    }
}

impl Source {
    pub fn new(
        name: impl Into<String>,
        hint: impl Into<String>,
        provider: Arc<dyn SearchProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            hint: hint.into(),
            provider,
        }
    }
}

/// Builds the configured source list in priority order over one provider.
pub fn from_config(config: &Config, provider: Arc<dyn SearchProvider>) -> Vec<Source> {
    config
        .acquisition
        .sources
        .iter()
        .map(|s| Source::new(&s.name, &s.search_prefix, Arc::clone(&provider)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockProvider;

    #[test]
    fn test_sources_keep_config_order() {
        let provider: Arc<dyn SearchProvider> = Arc::new(MockProvider::new());
        let sources = from_config(&Config::default(), provider);

        let names: Vec<_> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["SoundCloud", "YouTube"]);
        assert_eq!(sources[0].hint, "scsearch");
        assert_eq!(sources[1].hint, "ytsearch");
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::ExtractionFailed("HTTP Error 403".to_string());
        assert!(err.to_string().contains("403"));
    }
}
