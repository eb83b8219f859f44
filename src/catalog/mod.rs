//! Playlist resolution.
//!
//! A catalog turns a playlist locator into the flat list of
//! [`TrackDescriptor`]s the acquisition pipeline works through. Entries
//! without a name, artists or duration never leave this module.

pub mod spotify;

pub use spotify::SpotifyClient;

use async_trait::async_trait;

use crate::model::TrackDescriptor;

/// Errors from the catalog service. Any of these ends the run.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Spotify client ID or secret not configured")]
    MissingCredentials,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Not a playlist locator: {0}")]
    InvalidLocator(String),

    #[error("Playlist not found: {0}")]
    NotFound(String),

    #[error("Rate limited - try again later")]
    RateLimited,
}

/// Catalog service contract.
///
/// Implement this trait to create mock implementations for testing.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Resolve a playlist into its tracks, following pagination internally.
    async fn resolve(&self, playlist_locator: &str) -> Result<Vec<TrackDescriptor>, CatalogError>;
}

#[async_trait]
impl CatalogApi for SpotifyClient {
    async fn resolve(&self, playlist_locator: &str) -> Result<Vec<TrackDescriptor>, CatalogError> {
        self.playlist_tracks(playlist_locator).await
    }
}
