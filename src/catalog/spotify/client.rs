//! Spotify HTTP client
//!
//! Handles the client-credentials token exchange and playlist pagination.
//! The access token is cached until shortly before it expires.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{adapter, dto, parse_playlist_id};
use crate::catalog::CatalogError;
use crate::model::TrackDescriptor;

/// User agent sent with every request
const USER_AGENT: &str = concat!("playlist-ripper/", env!("CARGO_PKG_VERSION"));

/// Fields requested per playlist item, to keep pages small
const ITEM_FIELDS: &str = "items(track(id,name,duration_ms,track_number,artists(name),album(name,release_date,images(url)))),next";

/// Refresh this long before the token actually expires
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Spotify Web API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    api_base: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    /// Create a new client. Fails on blank credentials.
    pub fn new(client_id: &str, client_secret: &str) -> Result<Self, CatalogError> {
        Self::with_base_urls(
            client_id,
            client_secret,
            "https://api.spotify.com/v1",
            "https://accounts.spotify.com/api/token",
        )
    }

    /// Create a client against custom endpoints
    pub fn with_base_urls(
        client_id: &str,
        client_secret: &str,
        api_base: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(CatalogError::MissingCredentials);
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_base: api_base.into(),
            token_url: token_url.into(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token: Mutex::new(None),
        })
    }

    /// Fetch every track of a playlist, following `next` links.
    ///
    /// If a later page fails, the tracks collected so far are returned.
    pub async fn playlist_tracks(&self, locator: &str) -> Result<Vec<TrackDescriptor>, CatalogError> {
        let playlist_id = parse_playlist_id(locator)?;
        let first_url = format!(
            "{}/playlists/{}/tracks?limit=100&fields={}",
            self.api_base,
            playlist_id,
            urlencoding::encode(ITEM_FIELDS)
        );

        let mut tracks = Vec::new();
        let mut next = Some(first_url);
        let mut page_index = 0usize;

        while let Some(url) = next.take() {
            let page = match self.fetch_page(&url).await {
                Ok(page) => page,
                Err(e) if page_index > 0 && !tracks.is_empty() => {
                    tracing::warn!(
                        page = page_index,
                        collected = tracks.len(),
                        "Playlist page failed, continuing with partial results: {}",
                        e
                    );
                    break;
                }
                Err(e) => return Err(e),
            };

            tracks.extend(adapter::to_tracks(page.items));
            next = page.next;
            page_index += 1;
        }

        tracing::info!(
            playlist = %playlist_id,
            tracks = tracks.len(),
            pages = page_index,
            "Fetched playlist tracks"
        );
        Ok(tracks)
    }

    /// Current access token, exchanging credentials when needed
    async fn access_token(&self) -> Result<String, CatalogError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() + EXPIRY_MARGIN < token.expires_at
        {
            return Ok(token.access_token.clone());
        }

        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Auth(format!("HTTP {}: {}", status, body.trim())));
        }
        if !status.is_success() {
            return Err(CatalogError::Auth(format!("HTTP {}", status)));
        }

        let token: dto::TokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;
        tracing::debug!(expires_in = token.expires_in, "Obtained Spotify access token");

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(access_token)
    }

    /// Send one page request and parse the response
    async fn fetch_page(&self, url: &str) -> Result<dto::PlaylistTracksPage, CatalogError> {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(url.to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CatalogError::RateLimited);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            // Token was revoked early; drop it so the next call re-authenticates
            *self.token.lock().await = None;
            return Err(CatalogError::Auth("access token rejected".to_string()));
        }

        if !status.is_success() {
            if let Ok(error) = response.json::<dto::ApiError>().await {
                return Err(CatalogError::Network(format!(
                    "HTTP {}: {}",
                    error.error.status, error.error.message
                )));
            }
            return Err(CatalogError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json::<dto::PlaylistTracksPage>()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_credentials_rejected() {
        assert!(matches!(
            SpotifyClient::new("", "secret"),
            Err(CatalogError::MissingCredentials)
        ));
        assert!(matches!(
            SpotifyClient::new("id", "  "),
            Err(CatalogError::MissingCredentials)
        ));
    }

    #[test]
    fn test_client_with_custom_urls() {
        let client =
            SpotifyClient::with_base_urls("id", "secret", "http://localhost:8080", "http://localhost:8081/token")
                .unwrap();
        assert_eq!(client.api_base, "http://localhost:8080");
        assert_eq!(client.token_url, "http://localhost:8081/token");
    }

    #[test]
    fn test_user_agent_format() {
        assert!(USER_AGENT.starts_with("playlist-ripper/"));
    }

    #[tokio::test]
    async fn test_invalid_locator_fails_before_network() {
        let client = SpotifyClient::new("id", "secret").unwrap();
        assert!(matches!(
            client.playlist_tracks("https://open.spotify.com/playlist/").await,
            Err(CatalogError::InvalidLocator(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_token_endpoint_is_network_error() {
        // Port 9 (discard) is closed on test machines
        let client =
            SpotifyClient::with_base_urls("id", "secret", "http://127.0.0.1:9/v1", "http://127.0.0.1:9/token")
                .unwrap();
        assert!(matches!(
            client.playlist_tracks("37i9dQZF1DXcBWIGoYBM5M").await,
            Err(CatalogError::Network(_))
        ));
    }
}
