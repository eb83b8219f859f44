//! Spotify Web API integration
//!
//! Resolves playlists with the client-credentials grant, so no user login
//! is needed for public playlists.
//!
//! API docs: https://developer.spotify.com/documentation/web-api

pub mod dto;
mod adapter;
mod client;

pub use client::SpotifyClient;

use super::CatalogError;

/// Extracts the playlist id from a share URL, a `spotify:playlist:` URI or a bare id.
pub fn parse_playlist_id(locator: &str) -> Result<String, CatalogError> {
    let locator = locator.trim();

    let id = if let Some(rest) = locator.strip_prefix("spotify:playlist:") {
        rest
    } else {
        // Last path segment, minus any query string
        let last = locator.trim_end_matches('/').rsplit('/').next().unwrap_or("");
        last.split(['?', '#']).next().unwrap_or("")
    };

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CatalogError::InvalidLocator(locator.to_string()));
    }
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_playlist_id() {
        let id = "37i9dQZF1DXcBWIGoYBM5M";
        assert_eq!(
            parse_playlist_id(&format!("https://open.spotify.com/playlist/{}?si=abc123", id)).unwrap(),
            id
        );
        assert_eq!(
            parse_playlist_id(&format!("https://open.spotify.com/playlist/{}/", id)).unwrap(),
            id
        );
        assert_eq!(parse_playlist_id(&format!("spotify:playlist:{}", id)).unwrap(), id);
        assert_eq!(parse_playlist_id(id).unwrap(), id);
    }

    #[test]
    fn test_parse_playlist_id_rejects_garbage() {
        assert!(matches!(
            parse_playlist_id(""),
            Err(CatalogError::InvalidLocator(_))
        ));
        assert!(parse_playlist_id("https://open.spotify.com/playlist/?si=x").is_err());
        assert!(parse_playlist_id("not a playlist").is_err());
    }
}
