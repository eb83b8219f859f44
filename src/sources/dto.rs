//! yt-dlp JSON output (`-J`).
//!
//! Only the fields the pipeline reads. A search returns a playlist-shaped
//! object with `entries`; a single URL returns one info object.

use serde::Deserialize;

use crate::model::SearchCandidate;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfoDto {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Seconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Audio bitrate, kbps
    #[serde(default)]
    pub abr: Option<f64>,
    /// Total bitrate, kbps
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default)]
    pub vcodec: Option<String>,
    /// Search results; entries the extractor couldn't resolve come back as null
    #[serde(default)]
    pub entries: Option<Vec<Option<InfoDto>>>,
}

impl InfoDto {
    /// Audio-only bitrate, or the total bitrate when the stream has no video.
    pub fn effective_bitrate_kbps(&self) -> Option<f64> {
        self.abr.or_else(|| {
            if self.vcodec.as_deref() == Some("none") {
                self.tbr
            } else {
                None
            }
        })
    }

    /// Flattens search output into ranked entries.
    pub fn into_entries(self) -> Vec<InfoDto> {
        match self.entries {
            Some(entries) => entries.into_iter().flatten().collect(),
            None if self.webpage_url.is_some() => vec![self],
            None => Vec::new(),
        }
    }

    pub fn into_candidate(self) -> SearchCandidate {
        let bitrate = self.effective_bitrate_kbps();
        SearchCandidate {
            title: self.title.unwrap_or_else(|| "Unknown Title".to_string()),
            locator: self.webpage_url.or(self.url).unwrap_or_default(),
            reported_duration_s: self.duration,
            reported_bitrate_kbps: bitrate,
        }
    }
}
