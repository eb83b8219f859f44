//! Core data models for the acquisition pipeline.
//!
//! - [`TrackDescriptor`]: one playlist entry, produced by the catalog
//! - [`SearchCandidate`]: one ranked search result from a source
//! - [`AcquisitionAttempt`]: transient per (source, candidate) state
//! - [`FinalArtifact`]: the accepted output on disk
//! - [`TrackSidecar`]: JSON body persisted next to the artifact

use crate::error::{Error, Result};
use crate::organizer::sanitize_filename;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One playlist entry.
///
/// Construct with [`TrackDescriptor::new`], which enforces that name and
/// artist survive sanitization and that the duration is positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub name: String,
    /// May be several contributing artists joined with ", "
    pub artist: String,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_art_url: Option<String>,
    /// Stable catalog id, used as the workspace key
    #[serde(default, alias = "spotify_track_id", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl TrackDescriptor {
    pub fn new(name: impl Into<String>, artist: impl Into<String>, duration_ms: u64) -> Result<Self> {
        let name = name.into();
        let artist = artist.into();

        sanitize_filename(&name).map_err(|e| e.context("track name"))?;
        sanitize_filename(&artist).map_err(|e| e.context("track artist"))?;
        if duration_ms == 0 {
            return Err(Error::invalid_input(format!(
                "track {:?} has zero duration",
                name
            )));
        }

        Ok(Self {
            name,
            artist,
            duration_ms,
            album: None,
            track_number: None,
            year: None,
            cover_art_url: None,
            external_id: None,
        })
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_track_number(mut self, track_number: impl Into<String>) -> Self {
        self.track_number = Some(track_number.into());
        self
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn with_cover_art_url(mut self, url: impl Into<String>) -> Self {
        self.cover_art_url = Some(url.into());
        self
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }
}

impl fmt::Display for TrackDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.name)
    }
}

/// One ranked result from a source query. Never persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchCandidate {
    pub title: String,
    /// Resolvable URL (or provider id)
    pub locator: String,
    pub reported_duration_s: Option<f64>,
    pub reported_bitrate_kbps: Option<f64>,
}

impl SearchCandidate {
    pub fn new(title: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            locator: locator.into(),
            ..Default::default()
        }
    }

    pub fn with_duration_s(mut self, seconds: f64) -> Self {
        self.reported_duration_s = Some(seconds);
        self
    }

    pub fn with_bitrate_kbps(mut self, kbps: f64) -> Self {
        self.reported_bitrate_kbps = Some(kbps);
        self
    }

    /// Candidates without a locator are discarded before prefiltering.
    pub fn is_downloadable(&self) -> bool {
        !self.locator.trim().is_empty()
    }
}

/// How a single (source, candidate) attempt concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Pending,
    PrefilterRejected(String),
    DownloadFailed(String),
    TranscodeFailed(String),
    ValidationFailed,
    Success,
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::PrefilterRejected(why) => write!(f, "prefilter rejected: {}", why),
            Self::DownloadFailed(why) => write!(f, "download failed: {}", why),
            Self::TranscodeFailed(why) => write!(f, "transcode failed: {}", why),
            Self::ValidationFailed => write!(f, "validation failed"),
            Self::Success => write!(f, "success"),
        }
    }
}

/// Transient state for one (source, candidate) pair.
///
/// Owns `raw_audio_path` until the attempt concludes; [`conclude`](Self::conclude)
/// records the outcome and deletes the raw download either way.
#[derive(Debug, Clone)]
pub struct AcquisitionAttempt {
    pub source_name: String,
    pub candidate: SearchCandidate,
    pub raw_audio_path: Option<PathBuf>,
    pub outcome: AttemptOutcome,
}

impl AcquisitionAttempt {
    pub fn new(source_name: impl Into<String>, candidate: SearchCandidate) -> Self {
        Self {
            source_name: source_name.into(),
            candidate,
            raw_audio_path: None,
            outcome: AttemptOutcome::Pending,
        }
    }

    /// Records the outcome and discards the raw download.
    pub fn conclude(mut self, outcome: AttemptOutcome) -> AttemptRecord {
        if let Some(raw) = self.raw_audio_path.take()
            && let Err(e) = std::fs::remove_file(&raw)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::debug!(path = %raw.display(), "Could not remove raw download: {}", e);
        }
        self.outcome = outcome;
        AttemptRecord {
            source_name: self.source_name,
            candidate_title: self.candidate.title,
            outcome: self.outcome,
        }
    }
}

/// What remains of an attempt after it concluded, for the run log.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub source_name: String,
    pub candidate_title: String,
    pub outcome: AttemptOutcome,
}

/// The accepted output for a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalArtifact {
    pub path: PathBuf,
    pub source_name: String,
    pub metadata_sidecar_path: PathBuf,
}

/// JSON sidecar body: the full descriptor plus acquisition provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSidecar {
    #[serde(flatten)]
    pub track: TrackDescriptor,
    pub download_source: String,
    /// RFC 3339 timestamp of the acquisition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquired_at: Option<String>,
}
