//! Per-track acquisition state machine.
//!
//! ```text
//! CheckExisting ─valid─────────────────────────────────────────► Done(cached)
//!      │ missing/invalid
//!      ▼
//! TrySource(i) ─search failed/empty─► TrySource(i+1) ─none left─► Done(exhausted)
//!      │ candidates
//!      ▼
//! TryCandidate(i,j) ─rejected/download failed─► TryCandidate(i,j+1)
//!      │ raw audio
//!      ▼
//! Transcoding ─failed─► TryCandidate(i,j+1)
//!      ▼
//! Validating ─failed─► TryCandidate(i,j+1)
//!      │ valid
//!      ▼
//! Done(acquired)
//! ```
//!
//! The first candidate that validates wins. Failures never escape: each one
//! becomes an [`AttemptOutcome`] and the machine moves on.

use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::cover::CoverFetcher;
use super::prefilter::{PrefilterDecision, PrefilterThresholds, should_attempt};
use super::report::RunReport;
use super::sidecar::{read_source, write_sidecar};
use super::workspace::Workspace;
use crate::audio::{ArtifactValidator, TagSet, TranscodeRequest, Transcoder};
use crate::config::Config;
use crate::model::{
    AcquisitionAttempt, AttemptOutcome, AttemptRecord, FinalArtifact, SearchCandidate,
    TrackDescriptor,
};
use crate::organizer::{OutputLayout, sanitize_or_fallback};
use crate::sources::Source;

/// How a track's acquisition ended.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionOutcome {
    /// A valid artifact was already on disk; nothing was fetched
    Cached(FinalArtifact),
    Acquired {
        artifact: FinalArtifact,
        attempts: Vec<AttemptRecord>,
    },
    /// Every source and candidate failed
    Exhausted { attempts: Vec<AttemptRecord> },
}

impl AcquisitionOutcome {
    pub fn artifact(&self) -> Option<&FinalArtifact> {
        match self {
            Self::Cached(artifact) | Self::Acquired { artifact, .. } => Some(artifact),
            Self::Exhausted { .. } => None,
        }
    }
}

/// Per-run knobs for the acquirer.
#[derive(Debug, Clone)]
pub struct AcquisitionSettings {
    pub target_format: String,
    /// Encoder bitrate, e.g. "320k"
    pub target_bitrate: String,
    pub max_results_per_source: usize,
    pub thresholds: PrefilterThresholds,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            target_format: "mp3".to_string(),
            target_bitrate: "320k".to_string(),
            max_results_per_source: 3,
            thresholds: PrefilterThresholds::default(),
        }
    }
}

impl AcquisitionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_format: config.audio_format(),
            target_bitrate: format!("{}k", config.audio_bitrate_bps() / 1000),
            max_results_per_source: config.acquisition.max_results_per_source.max(1),
            thresholds: PrefilterThresholds::from_config(config),
        }
    }
}

/// Search query biased toward full-length audio: artist, title, album, "Audio".
pub fn build_query(track: &TrackDescriptor) -> String {
    [
        Some(track.artist.as_str()),
        Some(track.name.as_str()),
        track.album.as_deref(),
        Some("Audio"),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.trim().is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Drives one track at a time through the acquisition state machine.
pub struct Acquirer {
    sources: Vec<Source>,
    transcoder: Arc<dyn Transcoder>,
    validator: ArtifactValidator,
    covers: Arc<dyn CoverFetcher>,
    settings: AcquisitionSettings,
}

/// Per-track context shared by every attempt.
struct TrackContext<'a> {
    track: &'a TrackDescriptor,
    layout: &'a OutputLayout,
    workspace: &'a Workspace,
    query: String,
    tags: TagSet,
    cover: Option<PathBuf>,
}

impl Acquirer {
    pub fn new(
        sources: Vec<Source>,
        transcoder: Arc<dyn Transcoder>,
        validator: ArtifactValidator,
        covers: Arc<dyn CoverFetcher>,
        settings: AcquisitionSettings,
    ) -> Self {
        Self {
            sources,
            transcoder,
            validator,
            covers,
            settings,
        }
    }

    /// Acquires one track into `download_dir`.
    #[tracing::instrument(skip_all, fields(track = %track))]
    pub async fn acquire(&self, track: &TrackDescriptor, download_dir: &Path) -> AcquisitionOutcome {
        let layout = OutputLayout::for_track(download_dir, track, &self.settings.target_format);

        if let Some(artifact) = self.check_existing(track, &layout).await {
            return AcquisitionOutcome::Cached(artifact);
        }

        let workspace = match Workspace::create(&layout.workspace) {
            Ok(workspace) => workspace,
            Err(e) => {
                tracing::error!(path = %layout.workspace.display(), "Cannot create workspace: {}", e);
                remove_invalid(&layout.audio);
                return AcquisitionOutcome::Exhausted { attempts: vec![] };
            }
        };

        let ctx = TrackContext {
            track,
            layout: &layout,
            workspace: &workspace,
            query: build_query(track),
            tags: TagSet::from_track(track),
            cover: self.fetch_cover(track, workspace.path()).await,
        };

        let mut attempts = Vec::new();
        for source in &self.sources {
            if let Some(artifact) = self.try_source(source, &ctx, &mut attempts).await {
                tracing::info!(
                    source = %artifact.source_name,
                    path = %artifact.path.display(),
                    "Track acquired"
                );
                return AcquisitionOutcome::Acquired { artifact, attempts };
            }
        }

        remove_invalid(&layout.audio);
        tracing::warn!(attempts = attempts.len(), "All sources exhausted");
        AcquisitionOutcome::Exhausted { attempts }
    }

    /// Acquires `tracks` with at most `jobs` in flight, recording each into `report`.
    ///
    /// Dropping the returned future stops after the in-flight tracks are
    /// cancelled; their workspaces are removed on drop.
    pub async fn acquire_all(
        &self,
        tracks: &[TrackDescriptor],
        download_dir: &Path,
        jobs: usize,
        report: &mut RunReport,
    ) {
        let total = tracks.len();
        let mut results = futures::stream::iter(tracks.iter().enumerate())
            .map(|(i, track)| async move {
                tracing::info!(
                    "Processing track {}/{}: {}",
                    i + 1,
                    total,
                    track
                );
                (track, self.acquire(track, download_dir).await)
            })
            .buffer_unordered(jobs.max(1));

        while let Some((track, outcome)) = results.next().await {
            report.record(track, &outcome);
        }
    }

    /// Returns the existing artifact if it is already valid.
    async fn check_existing(
        &self,
        track: &TrackDescriptor,
        layout: &OutputLayout,
    ) -> Option<FinalArtifact> {
        if !layout.audio.exists() {
            return None;
        }
        tracing::info!(path = %layout.audio.display(), "Artifact exists, validating");

        if !self.validator.validate_async(&layout.audio, Some(track.duration_ms)).await {
            tracing::warn!(path = %layout.audio.display(), "Existing artifact is invalid, re-acquiring");
            return None;
        }

        let source_name = read_source(&layout.sidecar);
        tracing::info!(source = %source_name, "Existing artifact is valid, skipping download");
        Some(FinalArtifact {
            path: layout.audio.clone(),
            source_name,
            metadata_sidecar_path: layout.sidecar.clone(),
        })
    }

    async fn fetch_cover(&self, track: &TrackDescriptor, dest_dir: &Path) -> Option<PathBuf> {
        let url = track.cover_art_url.as_deref().filter(|u| !u.trim().is_empty())?;
        match self.covers.fetch(url, dest_dir).await {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "Downloaded cover art");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(url = %url, "Failed to download cover art, continuing without: {}", e);
                None
            }
        }
    }

    async fn try_source(
        &self,
        source: &Source,
        ctx: &TrackContext<'_>,
        attempts: &mut Vec<AttemptRecord>,
    ) -> Option<FinalArtifact> {
        let max = self.settings.max_results_per_source;
        tracing::info!(source = %source.name, query = %ctx.query, "Searching top {} results", max);

        let candidates = match source.provider.search(&ctx.query, &source.hint, max).await {
            Ok(candidates) if candidates.is_empty() => {
                tracing::info!(source = %source.name, "No search results");
                return None;
            }
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(source = %source.name, "Search failed: {}", e);
                return None;
            }
        };

        let raw_dir = match ctx.workspace.source_dir(&source.name) {
            Ok(dir) => dir,
            Err(e) => {
                tracing::error!(source = %source.name, "Cannot create download folder: {}", e);
                return None;
            }
        };

        let total = candidates.len().min(max);
        for (j, candidate) in candidates.into_iter().take(max).enumerate() {
            tracing::info!(
                source = %source.name,
                candidate = %candidate.title,
                duration_s = ?candidate.reported_duration_s,
                "Considering result {}/{}",
                j + 1,
                total
            );
            if !candidate.is_downloadable() {
                tracing::warn!(source = %source.name, "Skipping result {} (no URL)", j + 1);
                continue;
            }

            let mut attempt = AcquisitionAttempt::new(&source.name, candidate);
            let outcome = self.run_attempt(source, ctx, &raw_dir, j, &mut attempt).await;
            let success = outcome.is_success();
            if !success {
                tracing::info!(
                    source = %source.name,
                    candidate = %attempt.candidate.title,
                    "Attempt {}: {}",
                    j + 1,
                    outcome
                );
            }
            attempts.push(attempt.conclude(outcome));

            if success {
                if let Err(e) = write_sidecar(&ctx.layout.sidecar, ctx.track, &source.name) {
                    tracing::warn!(path = %ctx.layout.sidecar.display(), "Failed to write sidecar: {}", e);
                }
                return Some(FinalArtifact {
                    path: ctx.layout.audio.clone(),
                    source_name: source.name.clone(),
                    metadata_sidecar_path: ctx.layout.sidecar.clone(),
                });
            }
        }

        tracing::info!(source = %source.name, "All {} result(s) failed", total);
        None
    }

    /// Prefilter, download, transcode and validate one candidate.
    async fn run_attempt(
        &self,
        source: &Source,
        ctx: &TrackContext<'_>,
        raw_dir: &Path,
        index: usize,
        attempt: &mut AcquisitionAttempt,
    ) -> AttemptOutcome {
        let candidate: &SearchCandidate = &attempt.candidate;

        if let PrefilterDecision::Reject(reason) =
            should_attempt(source.provider.as_ref(), candidate, &self.settings.thresholds).await
        {
            return AttemptOutcome::PrefilterRejected(reason.to_string());
        }

        let stem = sanitize_or_fallback(&format!("{} {}", ctx.track.name, ctx.track.artist));
        let template = raw_dir.join(format!("{}_attempt_{}.%(ext)s", stem, index + 1));

        match source.provider.download(&candidate.locator, &template).await {
            Ok(Some(path)) if path.exists() => {
                tracing::debug!(path = %path.display(), "Downloaded raw audio");
                attempt.raw_audio_path = Some(path);
            }
            Ok(_) => return AttemptOutcome::DownloadFailed("downloaded file not found".to_string()),
            Err(e) => return AttemptOutcome::DownloadFailed(e.to_string()),
        }

        let Some(input) = attempt.raw_audio_path.clone() else {
            return AttemptOutcome::DownloadFailed("downloaded file not found".to_string());
        };
        let request = TranscodeRequest {
            input,
            output: ctx.layout.audio.clone(),
            target_format: self.settings.target_format.clone(),
            target_bitrate: self.settings.target_bitrate.clone(),
            tags: ctx.tags.clone(),
            cover: ctx.cover.clone(),
        };
        if let Err(e) = self.transcoder.transcode(&request).await {
            remove_invalid(&ctx.layout.audio);
            return AttemptOutcome::TranscodeFailed(e.to_string());
        }

        if !self
            .validator
            .validate_async(&ctx.layout.audio, Some(ctx.track.duration_ms))
            .await
        {
            remove_invalid(&ctx.layout.audio);
            return AttemptOutcome::ValidationFailed;
        }

        AttemptOutcome::Success
    }
}

/// Deletes a file that must not survive as an artifact.
fn remove_invalid(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed invalid output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "Could not remove invalid output: {}", e),
    }
}
