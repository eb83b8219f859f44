//! Artifact validation.
//!
//! An artifact is accepted only when all of these hold, checked in order:
//!
//! 1. the file exists
//! 2. the probed format contains the target container name (case-insensitive)
//! 3. for lossy targets, the bitrate is within `target ± bitrate_tolerance`
//!    bps (inclusive); lossless targets have no bitrate window
//! 4. if an expected duration is given, the actual duration is within
//!    `expected ± duration_tolerance` ms (inclusive); the metadata duration
//!    is preferred and a full decode is the fallback
//!
//! [`ArtifactValidator::validate`] is a plain predicate. Use
//! [`ArtifactValidator::inspect`] when the reason matters.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{AudioError, MediaProbe, is_lossless};
use crate::config::Config;

/// Acceptance thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Container name as `MediaProbe` reports it, e.g. "mp4" for m4a output
    pub target_codec: String,
    /// `None` for lossless targets, which are encoded without a bitrate
    pub target_bitrate_bps: Option<u32>,
    pub bitrate_tolerance_bps: u32,
    pub duration_tolerance_ms: u64,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            target_codec: "mp3".to_string(),
            target_bitrate_bps: Some(320_000),
            bitrate_tolerance_bps: 5000,
            duration_tolerance_ms: 5000,
        }
    }
}

impl ValidationPolicy {
    pub fn from_config(config: &Config) -> Self {
        let format = config.audio_format();
        Self {
            target_codec: container_name(&format).to_string(),
            target_bitrate_bps: (!is_lossless(&format)).then(|| config.audio_bitrate_bps()),
            bitrate_tolerance_bps: config.acquisition.bitrate_tolerance_bps,
            duration_tolerance_ms: config.acquisition.duration_tolerance_ms,
        }
    }

    fn bitrate_window(&self) -> Option<(u32, u32)> {
        self.target_bitrate_bps.map(|target| {
            (
                target.saturating_sub(self.bitrate_tolerance_bps),
                target.saturating_add(self.bitrate_tolerance_bps),
            )
        })
    }
}

/// Container name `MediaProbe` reports for a file written in `format`.
fn container_name(format: &str) -> &str {
    match format {
        "m4a" => "mp4",
        other => other,
    }
}

/// Why an artifact was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ValidationFailure {
    #[error("File does not exist: {0}")]
    Missing(PathBuf),

    #[error("Probe failed: {0}")]
    Probe(AudioError),

    #[error("Format {found:?} is not {expected:?}")]
    WrongFormat { found: String, expected: String },

    #[error("No bitrate reported")]
    MissingBitrate,

    #[error("Bitrate {found} bps outside [{min}, {max}]")]
    BitrateOutOfRange { found: u32, min: u32, max: u32 },

    #[error("Duration unavailable: {0}")]
    DurationUnknown(AudioError),

    #[error("Duration {actual_ms} ms differs from expected {expected_ms} ms by more than {tolerance_ms} ms")]
    DurationOutOfRange {
        actual_ms: u64,
        expected_ms: u64,
        tolerance_ms: u64,
    },
}

/// What an accepted artifact looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub format_name: String,
    /// May be absent for lossless artifacts
    pub bitrate_bps: Option<u32>,
    /// Only measured when an expected duration was given
    pub duration_ms: Option<u64>,
}

/// The one validator used for fresh and pre-existing artifacts.
#[derive(Clone)]
pub struct ArtifactValidator {
    probe: Arc<dyn MediaProbe>,
    policy: ValidationPolicy,
}

impl ArtifactValidator {
    pub fn new(probe: Arc<dyn MediaProbe>, policy: ValidationPolicy) -> Self {
        Self { probe, policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// True if the artifact passes every gate, with the policy's duration tolerance.
    pub fn validate(&self, path: &Path, expected_duration_ms: Option<u64>) -> bool {
        self.validate_with_tolerance(path, expected_duration_ms, self.policy.duration_tolerance_ms)
    }

    /// [`validate`](Self::validate) on the blocking pool.
    ///
    /// Metadata reads and the decode fallback are synchronous file work; async
    /// callers use this so other tracks and Ctrl-C keep running.
    pub async fn validate_async(&self, path: &Path, expected_duration_ms: Option<u64>) -> bool {
        let validator = self.clone();
        let path = path.to_path_buf();
        let task = tokio::task::spawn_blocking(move || validator.validate(&path, expected_duration_ms));
        match task.await {
            Ok(valid) => valid,
            Err(e) => {
                tracing::error!("Validation task failed: {}", e);
                false
            }
        }
    }

    /// True if the artifact passes every gate, with an explicit duration tolerance.
    pub fn validate_with_tolerance(
        &self,
        path: &Path,
        expected_duration_ms: Option<u64>,
        tolerance_ms: u64,
    ) -> bool {
        match self.inspect(path, expected_duration_ms, tolerance_ms) {
            Ok(report) => {
                tracing::debug!(
                    path = %path.display(),
                    format = %report.format_name,
                    bitrate_bps = ?report.bitrate_bps,
                    duration_ms = ?report.duration_ms,
                    "Artifact valid"
                );
                true
            }
            Err(reason) => {
                tracing::info!(path = %path.display(), "Artifact invalid: {}", reason);
                false
            }
        }
    }

    /// Runs the gates in order and reports the first failure.
    pub fn inspect(
        &self,
        path: &Path,
        expected_duration_ms: Option<u64>,
        tolerance_ms: u64,
    ) -> Result<ValidationReport, ValidationFailure> {
        if !path.exists() {
            return Err(ValidationFailure::Missing(path.to_path_buf()));
        }

        let probed = self.probe.probe(path).map_err(ValidationFailure::Probe)?;

        let expected_codec = self.policy.target_codec.to_lowercase();
        if !probed.format_name.to_lowercase().contains(&expected_codec) {
            return Err(ValidationFailure::WrongFormat {
                found: probed.format_name,
                expected: expected_codec,
            });
        }

        if let Some((min, max)) = self.policy.bitrate_window() {
            let bitrate = probed.bitrate_bps.ok_or(ValidationFailure::MissingBitrate)?;
            if !(min..=max).contains(&bitrate) {
                return Err(ValidationFailure::BitrateOutOfRange {
                    found: bitrate,
                    min,
                    max,
                });
            }
        }

        let duration_ms = match expected_duration_ms {
            None => None,
            Some(expected_ms) => {
                let actual_ms = match probed.duration_ms {
                    Some(ms) => ms,
                    None => self
                        .probe
                        .decode_duration_ms(path)
                        .map_err(ValidationFailure::DurationUnknown)?,
                };
                if actual_ms.abs_diff(expected_ms) > tolerance_ms {
                    return Err(ValidationFailure::DurationOutOfRange {
                        actual_ms,
                        expected_ms,
                        tolerance_ms,
                    });
                }
                Some(actual_ms)
            }
        };

        Ok(ValidationReport {
            format_name: probed.format_name,
            bitrate_bps: probed.bitrate_bps,
            duration_ms,
        })
    }
}
