//! Audio inspection, transcoding and tagging.
//!
//! # Architecture
//!
//! ```text
//! raw download ──► Transcoder (ffmpeg) ──► tagging (lofty) ──► final artifact
//!                                                                  │
//!                  ArtifactValidator ◄── MediaProbe (lofty, symphonia fallback)
//! ```
//!
//! The validator is the single gate every artifact passes before it is
//! accepted, both for fresh downloads and for files found on disk.

mod probe;
mod tagging;
mod transcode;
mod validator;

pub use probe::{LoftyProbe, MediaProbe, ProbeReport};
pub use tagging::{TagSet, apply_tags};
pub use transcode::{FfmpegTranscoder, TranscodeRequest, Transcoder};
pub use validator::{ArtifactValidator, ValidationFailure, ValidationPolicy, ValidationReport};

use std::time::Duration;

/// Errors from probing, decoding, transcoding or tagging.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Failed to probe media: {0}")]
    Probe(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),

    #[error("Failed to write tags: {0}")]
    Tagging(String),

    #[error("Required tool not found: {0}")]
    ToolMissing(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lossless targets are encoded without a bitrate.
pub(crate) fn is_lossless(format: &str) -> bool {
    matches!(format, "flac" | "wav")
}
