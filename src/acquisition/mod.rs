//! Multi-source track acquisition.
//!
//! For each playlist track: reuse a valid artifact already on disk, otherwise
//! walk the configured sources in priority order, trying each ranked
//! candidate until one downloads, transcodes and validates.

mod cover;
mod prefilter;
mod report;
mod service;
mod sidecar;
mod workspace;

pub use cover::{CoverError, CoverFetcher, HttpCoverFetcher, cover_suffix};
pub use prefilter::{PrefilterDecision, PrefilterThresholds, RejectReason, should_attempt};
pub use report::{FailedTrack, RunReport, SucceededTrack};
pub use service::{AcquisitionOutcome, AcquisitionSettings, Acquirer, build_query};
pub use sidecar::{UNKNOWN_SOURCE, read_source, write_sidecar};
pub use workspace::Workspace;
