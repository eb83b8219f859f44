//! Cheap pre-download checks on search candidates.

use std::fmt;

use crate::config::Config;
use crate::model::SearchCandidate;
use crate::sources::SearchProvider;

/// Minimums a candidate must report to be worth downloading.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefilterThresholds {
    /// Shorter candidates are snippets or teasers
    pub min_duration_s: f64,
    pub min_bitrate_kbps: f64,
}

impl Default for PrefilterThresholds {
    fn default() -> Self {
        Self {
            min_duration_s: 45.0,
            min_bitrate_kbps: 128.0,
        }
    }
}

impl PrefilterThresholds {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_duration_s: config.acquisition.min_duration_s,
            min_bitrate_kbps: config.acquisition.min_bitrate_kbps,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    TooShort { reported_s: f64, min_s: f64 },
    LowBitrate { kbps: f64, min_kbps: f64 },
    /// The bitrate lookup itself failed
    ProbeFailed(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { reported_s, min_s } => {
                write!(f, "short duration ({}s < {}s)", reported_s, min_s)
            }
            Self::LowBitrate { kbps, min_kbps } => {
                write!(f, "low source bitrate ({}kbps < {}kbps)", kbps, min_kbps)
            }
            Self::ProbeFailed(e) => write!(f, "bitrate probe failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrefilterDecision {
    Attempt,
    Reject(RejectReason),
}

impl PrefilterDecision {
    pub fn is_attempt(&self) -> bool {
        matches!(self, Self::Attempt)
    }
}

/// Decides whether a candidate is worth a full download.
///
/// Duration is checked against what the search reported. For bitrate, a
/// figure reported by the search is used as is; otherwise the provider is
/// asked. An unknown bitrate is let through, a failed lookup is not.
pub async fn should_attempt(
    provider: &dyn SearchProvider,
    candidate: &SearchCandidate,
    thresholds: &PrefilterThresholds,
) -> PrefilterDecision {
    if let Some(reported_s) = candidate.reported_duration_s
        && reported_s < thresholds.min_duration_s
    {
        return PrefilterDecision::Reject(RejectReason::TooShort {
            reported_s,
            min_s: thresholds.min_duration_s,
        });
    }

    let bitrate = match candidate.reported_bitrate_kbps {
        Some(kbps) => Some(kbps),
        None => match provider.probe_bitrate(&candidate.locator).await {
            Ok(kbps) => kbps,
            Err(e) => return PrefilterDecision::Reject(RejectReason::ProbeFailed(e.to_string())),
        },
    };

    match bitrate {
        Some(kbps) if kbps < thresholds.min_bitrate_kbps => {
            PrefilterDecision::Reject(RejectReason::LowBitrate {
                kbps,
                min_kbps: thresholds.min_bitrate_kbps,
            })
        }
        Some(_) => PrefilterDecision::Attempt,
        None => {
            tracing::warn!(
                candidate = %candidate.title,
                locator = %candidate.locator,
                "Could not determine audio bitrate, proceeding with download attempt"
            );
            PrefilterDecision::Attempt
        }
    }
}
