//! JSON metadata sidecar next to each accepted artifact.

use serde::Serialize;
use std::path::Path;

use crate::error::{Result, ResultExt};
use crate::model::{TrackDescriptor, TrackSidecar};

/// Source label used when an existing artifact has no readable sidecar.
pub const UNKNOWN_SOURCE: &str = "Unknown/Existing";

/// Writes the sidecar for `track`, recording where it came from.
pub fn write_sidecar(path: &Path, track: &TrackDescriptor, source: &str) -> Result<()> {
    let sidecar = TrackSidecar {
        track: track.clone(),
        download_source: source.to_string(),
        acquired_at: Some(chrono::Utc::now().to_rfc3339()),
    };

    let mut body = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut body, formatter);
    sidecar
        .serialize(&mut serializer)
        .with_context("serializing sidecar")?;

    std::fs::write(path, body).with_context(format!("writing sidecar {}", path.display()))?;
    Ok(())
}

/// Reads the recorded source, falling back to [`UNKNOWN_SOURCE`].
///
/// Never fails: a missing, unreadable or corrupt sidecar just means the
/// source is unknown.
pub fn read_source(path: &Path) -> String {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::debug!(path = %path.display(), "No readable sidecar: {}", e);
            return UNKNOWN_SOURCE.to_string();
        }
    };

    // Only `download_source` matters here; older sidecars may lack other fields
    match serde_json::from_str::<serde_json::Value>(&contents) {
        Ok(value) => value
            .get("download_source")
            .and_then(|s| s.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
        Err(e) => {
            tracing::debug!(path = %path.display(), "Could not parse sidecar: {}", e);
            UNKNOWN_SOURCE.to_string()
        }
    }
}
