//! Filesystem naming and output layout.
//!
//! Every path the pipeline writes is derived here from a [`TrackDescriptor`]:
//!
//! ```text
//! {download_dir}/{Artist - Name}.{format}      audio artifact
//! {download_dir}/{Artist - Name}.json          metadata sidecar
//! {download_dir}/_temp_dl_{external id}/       per-track workspace
//! ```
//!
//! All segments pass through [`sanitize_filename`], so the same track always
//! lands on the same paths across runs.

use crate::error::{Error, Result};
use crate::model::TrackDescriptor;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Characters rejected by at least one common filesystem.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Sanitizes text into a single safe path segment.
///
/// Forbidden characters become `_`, runs of whitespace and underscores
/// collapse into one `_`, and leading/trailing `_` are trimmed.
///
/// Fails with [`Error::InvalidInput`] when the input is blank or nothing
/// survives sanitization.
pub fn sanitize_filename(text: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Err(Error::invalid_input("filename must not be empty or only whitespace"));
    }

    let mut out = String::with_capacity(text.len());
    let mut in_gap = false;
    for c in text.chars() {
        if FORBIDDEN.contains(&c) || c == '_' || c.is_whitespace() {
            if !in_gap {
                out.push('_');
                in_gap = true;
            }
        } else {
            out.push(c);
            in_gap = false;
        }
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        return Err(Error::invalid_input(format!(
            "{:?} is empty after sanitization",
            text
        )));
    }
    Ok(trimmed.to_string())
}

/// Like [`sanitize_filename`], but never fails.
///
/// On failure the last path segment of the original text is used instead
/// (or the text itself when it has no segment) and the fallback is logged.
pub fn sanitize_or_fallback(text: &str) -> String {
    match sanitize_filename(text) {
        Ok(safe) => safe,
        Err(e) => {
            let fallback = Path::new(text)
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| text.to_string());
            tracing::warn!(
                input = %text,
                fallback = %fallback,
                "Sanitization failed ({}), falling back to basename",
                e
            );
            fallback
        }
    }
}

/// Ensures a directory exists.
///
/// Returns `true` if this call created it, `false` if it already existed.
pub fn ensure_dir_exists(path: &Path) -> io::Result<bool> {
    if path.as_os_str().is_empty() || path.to_string_lossy().trim().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "directory path must not be empty",
        ));
    }

    if path.is_dir() {
        tracing::debug!(path = %path.display(), "Directory already exists");
        return Ok(false);
    }

    fs::create_dir_all(path).inspect_err(|e| {
        tracing::error!(path = %path.display(), "Error creating directory: {}", e);
    })?;
    tracing::info!(path = %path.display(), "Created directory");
    Ok(true)
}

/// Deterministic output paths for one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Final audio artifact
    pub audio: PathBuf,
    /// JSON sidecar next to the audio
    pub sidecar: PathBuf,
    /// Per-track scratch directory
    pub workspace: PathBuf,
}

impl OutputLayout {
    /// Derives all paths for `track` under `download_dir`.
    pub fn for_track(download_dir: &Path, track: &TrackDescriptor, format: &str) -> Self {
        let stem = sanitize_or_fallback(&format!("{} - {}", track.artist, track.name));

        // Key the workspace on the stable id when there is one
        let key = track
            .external_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(|id| {
                let base = Path::new(id)
                    .file_name()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| id.to_string());
                sanitize_or_fallback(&base)
            })
            .unwrap_or_else(|| stem.clone());

        Self {
            audio: download_dir.join(format!("{}.{}", stem, format)),
            sidecar: download_dir.join(format!("{}.json", stem)),
            workspace: download_dir.join(format!("_temp_dl_{}", key)),
        }
    }
}


/// Property-based tests using proptest
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Arbitrary text that may contain forbidden characters and whitespace runs
    fn arbitrary_filename() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-zA-Z0-9 \t/:*?\"<>|\\\\_.-]{1,50}").unwrap()
    }

    proptest! {
        /// Sanitizing twice gives the same result as sanitizing once
        #[test]
        fn sanitize_is_idempotent(input in arbitrary_filename()) {
            if let Ok(once) = sanitize_filename(&input) {
                let twice = sanitize_filename(&once);
                prop_assert!(twice.is_ok(), "second pass failed on {:?}", once);
                prop_assert_eq!(once, twice.unwrap());
            }
        }

        /// Sanitized output never contains a forbidden character
        #[test]
        fn sanitize_removes_forbidden_chars(input in arbitrary_filename()) {
            if let Ok(sanitized) = sanitize_filename(&input) {
                for c in FORBIDDEN {
                    prop_assert!(!sanitized.contains(*c), "Found {} in: {}", c, sanitized);
                }
                prop_assert!(!sanitized.starts_with('_'));
                prop_assert!(!sanitized.ends_with('_'));
                prop_assert!(!sanitized.contains("__"));
            }
        }

        /// Input with at least one ordinary character always sanitizes
        #[test]
        fn sanitize_succeeds_with_word_chars(prefix in arbitrary_filename(), word in "[a-z]{1,5}") {
            let input = format!("{}{}", prefix, word);
            prop_assert!(sanitize_filename(&input).is_ok());
        }

        /// The fallback never panics and never returns an empty name for non-empty input
        #[test]
        fn fallback_is_total(input in arbitrary_filename()) {
            let out = sanitize_or_fallback(&input);
            prop_assert!(!out.is_empty() || input.is_empty());
        }
    }
}
