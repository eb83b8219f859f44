//! Per-track scratch directory.
//!
//! Created when a track needs downloading, removed when the [`Workspace`]
//! is dropped. Dropping also happens when the acquiring future is cancelled,
//! so an interrupted run still cleans up.

use std::io;
use std::path::{Path, PathBuf};

use crate::organizer::{ensure_dir_exists, sanitize_or_fallback};

#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    /// Creates the workspace, clearing anything left by an earlier failed run.
    pub fn create(path: &Path) -> io::Result<Self> {
        if path.exists() {
            tracing::debug!(path = %path.display(), "Removing stale workspace");
            if let Err(e) = std::fs::remove_dir_all(path) {
                tracing::warn!(path = %path.display(), "Could not remove stale workspace: {}", e);
            }
        }
        ensure_dir_exists(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw-download folder for one source, created on demand.
    pub fn source_dir(&self, source_name: &str) -> io::Result<PathBuf> {
        let dir = self
            .path
            .join(format!("{}_raw_downloads", sanitize_or_fallback(source_name)));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed workspace"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Could not remove workspace: {}", e)
            }
        }
    }
}
