//! End-of-run summary.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::AcquisitionOutcome;
use crate::model::TrackDescriptor;

#[derive(Debug, Clone, PartialEq)]
pub struct SucceededTrack {
    pub name: String,
    pub artist: String,
    pub source: String,
    pub path: PathBuf,
    /// Already on disk and valid; nothing was downloaded
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedTrack {
    pub name: String,
    pub artist: String,
    pub attempts: usize,
}

/// Succeeded and failed tracks of one run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub succeeded: Vec<SucceededTrack>,
    pub failed: Vec<FailedTrack>,
    /// Set when the run was cut short by an interrupt
    pub interrupted: bool,
}

impl RunReport {
    pub fn record(&mut self, track: &TrackDescriptor, outcome: &AcquisitionOutcome) {
        match outcome {
            AcquisitionOutcome::Cached(artifact) | AcquisitionOutcome::Acquired { artifact, .. } => {
                self.succeeded.push(SucceededTrack {
                    name: track.name.clone(),
                    artist: track.artist.clone(),
                    source: artifact.source_name.clone(),
                    path: artifact.path.clone(),
                    cached: matches!(outcome, AcquisitionOutcome::Cached(_)),
                })
            }
            AcquisitionOutcome::Exhausted { attempts } => self.failed.push(FailedTrack {
                name: track.name.clone(),
                artist: track.artist.clone(),
                attempts: attempts.len(),
            }),
        }
    }

    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Renders the summary table. Failed tracks point at `log_file`.
    pub fn render(&self, log_file: &Path) -> String {
        let mut rows: Vec<[String; 5]> = Vec::with_capacity(self.processed());
        for s in &self.succeeded {
            rows.push([
                if s.cached { "CACHED" } else { "OK" }.to_string(),
                s.name.clone(),
                s.artist.clone(),
                s.source.clone(),
                s.path.display().to_string(),
            ]);
        }
        for f in &self.failed {
            rows.push([
                "FAILED".to_string(),
                f.name.clone(),
                f.artist.clone(),
                "-".to_string(),
                format!("{} attempt(s), see log", f.attempts),
            ]);
        }

        let header = ["Status", "Track", "Artist", "Source", "Details"].map(String::from);
        let mut widths = header.clone().map(|h| h.chars().count());
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        let _ = writeln!(out, "\nDownload summary:");
        for row in std::iter::once(&header).chain(rows.iter()) {
            let line = row
                .iter()
                .zip(widths)
                .map(|(cell, w)| format!("{:<w$}", cell, w = w))
                .collect::<Vec<_>>()
                .join("  ");
            let _ = writeln!(out, "{}", line.trim_end());
        }

        let _ = writeln!(
            out,
            "\n{} succeeded, {} failed.",
            self.succeeded.len(),
            self.failed.len()
        );
        if self.interrupted {
            let _ = writeln!(out, "Run interrupted; remaining tracks were not processed.");
        }
        if !self.failed.is_empty() {
            let _ = writeln!(
                out,
                "{} song(s) could not be processed. Check logs ({}) for details.",
                self.failed.len(),
                log_file.display()
            );
        }
        out
    }
}
