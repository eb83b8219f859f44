//! Re-validate a download directory.

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::audio::{ArtifactValidator, LoftyProbe, ValidationPolicy};
use crate::config::Config;
use crate::model::TrackSidecar;

/// Per-file verification result.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyEntry {
    pub path: PathBuf,
    /// Expected duration from the sidecar, when one was readable
    pub expected_duration_ms: Option<u64>,
    /// `None` when valid, otherwise why not
    pub problem: Option<String>,
}

/// Check every audio file in `path` against the validation policy.
pub fn cmd_verify(config: &Config, path: &Path, verbose: bool) -> anyhow::Result<()> {
    if !path.is_dir() {
        anyhow::bail!("{} is not a directory", path.display());
    }

    let validator = ArtifactValidator::new(Arc::new(LoftyProbe), ValidationPolicy::from_config(config));
    let entries = verify_dir(&validator, path, &config.audio_format());

    let mut invalid = 0;
    for entry in &entries {
        match &entry.problem {
            Some(problem) => {
                invalid += 1;
                println!("✗ {}: {}", entry.path.display(), problem);
            }
            None if verbose => println!("✓ {}", entry.path.display()),
            None => {}
        }
    }

    println!(
        "\n{} file(s) checked: {} valid, {} invalid.",
        entries.len(),
        entries.len() - invalid,
        invalid
    );
    if invalid > 0 {
        println!("Re-run the playlist to replace invalid files.");
    }
    Ok(())
}

/// Validates every `*.{format}` file directly under `dir`, in path order.
///
/// Workspace directories are skipped.
pub fn verify_dir(validator: &ArtifactValidator, dir: &Path, format: &str) -> Vec<VerifyEntry> {
    let files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(format))
        })
        .collect();

    files
        .into_par_iter()
        .map(|path| {
            let expected_duration_ms = sidecar_duration(&path.with_extension("json"));
            let tolerance = validator.policy().duration_tolerance_ms;
            let problem = validator
                .inspect(&path, expected_duration_ms, tolerance)
                .err()
                .map(|e| e.to_string());
            VerifyEntry {
                path,
                expected_duration_ms,
                problem,
            }
        })
        .collect()
}

fn sidecar_duration(path: &Path) -> Option<u64> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<TrackSidecar>(&contents) {
        Ok(sidecar) => Some(sidecar.track.duration_ms),
        Err(e) => {
            tracing::debug!(path = %path.display(), "Unusable sidecar: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::write_sidecar;
    use crate::audio::ProbeReport;
    use crate::test_utils::{MockProbe, mock_track};
    use tempfile::tempdir;

    fn mp3(duration_ms: u64) -> ProbeReport {
        ProbeReport {
            format_name: "mp3".to_string(),
            bitrate_bps: Some(320_000),
            duration_ms: Some(duration_ms),
        }
    }

    #[test]
    fn test_verify_dir_uses_sidecar_duration() {
        let temp = tempdir().unwrap();
        let good = temp.path().join("A_-_Good.mp3");
        let short = temp.path().join("B_-_Short.mp3");
        for path in [&good, &short] {
            std::fs::write(path, b"audio").unwrap();
            write_sidecar(&path.with_extension("json"), &mock_track(), "YouTube").unwrap();
        }
        std::fs::write(temp.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(temp.path().join("_temp_dl_x")).unwrap();

        let probe = Arc::new(MockProbe::new());
        probe.set(&good, mp3(200_500));
        probe.set(&short, mp3(150_000));
        let validator = ArtifactValidator::new(probe, ValidationPolicy::default());

        let entries = verify_dir(&validator, temp.path(), "mp3");

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, good);
        assert_eq!(entries[0].expected_duration_ms, Some(200_000));
        assert!(entries[0].problem.is_none());
        assert_eq!(entries[1].path, short);
        assert!(entries[1].problem.is_some());
    }

    #[test]
    fn test_missing_sidecar_skips_duration_check() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("Orphan.mp3");
        std::fs::write(&path, b"audio").unwrap();

        let probe = Arc::new(MockProbe::new());
        probe.set(&path, mp3(10_000));
        let validator = ArtifactValidator::new(probe, ValidationPolicy::default());

        let entries = verify_dir(&validator, temp.path(), "mp3");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].expected_duration_ms, None);
        assert!(entries[0].problem.is_none());
    }

    #[test]
    fn test_verify_rejects_non_directory() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("f.mp3");
        std::fs::write(&file, b"x").unwrap();
        assert!(cmd_verify(&Config::default(), &file, false).is_err());
    }
}
