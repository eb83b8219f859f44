//! Transcode-and-tag step.
//!
//! [`FfmpegTranscoder`] drives the `ffmpeg` executable to produce the target
//! format at a constant bitrate, then embeds tags and cover art with lofty.
//! Any failure removes whatever was written at the output path.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{AudioError, TagSet, apply_tags, is_lossless};
use crate::config::Config;

/// Everything needed to produce one artifact.
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Target format, e.g. "mp3"
    pub target_format: String,
    /// Target bitrate as passed to the encoder, e.g. "320k"
    pub target_bitrate: String,
    pub tags: TagSet,
    pub cover: Option<PathBuf>,
}

/// Codec backend.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Converts `request.input` into `request.output` with tags applied.
    ///
    /// On error nothing is left at `request.output`.
    async fn transcode(&self, request: &TranscodeRequest) -> Result<(), AudioError>;
}

/// Transcoder backed by the `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Uses the configured binary, bounded by the download timeout.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.tools.ffmpeg,
            Duration::from_secs(config.acquisition.download_timeout_secs),
        )
    }

    /// First line of `ffmpeg -version`.
    pub async fn version(&self) -> Result<String, AudioError> {
        let child = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(Duration::from_secs(10), child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AudioError::ToolMissing(self.program.clone()));
            }
            Ok(Err(e)) => return Err(AudioError::Io(e)),
            Err(_) => return Err(AudioError::Timeout(Duration::from_secs(10))),
        };
        if !output.status.success() {
            return Err(AudioError::Transcode(format!("ffmpeg exited with {}", output.status)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    fn args(request: &TranscodeRequest) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            request.input.to_string_lossy().into_owned(),
            "-vn".into(),
            "-map_metadata".into(),
            "-1".into(),
            "-codec:a".into(),
            encoder_for(&request.target_format).into(),
        ];
        if !is_lossless(&request.target_format) {
            args.push("-b:a".into());
            args.push(request.target_bitrate.clone());
        }
        args.push(request.output.to_string_lossy().into_owned());
        args
    }

    async fn run_ffmpeg(&self, request: &TranscodeRequest) -> Result<(), AudioError> {
        let child = Command::new(&self.program)
            .args(Self::args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AudioError::ToolMissing(self.program.clone()));
            }
            Ok(Err(e)) => return Err(AudioError::Io(e)),
            Err(_) => return Err(AudioError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioError::Transcode(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        if !request.output.exists() {
            return Err(AudioError::Transcode(format!(
                "ffmpeg produced no output at {}",
                request.output.display()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, request: &TranscodeRequest) -> Result<(), AudioError> {
        let result = match self.run_ffmpeg(request).await {
            Ok(()) => tag_output(request).await,
            Err(e) => Err(e),
        };
        if result.is_err() {
            remove_partial(&request.output);
        }
        result
    }
}

/// lofty rewrites the whole file, so tagging runs on the blocking pool.
async fn tag_output(request: &TranscodeRequest) -> Result<(), AudioError> {
    let output = request.output.clone();
    let tags = request.tags.clone();
    let cover = request.cover.clone();
    tokio::task::spawn_blocking(move || apply_tags(&output, &tags, cover.as_deref()))
        .await
        .map_err(|e| AudioError::Tagging(format!("tagging task failed: {}", e)))?
}

/// ffmpeg encoder name for a target format.
fn encoder_for(format: &str) -> &'static str {
    match format {
        "flac" => "flac",
        "ogg" => "libvorbis",
        "aac" | "m4a" => "aac",
        "wav" => "pcm_s16le",
        _ => "libmp3lame",
    }
}

fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "Could not remove partial output: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn request(dir: &Path) -> TranscodeRequest {
        TranscodeRequest {
            input: dir.join("raw.webm"),
            output: dir.join("Artist_-_Song.mp3"),
            target_format: "mp3".to_string(),
            target_bitrate: "320k".to_string(),
            tags: TagSet::default(),
            cover: None,
        }
    }

    #[test]
    fn test_mp3_args() {
        let req = request(Path::new("/tmp"));
        let args = FfmpegTranscoder::args(&req);
        let joined = args.join(" ");
        assert!(joined.contains("-vn"));
        assert!(joined.contains("-codec:a libmp3lame"));
        assert!(joined.contains("-b:a 320k"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/Artist_-_Song.mp3"));
    }

    #[test]
    fn test_lossless_has_no_bitrate() {
        let mut req = request(Path::new("/tmp"));
        req.target_format = "flac".to_string();
        let args = FfmpegTranscoder::args(&req);
        assert!(!args.contains(&"-b:a".to_string()));
        assert!(args.contains(&"flac".to_string()));
    }

    #[test]
    fn test_from_config_follows_download_timeout() {
        let mut config = Config::default();
        config.tools.ffmpeg = "/opt/ffmpeg/bin/ffmpeg".to_string();
        config.acquisition.download_timeout_secs = 42;

        let transcoder = FfmpegTranscoder::from_config(&config);
        assert_eq!(transcoder.program, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(transcoder.timeout, Duration::from_secs(42));
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_missing() {
        let temp = tempdir().unwrap();
        let req = request(temp.path());
        let transcoder =
            FfmpegTranscoder::new("definitely-not-ffmpeg-xyz", Duration::from_secs(5));

        let result = transcoder.transcode(&req).await;
        assert!(matches!(result, Err(AudioError::ToolMissing(_))));
    }

    #[tokio::test]
    async fn test_tag_output_reports_tagging_error() {
        let temp = tempdir().unwrap();
        let req = request(temp.path());
        std::fs::write(&req.output, b"not audio at all").unwrap();

        let result = tag_output(&req).await;
        assert!(matches!(result, Err(AudioError::Tagging(_))));
        // Removing partial output is the caller's job
        assert!(req.output.exists());
    }

    #[tokio::test]
    async fn test_failure_removes_partial_output() {
        let temp = tempdir().unwrap();
        let req = request(temp.path());
        std::fs::write(&req.output, b"partial").unwrap();

        let transcoder =
            FfmpegTranscoder::new("definitely-not-ffmpeg-xyz", Duration::from_secs(5));
        assert!(transcoder.transcode(&req).await.is_err());
        assert!(!req.output.exists());
    }
}
