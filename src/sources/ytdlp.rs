//! yt-dlp backed search provider.
//!
//! - search: `yt-dlp -J --no-playlist "{hint}{n}:{query}"`
//! - probe:  `yt-dlp -J -f bestaudio/best URL`
//! - fetch:  `yt-dlp -f bestaudio/best -o TEMPLATE --print after_move:filepath URL`

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use super::dto::InfoDto;
use super::{ProviderError, SearchProvider, Throttle};
use crate::model::SearchCandidate;

const FORMAT: &str = "bestaudio/best";

/// Drives the `yt-dlp` executable.
#[derive(Debug)]
pub struct YtDlpProvider {
    program: String,
    search_timeout: Duration,
    download_timeout: Duration,
    throttle: Throttle,
}

impl YtDlpProvider {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            search_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(600),
            throttle: Throttle::disabled(),
        }
    }

    pub fn with_timeouts(mut self, search: Duration, download: Duration) -> Self {
        self.search_timeout = search;
        self.download_timeout = download;
        self
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    /// `yt-dlp --version`, for the `check-tools` command.
    pub async fn version(&self) -> Result<String, ProviderError> {
        let output = self
            .run(vec!["--version".into()], Duration::from_secs(10))
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run(&self, args: Vec<OsString>, timeout: Duration) -> Result<Output, ProviderError> {
        self.throttle.wait().await;

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProviderError::ToolMissing(self.program.clone()));
            }
            Ok(Err(e)) => return Err(ProviderError::Io(e)),
            Err(_) => return Err(ProviderError::Timeout(timeout)),
        };

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }
        Ok(output)
    }

    async fn dump_json(&self, args: Vec<OsString>) -> Result<InfoDto, ProviderError> {
        let output = self.run(args, self.search_timeout).await?;
        serde_json::from_slice(&output.stdout).map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

#[async_trait]
impl SearchProvider for YtDlpProvider {
    async fn search(
        &self,
        query: &str,
        source_hint: &str,
        max_results: usize,
    ) -> Result<Vec<SearchCandidate>, ProviderError> {
        let search = format!("{}{}:{}", source_hint, max_results, query);
        let info = self
            .dump_json(vec![
                "-J".into(),
                "--no-playlist".into(),
                "--no-warnings".into(),
                search.into(),
            ])
            .await?;

        Ok(info
            .into_entries()
            .into_iter()
            .take(max_results)
            .map(InfoDto::into_candidate)
            .collect())
    }

    async fn probe_bitrate(&self, locator: &str) -> Result<Option<f64>, ProviderError> {
        let info = self
            .dump_json(vec![
                "-J".into(),
                "--no-playlist".into(),
                "--no-warnings".into(),
                "-f".into(),
                FORMAT.into(),
                locator.into(),
            ])
            .await?;
        Ok(info.effective_bitrate_kbps())
    }

    async fn download(
        &self,
        locator: &str,
        destination_template: &Path,
    ) -> Result<Option<PathBuf>, ProviderError> {
        let output = self
            .run(
                vec![
                    "-f".into(),
                    FORMAT.into(),
                    "--no-playlist".into(),
                    "--no-warnings".into(),
                    "--no-simulate".into(),
                    "-o".into(),
                    destination_template.as_os_str().to_os_string(),
                    "--print".into(),
                    "after_move:filepath".into(),
                    locator.into(),
                ],
                self.download_timeout,
            )
            .await?;

        let printed = String::from_utf8_lossy(&output.stdout)
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(PathBuf::from);

        let path = match printed {
            Some(path) if path.exists() => Some(path),
            _ => find_by_template(destination_template),
        };
        Ok(path)
    }
}

/// Maps yt-dlp's stderr to an error kind.
fn classify_failure(stderr: &str) -> ProviderError {
    let message = stderr
        .lines()
        .rev()
        .find(|l| l.contains("ERROR"))
        .unwrap_or_else(|| stderr.trim())
        .trim()
        .to_string();
    let lower = message.to_lowercase();
    if lower.contains("404") || lower.contains("not found") || lower.contains("unavailable") {
        ProviderError::NotFound(message)
    } else {
        ProviderError::ExtractionFailed(message)
    }
}

/// Locates a file written for `template` (`{stem}.%(ext)s`) when yt-dlp didn't print it.
fn find_by_template(template: &Path) -> Option<PathBuf> {
    let dir = template.parent()?;
    let name = template.file_name()?.to_string_lossy();
    let stem = name.strip_suffix("%(ext)s").unwrap_or(&name);

    std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            path.is_file()
                && path
                    .file_name()
                    .map(|n| {
                        let n = n.to_string_lossy();
                        n.starts_with(stem) && !n.ends_with(".part")
                    })
                    .unwrap_or(false)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_classify_failure() {
        let stderr = "WARNING: something\nERROR: [soundcloud] foo: HTTP Error 404: Not Found\n";
        assert!(matches!(classify_failure(stderr), ProviderError::NotFound(_)));

        let stderr = "ERROR: [youtube] x: Sign in to confirm your age\n";
        match classify_failure(stderr) {
            ProviderError::ExtractionFailed(msg) => assert!(msg.contains("Sign in")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_find_by_template() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("Song_Artist_attempt_1.webm.part"), b"x").unwrap();
        std::fs::write(temp.path().join("Song_Artist_attempt_2.opus"), b"x").unwrap();

        let found = find_by_template(&temp.path().join("Song_Artist_attempt_2.%(ext)s"));
        assert_eq!(found, Some(temp.path().join("Song_Artist_attempt_2.opus")));

        assert_eq!(
            find_by_template(&temp.path().join("Song_Artist_attempt_1.%(ext)s")),
            None
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_missing() {
        let provider = YtDlpProvider::new("definitely-not-yt-dlp-xyz");
        let result = provider.search("Artist Song Audio", "scsearch", 3).await;
        assert!(matches!(result, Err(ProviderError::ToolMissing(_))));
        assert!(provider.version().await.is_err());
    }
}
