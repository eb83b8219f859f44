//! Test utilities and fixtures for playlist-ripper tests.
//!
//! Scripted stand-ins for the external tools (search provider, transcoder,
//! media probe, cover fetcher) so acquisition can be driven end-to-end
//! without network access or ffmpeg.
//!
//! # Example
//!
//! ```ignore
//! use playlist_ripper::test_utils::{MockProvider, mock_track};
//!
//! let provider = MockProvider::new()
//!     .with_search("scsearch", vec![SearchCandidate::new("Song", "https://a/1")]);
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::acquisition::{CoverError, CoverFetcher};
use crate::audio::{AudioError, MediaProbe, ProbeReport, TranscodeRequest, Transcoder};
use crate::model::{SearchCandidate, TrackDescriptor};
use crate::sources::{ProviderError, SearchProvider};

/// Creates a mock TrackDescriptor: "Song" by "Artist", 200 seconds.
///
/// Customize with the builder methods:
///
/// ```ignore
/// let track = mock_track().with_album("Album");
/// ```
pub fn mock_track() -> TrackDescriptor {
    TrackDescriptor::new("Song", "Artist", 200_000).expect("valid mock track")
}

#[derive(Debug, Clone)]
enum DownloadBehavior {
    Fail,
    /// Reports success without writing anything
    Missing,
}

/// Scripted search provider.
///
/// Searches return the candidates registered for the hint (none by default).
/// Probes return the registered bitrate (`Ok(None)` by default). Downloads
/// write a small file at the template with a `webm` extension unless a
/// locator is scripted otherwise.
#[derive(Default)]
pub struct MockProvider {
    searches: HashMap<String, Result<Vec<SearchCandidate>, String>>,
    probes: HashMap<String, Result<Option<f64>, String>>,
    downloads: HashMap<String, DownloadBehavior>,
    search_calls: AtomicUsize,
    probe_calls: AtomicUsize,
    download_calls: AtomicUsize,
    searched_hints: Mutex<Vec<String>>,
    downloaded_locators: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, hint: &str, candidates: Vec<SearchCandidate>) -> Self {
        self.searches.insert(hint.to_string(), Ok(candidates));
        self
    }

    pub fn with_search_error(mut self, hint: &str) -> Self {
        self.searches
            .insert(hint.to_string(), Err("mock search failure".to_string()));
        self
    }

    pub fn with_probe(mut self, locator: &str, kbps: Option<f64>) -> Self {
        self.probes.insert(locator.to_string(), Ok(kbps));
        self
    }

    pub fn with_probe_error(mut self, locator: &str) -> Self {
        self.probes
            .insert(locator.to_string(), Err("mock probe failure".to_string()));
        self
    }

    pub fn with_download_error(mut self, locator: &str) -> Self {
        self.downloads
            .insert(locator.to_string(), DownloadBehavior::Fail);
        self
    }

    pub fn with_missing_download(mut self, locator: &str) -> Self {
        self.downloads
            .insert(locator.to_string(), DownloadBehavior::Missing);
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.search_calls() + self.probe_calls() + self.download_calls()
    }

    /// Hints searched, in call order.
    pub fn searched_hints(&self) -> Vec<String> {
        self.searched_hints.lock().unwrap().clone()
    }

    /// Locators that reached `download`, in call order.
    pub fn downloaded_locators(&self) -> Vec<String> {
        self.downloaded_locators.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for MockProvider {
    async fn search(
        &self,
        _query: &str,
        source_hint: &str,
        max_results: usize,
    ) -> Result<Vec<SearchCandidate>, ProviderError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.searched_hints
            .lock()
            .unwrap()
            .push(source_hint.to_string());

        match self.searches.get(source_hint) {
            Some(Ok(candidates)) => Ok(candidates.iter().take(max_results).cloned().collect()),
            Some(Err(msg)) => Err(ProviderError::ExtractionFailed(msg.clone())),
            None => Ok(vec![]),
        }
    }

    async fn probe_bitrate(&self, locator: &str) -> Result<Option<f64>, ProviderError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        match self.probes.get(locator) {
            Some(Ok(kbps)) => Ok(*kbps),
            Some(Err(msg)) => Err(ProviderError::ExtractionFailed(msg.clone())),
            None => Ok(None),
        }
    }

    async fn download(
        &self,
        locator: &str,
        destination_template: &Path,
    ) -> Result<Option<PathBuf>, ProviderError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.downloaded_locators
            .lock()
            .unwrap()
            .push(locator.to_string());

        match self.downloads.get(locator) {
            Some(DownloadBehavior::Fail) => {
                Err(ProviderError::ExtractionFailed("mock download failure".to_string()))
            }
            Some(DownloadBehavior::Missing) => Ok(None),
            None => {
                let path = PathBuf::from(
                    destination_template
                        .to_string_lossy()
                        .replace("%(ext)s", "webm"),
                );
                std::fs::write(&path, b"raw audio")?;
                Ok(Some(path))
            }
        }
    }
}

/// Transcoder that writes a placeholder output, or fails on demand.
///
/// Failing calls still leave a partial file behind, like an interrupted
/// encoder would.
#[derive(Default)]
pub struct MockTranscoder {
    failures_left: AtomicUsize,
    calls: AtomicUsize,
    covers_seen: Mutex<Vec<Option<PathBuf>>>,
}

impl MockTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` calls fail.
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Cover path of every request, in call order.
    pub fn covers_seen(&self) -> Vec<Option<PathBuf>> {
        self.covers_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    async fn transcode(&self, request: &TranscodeRequest) -> Result<(), AudioError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.covers_seen.lock().unwrap().push(request.cover.clone());

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            std::fs::write(&request.output, b"partial")?;
            return Err(AudioError::Transcode("mock encoder failure".to_string()));
        }

        std::fs::write(&request.output, b"encoded audio")?;
        Ok(())
    }
}

/// Media probe answering from registered reports.
///
/// Unknown paths fail to probe; unregistered decodes fail to decode.
#[derive(Default)]
pub struct MockProbe {
    reports: Mutex<HashMap<PathBuf, Vec<ProbeReport>>>,
    decoded: Mutex<HashMap<PathBuf, u64>>,
    decode_calls: AtomicUsize,
    threads: Mutex<Vec<std::thread::ThreadId>>,
}

impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, path: &Path, report: ProbeReport) {
        self.set_sequence(path, vec![report]);
    }

    /// Successive probes of `path` return these in order; the last one repeats.
    pub fn set_sequence(&self, path: &Path, reports: Vec<ProbeReport>) {
        self.reports
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), reports);
    }

    pub fn set_decoded(&self, path: &Path, duration_ms: u64) {
        self.decoded
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), duration_ms);
    }

    pub fn decode_calls(&self) -> usize {
        self.decode_calls.load(Ordering::SeqCst)
    }

    /// Thread of every metadata read, in order.
    pub fn threads_seen(&self) -> Vec<std::thread::ThreadId> {
        self.threads.lock().unwrap().clone()
    }
}

impl MediaProbe for MockProbe {
    fn probe(&self, path: &Path) -> Result<ProbeReport, AudioError> {
        self.threads.lock().unwrap().push(std::thread::current().id());
        let mut reports = self.reports.lock().unwrap();
        let queue = reports
            .get_mut(path)
            .ok_or_else(|| AudioError::Probe(format!("no mock report for {}", path.display())))?;
        match queue.len() {
            0 => Err(AudioError::Probe("empty mock sequence".to_string())),
            1 => Ok(queue[0].clone()),
            _ => Ok(queue.remove(0)),
        }
    }

    fn decode_duration_ms(&self, path: &Path) -> Result<u64, AudioError> {
        self.decode_calls.fetch_add(1, Ordering::SeqCst);
        self.decoded
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .ok_or_else(|| AudioError::Decode("no mock decode".to_string()))
    }
}

/// Cover fetcher that writes a placeholder image, or fails when told to.
#[derive(Default)]
pub struct MockCoverFetcher {
    failing: std::sync::atomic::AtomicBool,
    calls: AtomicUsize,
}

impl MockCoverFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoverFetcher for MockCoverFetcher {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, CoverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoverError::Status(404));
        }
        let path = dest_dir.join(format!("cover{}", crate::acquisition::cover_suffix(url)));
        std::fs::write(&path, b"image")?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_track_defaults() {
        let track = mock_track();
        assert_eq!(track.name, "Song");
        assert_eq!(track.artist, "Artist");
        assert_eq!(track.duration_ms, 200_000);
    }

    #[tokio::test]
    async fn test_mock_provider_default_download_writes_file() {
        let temp = tempfile::tempdir().unwrap();
        let provider = MockProvider::new();
        let template = temp.path().join("x_attempt_1.%(ext)s");

        let path = provider.download("u", &template).await.unwrap().unwrap();
        assert_eq!(path, temp.path().join("x_attempt_1.webm"));
        assert!(path.exists());
        assert_eq!(provider.download_calls(), 1);
    }

    #[test]
    fn test_mock_probe_sequence_repeats_last() {
        let probe = MockProbe::new();
        let path = Path::new("/x.mp3");
        let report = |bps| ProbeReport {
            format_name: "mp3".to_string(),
            bitrate_bps: Some(bps),
            duration_ms: None,
        };
        probe.set_sequence(path, vec![report(1), report(2)]);

        assert_eq!(probe.probe(path).unwrap().bitrate_bps, Some(1));
        assert_eq!(probe.probe(path).unwrap().bitrate_bps, Some(2));
        assert_eq!(probe.probe(path).unwrap().bitrate_bps, Some(2));
        assert!(probe.probe(Path::new("/other.mp3")).is_err());
    }
}
