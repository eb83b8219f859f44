//! Configuration system using TOML files plus environment overrides.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\playlist-ripper\config.toml
//! - macOS: ~/Library/Application Support/playlist-ripper/config.toml
//! - Linux: ~/.config/playlist-ripper/config.toml
//!
//! The config file is optional. Environment variables win over the file so
//! credentials never have to be written to disk:
//!
//! | Variable | Field |
//! |---|---|
//! | `SPOTIPY_CLIENT_ID` | `credentials.spotify_client_id` |
//! | `SPOTIPY_CLIENT_SECRET` | `credentials.spotify_client_secret` |
//! | `DEFAULT_DOWNLOAD_DIR` | `download.directory` |
//! | `DEFAULT_AUDIO_FORMAT` | `download.audio_format` |
//! | `DEFAULT_AUDIO_BITRATE` | `download.audio_bitrate` |
//! | `LOG_LEVEL` | `logging.level` |
//! | `LOG_FILE` | `logging.file` |
//!
//! The resolved [`Config`] is built once in `main` and passed by reference
//! into the pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API credentials
    pub credentials: Credentials,

    /// Output location and target encoding
    pub download: DownloadConfig,

    /// Source ordering and acceptance thresholds
    pub acquisition: AcquisitionConfig,

    /// External executables
    pub tools: ToolsConfig,

    /// Log file settings
    pub logging: LoggingConfig,
}

/// API credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Spotify client ID (client-credentials grant)
    pub spotify_client_id: Option<String>,
    /// Spotify client secret
    pub spotify_client_secret: Option<String>,
}

impl Credentials {
    /// Both halves of the Spotify credentials, if present and non-blank.
    pub fn spotify(&self) -> Option<(&str, &str)> {
        let id = self.spotify_client_id.as_deref().filter(|s| !s.trim().is_empty())?;
        let secret = self
            .spotify_client_secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())?;
        Some((id, secret))
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Default download directory (used when none is given on the command line)
    pub directory: PathBuf,

    /// Target container/codec, also the output file extension
    pub audio_format: String,

    /// Target bitrate as `<kbps>k`, e.g. "320k"
    pub audio_bitrate: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("Downloads"),
            audio_format: "mp3".to_string(),
            audio_bitrate: "320k".to_string(),
        }
    }
}

/// A search source, tried in list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Display name, recorded as `download_source` in the sidecar
    pub name: String,
    /// Provider search prefix (yt-dlp extractor key, e.g. "scsearch")
    pub search_prefix: String,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, search_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            search_prefix: search_prefix.into(),
        }
    }
}

/// Acquisition pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Sources in priority order
    pub sources: Vec<SourceConfig>,

    /// Ranked candidates requested per source
    pub max_results_per_source: usize,

    /// Candidates reporting a shorter duration are skipped (snippets/teasers)
    pub min_duration_s: f64,

    /// Candidates reporting a lower source bitrate are skipped
    pub min_bitrate_kbps: f64,

    /// Allowed deviation between expected and actual duration
    pub duration_tolerance_ms: u64,

    /// Allowed deviation around the target bitrate
    pub bitrate_tolerance_bps: u32,

    /// Cover art fetch timeout
    pub cover_timeout_secs: u64,

    /// Search and bitrate probe timeout
    pub search_timeout_secs: u64,

    /// Download and transcode timeout
    pub download_timeout_secs: u64,

    /// Tracks processed concurrently (1 = strictly sequential)
    pub jobs: usize,

    /// Minimum spacing between outbound provider requests
    pub request_interval_ms: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                SourceConfig::new("SoundCloud", "scsearch"),
                SourceConfig::new("YouTube", "ytsearch"),
            ],
            max_results_per_source: 3,
            min_duration_s: 45.0,
            min_bitrate_kbps: 128.0,
            duration_tolerance_ms: 5000,
            bitrate_tolerance_bps: 5000,
            cover_timeout_secs: 10,
            search_timeout_secs: 60,
            download_timeout_secs: 600,
            jobs: 1,
            request_interval_ms: 0,
        }
    }
}

/// External tool locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub yt_dlp: String,
    pub ffmpeg: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp: "yt-dlp".to_string(),
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

/// Log file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of DEBUG, INFO, WARNING, ERROR, CRITICAL (case-insensitive)
    pub level: String,
    /// Log file, appended to
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: PathBuf::from("music_ripper.log"),
        }
    }
}

const KNOWN_FORMATS: &[&str] = &["mp3", "wav", "flac", "aac", "ogg", "m4a"];
const LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

impl Config {
    /// Apply environment overrides using the given lookup.
    ///
    /// Takes a lookup function so tests don't have to mutate process env.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SPOTIPY_CLIENT_ID") {
            self.credentials.spotify_client_id = Some(v);
        }
        if let Some(v) = lookup("SPOTIPY_CLIENT_SECRET") {
            self.credentials.spotify_client_secret = Some(v);
        }
        if let Some(v) = lookup("DEFAULT_DOWNLOAD_DIR") {
            self.download.directory = PathBuf::from(v);
        }
        if let Some(v) = lookup("DEFAULT_AUDIO_FORMAT") {
            self.download.audio_format = v;
        }
        if let Some(v) = lookup("DEFAULT_AUDIO_BITRATE") {
            self.download.audio_bitrate = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("LOG_FILE") {
            self.logging.file = PathBuf::from(v);
        }
    }

    /// Check for likely misconfiguration.
    ///
    /// Never fails: returns human-readable warnings for the caller to log.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.download.directory.as_os_str().is_empty()
            || self.download.directory.to_string_lossy().trim().is_empty()
        {
            warnings.push(format!(
                "download.directory={:?} looks invalid",
                self.download.directory
            ));
        }

        let format = self.download.audio_format.trim().to_lowercase();
        if format.is_empty() {
            warnings.push("download.audio_format is empty".to_string());
        } else if !KNOWN_FORMATS.contains(&format.as_str()) {
            warnings.push(format!(
                "download.audio_format={:?} is not a commonly recognized format (known: {})",
                self.download.audio_format,
                KNOWN_FORMATS.join(", ")
            ));
        }

        if parse_bitrate_kbps(&self.download.audio_bitrate).is_none() {
            warnings.push(format!(
                "download.audio_bitrate={:?} does not match the expected pattern like \"320k\"",
                self.download.audio_bitrate
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.trim().to_uppercase().as_str()) {
            warnings.push(format!(
                "logging.level={:?} is not one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }

        if self.logging.file.to_string_lossy().trim().is_empty() {
            warnings.push("logging.file is empty".to_string());
        }

        if self.acquisition.sources.is_empty() {
            warnings.push("acquisition.sources is empty; nothing will be downloaded".to_string());
        }

        if self.acquisition.jobs == 0 {
            warnings.push("acquisition.jobs=0 treated as 1".to_string());
        }

        warnings
    }

    /// Target bitrate in bits per second, falling back to 320k when unparseable.
    pub fn audio_bitrate_bps(&self) -> u32 {
        parse_bitrate_kbps(&self.download.audio_bitrate)
            .and_then(|kbps| kbps.checked_mul(1000))
            .unwrap_or(320_000)
    }

    /// Normalized target format ("mp3").
    pub fn audio_format(&self) -> String {
        let format = self.download.audio_format.trim().to_lowercase();
        if format.is_empty() {
            "mp3".to_string()
        } else {
            format
        }
    }

    /// Log file with its file name sanitized; the parent directory is kept.
    pub fn log_file_path(&self) -> PathBuf {
        let file = &self.logging.file;
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "music_ripper.log".to_string());
        let sanitized = crate::organizer::sanitize_or_fallback(&name);
        match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(sanitized),
            _ => PathBuf::from(sanitized),
        }
    }

    /// `tracing` directive equivalent of the configured log level.
    pub fn tracing_level(&self) -> &'static str {
        match self.logging.level.trim().to_uppercase().as_str() {
            "DEBUG" => "debug",
            "WARNING" | "WARN" => "warn",
            "ERROR" | "CRITICAL" => "error",
            _ => "info",
        }
    }
}

/// Parse a bitrate like "320k" into kbps.
pub fn parse_bitrate_kbps(value: &str) -> Option<u32> {
    let value = value.trim();
    let digits = value
        .strip_suffix('k')
        .or_else(|| value.strip_suffix('K'))?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    // Must still fit in u32 once converted to bits per second
    digits
        .parse::<u32>()
        .ok()
        .filter(|&kbps| kbps > 0 && kbps.checked_mul(1000).is_some())
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("playlist-ripper"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk, then apply environment overrides.
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let mut config = load_file();
    config.apply_env(|key| std::env::var(key).ok());
    config
}

fn load_file() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::debug!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
