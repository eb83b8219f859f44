//! External tool and credential checks.

use std::time::Duration;
use tokio::runtime::Runtime;

use crate::audio::FfmpegTranscoder;
use crate::config::{self, Config};
use crate::sources::YtDlpProvider;

/// Report whether yt-dlp, ffmpeg and the Spotify credentials are available.
pub fn cmd_check_tools(rt: &Runtime, config: &Config) -> anyhow::Result<()> {
    println!("Checking external tools...\n");

    let (yt_dlp, ffmpeg) = rt.block_on(async {
        let yt_dlp = YtDlpProvider::new(&config.tools.yt_dlp).version().await;
        let ffmpeg = FfmpegTranscoder::new(&config.tools.ffmpeg, Duration::from_secs(10))
            .version()
            .await;
        (yt_dlp, ffmpeg)
    });

    match yt_dlp {
        Ok(version) => println!("✓ yt-dlp: {}", version),
        Err(e) => {
            println!("✗ yt-dlp: {}", e);
            println!("  Install: pip install yt-dlp  (or your package manager)");
        }
    }
    match ffmpeg {
        Ok(version) => println!("✓ ffmpeg: {}", version),
        Err(e) => {
            println!("✗ ffmpeg: {}", e);
            println!("  Windows: winget install Gyan.FFmpeg");
            println!("  macOS:   brew install ffmpeg");
            println!("  Linux:   apt install ffmpeg");
        }
    }

    println!();
    println!("Credentials:");
    if config.credentials.spotify().is_some() {
        println!("✓ Spotify client ID and secret: set");
    } else {
        println!("✗ Spotify client ID and secret: not set");
        println!("  Set SPOTIPY_CLIENT_ID and SPOTIPY_CLIENT_SECRET, or add them to the config file.");
        println!("  Create an app at: https://developer.spotify.com/dashboard");
    }

    println!();
    match config::config_path() {
        Some(path) if path.exists() => println!("Config: {}", path.display()),
        Some(path) => println!("Config: {} (not present, using defaults)", path.display()),
        None => println!("Config: no config directory on this platform"),
    }
    for warning in config.validate() {
        println!("  warning: {}", warning);
    }

    Ok(())
}
