//! Playlist Ripper - turn a Spotify playlist into a folder of tagged MP3s.
//!
//! Track metadata comes from the Spotify Web API. Audio comes from public
//! sources (SoundCloud, then YouTube by default) via yt-dlp, is transcoded
//! with ffmpeg, and is only kept once it passes format, bitrate and duration
//! validation.

pub mod acquisition;
pub mod audio;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod organizer;
pub mod sources;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    let config = config::load();

    init_logging(&config);
    for warning in config.validate() {
        tracing::warn!("Config: {}", warning);
    }

    cli::run_command(&args, &config)
}

/// Console output stays quiet so the summary table is readable; the log file
/// gets everything at the configured level.
fn init_logging(config: &config::Config) {
    let console_filter = EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());
    let console = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let log_path = config.log_file_path();
    let file_layer = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => {
            let directive = format!("playlist_ripper={}", config.tracing_level());
            let file_filter = EnvFilter::new(directive);
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Arc::new(file))
                    .with_filter(file_filter),
            )
        }
        Err(e) => {
            eprintln!("Could not open log file {}: {}", log_path.display(), e);
            None
        }
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .init();
}
