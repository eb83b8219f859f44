//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `rip`: resolve a playlist and acquire every track
//! - `tools`: external tool and credential checks
//! - `verify`: re-validate a download directory

mod rip;
mod tools;
mod verify;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::config::Config;

pub use rip::cmd_rip;
pub use tools::cmd_check_tools;
pub use verify::cmd_verify;

/// Download a Spotify playlist as tagged MP3s from public sources
#[derive(Parser)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Playlist URL, URI or bare id
    pub playlist_url: Option<String>,

    /// Output directory (defaults to the configured download directory)
    pub download_dir: Option<PathBuf>,

    /// Tracks to process concurrently (overrides config)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Check that yt-dlp and ffmpeg are installed and credentials are set
    CheckTools,
    /// Re-validate every audio file in a download directory
    Verify {
        /// Download directory to check
        path: PathBuf,
        /// Show valid files too
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Run the command selected on the command line.
pub fn run_command(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let rt = Runtime::new()?;

    match &cli.command {
        Some(Commands::CheckTools) => cmd_check_tools(&rt, config),
        Some(Commands::Verify { path, verbose }) => cmd_verify(config, path, *verbose),
        None => {
            let Some(playlist_url) = cli.playlist_url.as_deref() else {
                anyhow::bail!("No playlist given. Usage: playlist-ripper <PLAYLIST_URL> [DOWNLOAD_DIR]");
            };
            let download_dir = cli
                .download_dir
                .clone()
                .unwrap_or_else(|| config.download.directory.clone());
            let jobs = cli.jobs.unwrap_or(config.acquisition.jobs);
            cmd_rip(&rt, config, playlist_url, &download_dir, jobs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rip_arguments() {
        let cli = Cli::try_parse_from([
            "playlist-ripper",
            "https://open.spotify.com/playlist/abc",
            "/music",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.playlist_url.as_deref(), Some("https://open.spotify.com/playlist/abc"));
        assert_eq!(cli.download_dir, Some(PathBuf::from("/music")));
    }

    #[test]
    fn test_download_dir_is_optional() {
        let cli = Cli::try_parse_from(["playlist-ripper", "spotify:playlist:abc", "-j", "4"]).unwrap();
        assert!(cli.download_dir.is_none());
        assert_eq!(cli.jobs, Some(4));
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["playlist-ripper", "check-tools"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckTools)));

        let cli = Cli::try_parse_from(["playlist-ripper", "verify", "/music", "-v"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Verify { ref path, verbose: true }) if path == &PathBuf::from("/music")
        ));
    }
}
