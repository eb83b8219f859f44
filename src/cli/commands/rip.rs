//! The default command: resolve a playlist and acquire every track.

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{error, info, warn};

use crate::acquisition::{Acquirer, AcquisitionSettings, HttpCoverFetcher, RunReport};
use crate::audio::{ArtifactValidator, FfmpegTranscoder, LoftyProbe, ValidationPolicy};
use crate::catalog::{CatalogApi, SpotifyClient};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::TrackDescriptor;
use crate::organizer::ensure_dir_exists;
use crate::sources::{self, Throttle, YtDlpProvider};

/// Rip `playlist_url` into `download_dir`.
///
/// Only configuration and catalog failures abort; per-track failures end up
/// in the printed report.
pub fn cmd_rip(
    rt: &Runtime,
    config: &Config,
    playlist_url: &str,
    download_dir: &Path,
    jobs: usize,
) -> anyhow::Result<()> {
    let Some((client_id, client_secret)) = config.credentials.spotify() else {
        return Err(Error::config(
            "Spotify credentials missing; set SPOTIPY_CLIENT_ID and SPOTIPY_CLIENT_SECRET",
        )
        .into());
    };

    rt.block_on(async {
        let catalog = SpotifyClient::new(client_id, client_secret).map_err(Error::from)?;
        let tracks = resolve_playlist(&catalog, playlist_url).await?;

        if tracks.is_empty() {
            warn!(playlist = %playlist_url, "Playlist has no usable tracks");
            println!("No tracks found in playlist or failed to fetch.");
            return Ok(());
        }

        if ensure_dir_exists(download_dir)
            .with_context(|| format!("Could not create {}", download_dir.display()))?
        {
            info!(path = %download_dir.display(), "Created download directory");
        }

        let acquirer = build_acquirer(config)?;
        println!(
            "Found {} tracks. Downloading to {}",
            tracks.len(),
            download_dir.display()
        );

        let mut report = RunReport::default();
        let interrupted = tokio::select! {
            _ = acquirer.acquire_all(&tracks, download_dir, jobs, &mut report) => false,
            _ = tokio::signal::ctrl_c() => true,
        };
        if interrupted {
            error!(
                processed = report.processed(),
                total = tracks.len(),
                "Interrupted, stopping"
            );
            report.interrupted = true;
        }

        print!("{}", report.render(&config.log_file_path()));
        anyhow::Ok(())
    })
}

/// Any catalog failure here is fatal for the run.
async fn resolve_playlist(
    catalog: &dyn CatalogApi,
    playlist_url: &str,
) -> Result<Vec<TrackDescriptor>> {
    info!(playlist = %playlist_url, "Fetching playlist");
    catalog
        .resolve(playlist_url)
        .await
        .map_err(|e| Error::from(e).context(format!("Could not fetch playlist {}", playlist_url)))
}

/// Wires the production collaborators from config.
fn build_acquirer(config: &Config) -> anyhow::Result<Acquirer> {
    let acq = &config.acquisition;

    let throttle = match acq.request_interval_ms {
        0 => Throttle::disabled(),
        ms => Throttle::new(Duration::from_millis(ms)),
    };
    let provider = YtDlpProvider::new(&config.tools.yt_dlp)
        .with_timeouts(
            Duration::from_secs(acq.search_timeout_secs),
            Duration::from_secs(acq.download_timeout_secs),
        )
        .with_throttle(throttle);

    let covers = HttpCoverFetcher::new(Duration::from_secs(acq.cover_timeout_secs))
        .context("Could not build HTTP client for cover art")?;

    Ok(Acquirer::new(
        sources::from_config(config, Arc::new(provider)),
        Arc::new(FfmpegTranscoder::from_config(config)),
        ArtifactValidator::new(Arc::new(LoftyProbe), ValidationPolicy::from_config(config)),
        Arc::new(covers),
        AcquisitionSettings::from_config(config),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::mocks::MockCatalog;
    use crate::test_utils::mock_track;

    #[test]
    fn test_missing_credentials_fail_before_network() {
        let rt = Runtime::new().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("out");

        let err = cmd_rip(&rt, &Config::default(), "spotify:playlist:abc", &dir, 1).unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
        // Nothing touched on disk
        assert!(!dir.exists());
    }

    fn assert_catalog_error(err: &Error) {
        let Error::WithContext { context, source } = err else {
            panic!("expected context, got {:?}", err);
        };
        assert!(context.contains("Could not fetch playlist"));
        assert!(matches!(**source, Error::Catalog(_)), "got {:?}", source);
    }

    #[tokio::test]
    async fn test_resolve_failure_is_catalog_error() {
        let err = resolve_playlist(&MockCatalog::failing(), "spotify:playlist:abc")
            .await
            .unwrap_err();
        assert_catalog_error(&err);

        let tracks = resolve_playlist(&MockCatalog::with_tracks(vec![mock_track()]), "x")
            .await
            .unwrap();
        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn test_bad_locator_aborts_before_touching_disk() {
        let rt = Runtime::new().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("out");
        let mut config = Config::default();
        config.credentials.spotify_client_id = Some("id".to_string());
        config.credentials.spotify_client_secret = Some("secret".to_string());

        let err = cmd_rip(&rt, &config, "not a playlist", &dir, 1).unwrap_err();
        let err = err.downcast_ref::<Error>().expect("application error");
        assert_catalog_error(err);
        assert!(!dir.exists());
    }

    #[test]
    fn test_build_acquirer_from_defaults() {
        assert!(build_acquirer(&Config::default()).is_ok());
    }
}
