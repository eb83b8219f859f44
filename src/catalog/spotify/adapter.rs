//! Adapter layer: Convert Spotify DTOs to domain models
//!
//! This is the ONLY place where Spotify DTO types become [`TrackDescriptor`]s.

use super::dto;
use crate::model::TrackDescriptor;

/// Convert one playlist track, or `None` when it lacks name, artists or duration.
pub fn to_track(track: dto::Track) -> Option<TrackDescriptor> {
    let name = track.name.filter(|n| !n.trim().is_empty())?;
    if track.artists.is_empty() {
        return None;
    }
    let artist = track
        .artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let duration_ms = track.duration_ms.filter(|&ms| ms > 0)?;

    let mut descriptor = match TrackDescriptor::new(name, artist, duration_ms) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            tracing::debug!("Dropping track: {}", e);
            return None;
        }
    };

    if let Some(album) = track.album {
        descriptor.album = album.name;
        descriptor.year = album
            .release_date
            .as_deref()
            .and_then(|d| d.split('-').next())
            .filter(|y| !y.is_empty())
            .map(str::to_string);
        descriptor.cover_art_url = album.images.into_iter().next().map(|i| i.url);
    }
    descriptor.track_number = track.track_number.filter(|&n| n > 0).map(|n| n.to_string());
    descriptor.external_id = track.id;

    Some(descriptor)
}

/// Convert a page of playlist items, logging each dropped entry.
pub fn to_tracks(items: Vec<dto::PlaylistItem>) -> Vec<TrackDescriptor> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let Some(track) = item.track else {
                tracing::debug!(index = i, "Dropping playlist item without track");
                return None;
            };
            let label = track.name.clone().unwrap_or_default();
            let converted = to_track(track);
            if converted.is_none() {
                tracing::debug!(index = i, name = %label, "Dropping track missing name, artists or duration");
            }
            converted
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> dto::Track {
        dto::Track {
            id: Some("id1".to_string()),
            name: Some("Under Pressure".to_string()),
            artists: vec![
                dto::Artist { name: "Queen".to_string() },
                dto::Artist { name: "David Bowie".to_string() },
            ],
            duration_ms: Some(248_000),
            track_number: Some(11),
            album: Some(dto::Album {
                name: Some("Hot Space".to_string()),
                release_date: Some("1982-05-21".to_string()),
                images: vec![
                    dto::Image { url: "https://img/large".to_string() },
                    dto::Image { url: "https://img/small".to_string() },
                ],
            }),
        }
    }

    #[test]
    fn test_full_conversion() {
        let t = to_track(track()).unwrap();
        assert_eq!(t.name, "Under Pressure");
        assert_eq!(t.artist, "Queen, David Bowie");
        assert_eq!(t.duration_ms, 248_000);
        assert_eq!(t.album.as_deref(), Some("Hot Space"));
        assert_eq!(t.year.as_deref(), Some("1982"));
        assert_eq!(t.track_number.as_deref(), Some("11"));
        assert_eq!(t.cover_art_url.as_deref(), Some("https://img/large"));
        assert_eq!(t.external_id.as_deref(), Some("id1"));
    }

    #[test]
    fn test_year_only_release_date() {
        let mut dto = track();
        dto.album.as_mut().unwrap().release_date = Some("1982".to_string());
        assert_eq!(to_track(dto).unwrap().year.as_deref(), Some("1982"));
    }

    #[test]
    fn test_drops_incomplete_tracks() {
        let mut no_name = track();
        no_name.name = None;
        assert!(to_track(no_name).is_none());

        let mut no_artists = track();
        no_artists.artists.clear();
        assert!(to_track(no_artists).is_none());

        let mut no_duration = track();
        no_duration.duration_ms = None;
        assert!(to_track(no_duration).is_none());

        let mut zero_duration = track();
        zero_duration.duration_ms = Some(0);
        assert!(to_track(zero_duration).is_none());
    }

    #[test]
    fn test_missing_album_is_fine() {
        let mut dto = track();
        dto.album = None;
        let t = to_track(dto).unwrap();
        assert!(t.album.is_none());
        assert!(t.cover_art_url.is_none());
    }

    #[test]
    fn test_to_tracks_skips_null_items() {
        let items = vec![
            dto::PlaylistItem { track: Some(track()) },
            dto::PlaylistItem { track: None },
        ];
        assert_eq!(to_tracks(items).len(), 1);
    }
}
