//! Embedding track metadata and cover art.
//!
//! Uses lofty, so the same code path tags MP3 (ID3v2), FLAC/OGG (Vorbis
//! comments) and M4A (MP4 atoms).

use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt};
use std::collections::BTreeMap;
use std::path::Path;

use super::AudioError;
use crate::model::TrackDescriptor;

/// Tags written to an artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
    pub track_number: Option<String>,
    /// Release year
    pub date: Option<String>,
}

impl TagSet {
    pub fn from_track(track: &TrackDescriptor) -> Self {
        Self {
            artist: track.artist.clone(),
            title: track.name.clone(),
            album: track.album.clone(),
            track_number: track.track_number.clone(),
            date: track.year.clone(),
        }
    }

    /// Key/value view, keyed `artist`, `title`, `album`, `tracknumber`, `date`.
    ///
    /// Absent or blank optional values are left out.
    pub fn to_map(&self) -> BTreeMap<&'static str, String> {
        let mut map = BTreeMap::new();
        map.insert("artist", self.artist.clone());
        map.insert("title", self.title.clone());
        let optional = [
            ("album", &self.album),
            ("tracknumber", &self.track_number),
            ("date", &self.date),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                map.insert(key, value.to_string());
            }
        }
        map
    }
}

/// Writes `tags` (and an optional front cover) into the file at `path`.
///
/// A cover that can't be read is skipped with a warning; only failures to
/// open or save the file itself are errors.
pub fn apply_tags(path: &Path, tags: &TagSet, cover: Option<&Path>) -> Result<(), AudioError> {
    let mut tagged_file = Probe::open(path)
        .map_err(|e| AudioError::Tagging(e.to_string()))?
        .read()
        .map_err(|e| AudioError::Tagging(e.to_string()))?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| AudioError::Tagging(format!("could not create {:?} tag", tag_type)))?;

    for (key, value) in tags.to_map() {
        match key {
            "artist" => tag.set_artist(value),
            "title" => tag.set_title(value),
            "album" => tag.set_album(value),
            "tracknumber" => match value.parse::<u32>() {
                Ok(n) => tag.set_track(n),
                Err(_) => {
                    tag.insert_text(ItemKey::TrackNumber, value);
                }
            },
            "date" => {
                tag.insert_text(ItemKey::RecordingDate, value);
            }
            _ => {}
        }
    }

    if let Some(cover) = cover {
        match read_cover(cover) {
            Ok(picture) => {
                tag.remove_picture_type(PictureType::CoverFront);
                tag.push_picture(picture);
            }
            Err(e) => {
                tracing::warn!(cover = %cover.display(), "Skipping cover art: {}", e);
            }
        }
    }

    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| AudioError::Tagging(e.to_string()))?;
    Ok(())
}

fn read_cover(path: &Path) -> Result<Picture, AudioError> {
    let data = std::fs::read(path)?;
    let mime = sniff_mime(&data)
        .ok_or_else(|| AudioError::Tagging("unrecognized image data".to_string()))?;
    Ok(Picture::new_unchecked(
        PictureType::CoverFront,
        Some(mime),
        None,
        data,
    ))
}

fn sniff_mime(data: &[u8]) -> Option<MimeType> {
    match data {
        [0xFF, 0xD8, 0xFF, ..] => Some(MimeType::Jpeg),
        [0x89, b'P', b'N', b'G', ..] => Some(MimeType::Png),
        [b'G', b'I', b'F', b'8', ..] => Some(MimeType::Gif),
        [b'B', b'M', ..] => Some(MimeType::Bmp),
        _ => None,
    }
}
