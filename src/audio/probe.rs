//! Container probing.
//!
//! [`LoftyProbe`] reads format, bitrate and duration from container
//! properties without decoding. When a container carries no duration,
//! [`MediaProbe::decode_duration_ms`] decodes the stream with symphonia and
//! counts frames.
//!
//! Durations are always milliseconds.

use std::fs::File;
use std::path::Path;

use lofty::file::{AudioFile, FileType, TaggedFileExt};
use lofty::probe::Probe;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::AudioError;

/// What a probe learned about a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Short codec/container name, e.g. "mp3"
    pub format_name: String,
    /// Audio bitrate in bits per second, if the container reports one
    pub bitrate_bps: Option<u32>,
    /// Duration from metadata; `None` when the container has no length
    pub duration_ms: Option<u64>,
}

/// Probe facility shared by the validator and the `verify` command.
pub trait MediaProbe: Send + Sync {
    /// Metadata-only probe.
    fn probe(&self, path: &Path) -> Result<ProbeReport, AudioError>;

    /// Duration by full decode. Slow; only used when metadata has none.
    fn decode_duration_ms(&self, path: &Path) -> Result<u64, AudioError>;
}

/// Production probe backed by lofty and symphonia.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyProbe;

impl MediaProbe for LoftyProbe {
    fn probe(&self, path: &Path) -> Result<ProbeReport, AudioError> {
        let tagged_file = Probe::open(path)
            .map_err(|e| AudioError::Probe(format!("{}: {}", path.display(), e)))?
            .read()
            .map_err(|e| AudioError::Probe(format!("{}: {}", path.display(), e)))?;

        let properties = tagged_file.properties();
        let bitrate_kbps = properties
            .audio_bitrate()
            .or_else(|| properties.overall_bitrate())
            .filter(|&kbps| kbps > 0);
        let duration_ms = u64::try_from(properties.duration().as_millis())
            .ok()
            .filter(|&ms| ms > 0);

        Ok(ProbeReport {
            format_name: format_name(tagged_file.file_type()),
            bitrate_bps: bitrate_kbps.map(|kbps| kbps * 1000),
            duration_ms,
        })
    }

    fn decode_duration_ms(&self, path: &Path) -> Result<u64, AudioError> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension() {
            hint.with_extension(&ext.to_string_lossy());
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::Decode(e.to_string()))?;
        let mut reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::Decode("No audio track found".to_string()))?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .filter(|&rate| rate > 0)
            .ok_or_else(|| AudioError::Decode("Unknown sample rate".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Decode(e.to_string()))?;

        let mut frames: u64 = 0;
        loop {
            let packet = match reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(AudioError::Decode(e.to_string())),
            };
            if packet.track_id() != track_id {
                continue;
            }
            match decoder.decode(&packet) {
                Ok(decoded) => frames += decoded.frames() as u64,
                // Corrupt packet: skip it, the rest of the stream is still countable
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::debug!(path = %path.display(), "Skipping undecodable packet: {}", e);
                }
                Err(e) => return Err(AudioError::Decode(e.to_string())),
            }
        }

        if frames == 0 {
            return Err(AudioError::Decode(format!(
                "{}: no audio frames decoded",
                path.display()
            )));
        }
        Ok(frames * 1000 / u64::from(sample_rate))
    }
}

pub(super) fn format_name(file_type: FileType) -> String {
    match file_type {
        FileType::Mpeg => "mp3".to_string(),
        FileType::Flac => "flac".to_string(),
        FileType::Aac => "aac".to_string(),
        FileType::Mp4 => "mp4".to_string(),
        FileType::Vorbis => "ogg".to_string(),
        FileType::Opus => "opus".to_string(),
        FileType::Wav => "wav".to_string(),
        other => format!("{:?}", other).to_lowercase(),
    }
}
