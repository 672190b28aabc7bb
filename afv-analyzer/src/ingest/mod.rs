//! Audio ingestion and normalization
//!
//! Turns an uploaded `.mp3` or `.wav` byte stream into the single mono
//! waveform every feature is computed from:
//!
//! 1. Compressed containers are transcoded to an uncompressed WAV first
//!    (native rate and channels, no resampling)
//! 2. The uncompressed audio is loaded, downmixed to mono and resampled to
//!    [`TARGET_SAMPLE_RATE`]
//!
//! The intermediate WAV lives in a scoped temporary file that is deleted on
//! every exit path, including decode failures.

pub mod decode;
pub mod resample;

use std::fmt;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::IngestError;

/// Analysis sample rate applied to every upload
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Declared container of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Mp3,
    Wav,
}

impl ContainerFormat {
    /// Map a file extension (without dot, any case)
    pub fn from_extension(ext: &str) -> Result<Self, IngestError> {
        match ext.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(ContainerFormat::Mp3),
            "wav" | "wave" => Ok(ContainerFormat::Wav),
            other => Err(IngestError::UnsupportedFormat(format!(
                "'.{}' (expected .mp3 or .wav)",
                other
            ))),
        }
    }

    /// Map an uploaded file name by its extension
    pub fn from_file_name(name: &str) -> Result<Self, IngestError> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                IngestError::UnsupportedFormat(format!(
                    "'{}' has no extension (expected .mp3 or .wav)",
                    name
                ))
            })?;
        Self::from_extension(ext)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Mp3 => "mp3",
            ContainerFormat::Wav => "wav",
        }
    }

    /// Whether the container must be transcoded before loading
    pub fn is_compressed(&self) -> bool {
        matches!(self, ContainerFormat::Mp3)
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ContainerFormat::Mp3 => "audio/mpeg",
            ContainerFormat::Wav => "audio/wav",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Uploaded bytes plus their declared container
#[derive(Debug, Clone)]
pub struct RawAudioUpload {
    pub bytes: Vec<u8>,
    pub format: ContainerFormat,
}

impl RawAudioUpload {
    pub fn new(bytes: Vec<u8>, format: ContainerFormat) -> Self {
        Self { bytes, format }
    }

    /// Build from a client file name, declaring the container by extension
    pub fn from_named(file_name: &str, bytes: Vec<u8>) -> Result<Self, IngestError> {
        let format = ContainerFormat::from_file_name(file_name)?;
        Ok(Self::new(bytes, format))
    }
}

/// Mono analysis waveform at a fixed sample rate
///
/// Immutable once built; all features read the same instance.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedWaveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl NormalizedWaveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `sample_count / sample_rate`
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Original upload bytes kept for playback
#[derive(Debug, Clone)]
pub struct PlayableAudio {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

/// Facts about the source before normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub format: ContainerFormat,
    pub sample_rate: u32,
    pub channels: usize,
    pub frames: usize,
    pub skipped_packets: usize,
}

/// Result of a successful ingestion
#[derive(Debug, Clone)]
pub struct IngestedAudio {
    pub waveform: NormalizedWaveform,
    pub playback: PlayableAudio,
    pub source: SourceInfo,
}

/// Ingest an upload using the system temp directory for scratch storage
pub fn ingest(upload: RawAudioUpload) -> Result<IngestedAudio, IngestError> {
    ingest_in(upload, &std::env::temp_dir())
}

/// Ingest an upload, placing the intermediate WAV in `scratch_dir`
pub fn ingest_in(upload: RawAudioUpload, scratch_dir: &Path) -> Result<IngestedAudio, IngestError> {
    if upload.bytes.is_empty() {
        return Err(IngestError::EmptyInput("upload contains no bytes".to_string()));
    }

    // Deleted when dropped, on every return path below
    let mut scratch = tempfile::Builder::new()
        .prefix("afv-ingest-")
        .suffix(".wav")
        .tempfile_in(scratch_dir)?;

    if upload.format.is_compressed() {
        decode::transcode_to_wav(&upload.bytes, upload.format, scratch.path())?;
    } else {
        scratch.write_all(&upload.bytes)?;
        scratch.flush()?;
    }

    let decoded = decode::decode_file(scratch.path(), ContainerFormat::Wav)?;
    scratch.close()?;

    let source = SourceInfo {
        format: upload.format,
        sample_rate: decoded.sample_rate,
        channels: decoded.channels,
        frames: decoded.frames(),
        skipped_packets: decoded.skipped_packets,
    };

    let mono = decoded.to_mono();
    if mono.is_empty() {
        return Err(IngestError::EmptyInput(
            "audio stream contains no samples".to_string(),
        ));
    }

    let samples = resample::resample_mono(&mono, decoded.sample_rate, TARGET_SAMPLE_RATE)?;
    let waveform = NormalizedWaveform::new(samples, TARGET_SAMPLE_RATE);

    debug!(
        format = %upload.format,
        source_rate = source.sample_rate,
        source_channels = source.channels,
        samples = waveform.len(),
        duration_seconds = format!("{:.2}", waveform.duration_seconds()),
        "Ingestion complete"
    );

    let playback = PlayableAudio {
        mime: upload.format.mime_type(),
        bytes: upload.bytes,
    };

    Ok(IngestedAudio {
        waveform,
        playback,
        source,
    })
}
