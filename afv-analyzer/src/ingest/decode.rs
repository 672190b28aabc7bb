//! Container decoding and WAV transcoding
//!
//! Uses symphonia for format-agnostic decoding and hound to write the
//! uncompressed intermediate container.

use std::io::Cursor;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::ContainerFormat;
use crate::error::IngestError;

/// Decoded audio at the source's native rate and channel layout
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved f32 samples, range [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Native sample rate in Hz
    pub sample_rate: u32,
    /// Channel count of the source
    pub channels: usize,
    /// Packets dropped because the codec reported them corrupt
    pub skipped_packets: usize,
}

impl DecodedAudio {
    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Downmix to mono by averaging all channels of each frame
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }

        let scale = 1.0 / self.channels as f32;
        self.samples
            .chunks_exact(self.channels)
            .map(|frame| frame.iter().sum::<f32>() * scale)
            .collect()
    }
}

/// Shape of a transcoded WAV file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeInfo {
    pub sample_rate: u32,
    pub channels: usize,
    pub frames: usize,
}

/// Decode an audio file on disk
pub fn decode_file(path: &Path, format: ContainerFormat) -> Result<DecodedAudio, IngestError> {
    debug!(path = %path.display(), format = %format, "Decoding audio file");

    if format.is_compressed() {
        return decode_bytes(&std::fs::read(path)?, format);
    }

    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    decode_stream(mss, format)
}

/// Decode an in-memory audio container
pub fn decode_bytes(bytes: &[u8], format: ContainerFormat) -> Result<DecodedAudio, IngestError> {
    debug!(bytes = bytes.len(), format = %format, "Decoding audio bytes");

    if format == ContainerFormat::Mp3 {
        if let Some(cut) = find_truncated_frame(bytes) {
            warn!(
                offset = cut.offset,
                declared = cut.declared,
                available = cut.available,
                "MPEG stream ends inside a frame"
            );
            return Err(IngestError::Decode(format!(
                "truncated mp3 stream: frame at byte {} needs {} bytes, {} present",
                cut.offset, cut.declared, cut.available
            )));
        }
    }

    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());
    decode_stream(mss, format)
}

/// Decode `bytes` and write them to `dest` as a 32-bit float WAV
///
/// Full fidelity: native sample rate and channel layout are kept, no
/// resampling happens here.
pub fn transcode_to_wav(
    bytes: &[u8],
    format: ContainerFormat,
    dest: &Path,
) -> Result<TranscodeInfo, IngestError> {
    let decoded = decode_bytes(bytes, format)?;
    write_wav(&decoded, dest)?;

    let info = TranscodeInfo {
        sample_rate: decoded.sample_rate,
        channels: decoded.channels,
        frames: decoded.frames(),
    };
    debug!(
        dest = %dest.display(),
        sample_rate = info.sample_rate,
        channels = info.channels,
        frames = info.frames,
        "Transcoded to WAV"
    );
    Ok(info)
}

/// Write decoded audio as an IEEE float WAV container
pub fn write_wav(decoded: &DecodedAudio, dest: &Path) -> Result<(), IngestError> {
    let channels = u16::try_from(decoded.channels)
        .map_err(|_| IngestError::Decode(format!("{} channels not supported", decoded.channels)))?;

    let spec = hound::WavSpec {
        channels: channels.max(1),
        sample_rate: decoded.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(dest, spec)?;
    for &sample in &decoded.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// An MPEG audio frame cut short by the end of the upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncatedFrame {
    /// Byte offset of the frame header
    pub offset: usize,
    /// Frame length declared by the header, header included
    pub declared: usize,
    /// Bytes actually present from `offset`
    pub available: usize,
}

/// Kbps by bitrate index: MPEG-1 layers I, II, III, then MPEG-2/2.5 layer I
/// and layers II/III
const BITRATES_KBPS: [[u32; 15]; 5] = [
    [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448],
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384],
    [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320],
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256],
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160],
];

const MPEG1_SAMPLE_RATES: [u32; 3] = [44100, 48000, 32000];

/// Total length in bytes of the MPEG audio frame starting with `header`
///
/// `None` for anything that is not a parseable fixed-bitrate frame header
/// (free-format, reserved fields, tag bytes, junk).
pub fn mpeg_frame_len(header: &[u8]) -> Option<usize> {
    if header.len() < 4 || header[0] != 0xFF || header[1] & 0xE0 != 0xE0 {
        return None;
    }

    let version = (header[1] >> 3) & 0b11;
    let layer = (header[1] >> 1) & 0b11;
    let bitrate_index = usize::from(header[2] >> 4);
    let rate_index = usize::from((header[2] >> 2) & 0b11);
    let padding = u32::from((header[2] >> 1) & 1);

    let reserved = version == 0b01 || layer == 0b00 || rate_index == 3;
    if reserved || bitrate_index == 0 || bitrate_index == 15 {
        return None;
    }

    let mpeg1 = version == 0b11;
    // Layer bits count down: 0b11 is layer I
    let layer_number = 4 - layer;
    let table = match (mpeg1, layer_number) {
        (true, n) => usize::from(n - 1),
        (false, 1) => 3,
        (false, _) => 4,
    };
    let bitrate = BITRATES_KBPS[table][bitrate_index] * 1000;
    let sample_rate = match version {
        0b11 => MPEG1_SAMPLE_RATES[rate_index],
        0b10 => MPEG1_SAMPLE_RATES[rate_index] / 2,
        _ => MPEG1_SAMPLE_RATES[rate_index] / 4,
    };

    let len = match layer_number {
        1 => (12 * bitrate / sample_rate + padding) * 4,
        3 if !mpeg1 => 72 * bitrate / sample_rate + padding,
        _ => 144 * bitrate / sample_rate + padding,
    };
    Some(len as usize)
}

/// Size of a leading ID3v2 tag, footer included
fn id3v2_len(bytes: &[u8]) -> usize {
    if bytes.len() < 10 || &bytes[..3] != b"ID3" {
        return 0;
    }
    // Syncsafe: seven significant bits per byte
    let size = bytes[6..10]
        .iter()
        .fold(0usize, |acc, &b| (acc << 7) | usize::from(b & 0x7F));
    let footer = if bytes[5] & 0x10 != 0 { 10 } else { 0 };
    10 + size + footer
}

/// Walk MPEG frame headers and report a final frame the data ends inside
///
/// Only a frame that follows at least one complete frame counts, so stray
/// sync-like bytes in leading junk do not. Trailing tags stop the walk.
pub fn find_truncated_frame(bytes: &[u8]) -> Option<TruncatedFrame> {
    let start = id3v2_len(bytes);
    let mut offset = (start..bytes.len().saturating_sub(3))
        .find(|&i| mpeg_frame_len(&bytes[i..i + 4]).is_some())?;

    let mut complete = 0usize;
    while offset + 4 <= bytes.len() {
        let declared = match mpeg_frame_len(&bytes[offset..offset + 4]) {
            Some(len) => len,
            None => break,
        };
        if offset + declared > bytes.len() {
            if complete == 0 {
                return None;
            }
            return Some(TruncatedFrame {
                offset,
                declared,
                available: bytes.len() - offset,
            });
        }
        complete += 1;
        offset += declared;
    }
    None
}

fn decode_stream(mss: MediaSourceStream, format: ContainerFormat) -> Result<DecodedAudio, IngestError> {
    let mut hint = Hint::new();
    hint.with_extension(format.extension());

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| IngestError::Decode(format!("unrecognised {} container: {}", format, e)))?;

    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| IngestError::Decode("no audio track found".to_string()))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| IngestError::Decode(format!("no decoder for {} stream: {}", format, e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut decoded_packets = 0usize;
    let mut skipped_packets = 0usize;
    // (buffer, frame capacity)
    let mut sample_buf: Option<(SampleBuffer<f32>, usize)> = None;

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // End of stream
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(IngestError::Decode(format!("error reading packet: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                skipped_packets += 1;
                debug!(reason = msg, "Skipping corrupt packet");
                continue;
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                return Err(IngestError::Decode(format!("failed to decode packet: {}", e)));
            }
        };

        let spec = *decoded.spec();
        let packet_channels = spec.channels.count();
        match channels {
            None => channels = Some(packet_channels),
            Some(expected) if expected != packet_channels => {
                return Err(IngestError::Decode(format!(
                    "channel count changed mid-stream ({} -> {})",
                    expected, packet_channels
                )));
            }
            Some(_) => {}
        }
        if sample_rate.is_none() {
            sample_rate = Some(spec.rate);
        }

        if decoded.frames() == 0 {
            continue;
        }

        let needed = decoded.capacity();
        let reuse = matches!(&sample_buf, Some((_, capacity)) if *capacity >= needed);
        if !reuse {
            sample_buf = Some((SampleBuffer::<f32>::new(needed as u64, spec), needed));
        }
        if let Some((buf, _)) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
        decoded_packets += 1;
    }

    if decoded_packets == 0 && skipped_packets > 0 {
        return Err(IngestError::Decode(format!(
            "no decodable audio frames ({} corrupt packets)",
            skipped_packets
        )));
    }
    if skipped_packets > 0 {
        warn!(skipped_packets, decoded_packets, "Skipped corrupt packets while decoding");
    }

    let sample_rate = sample_rate
        .filter(|&rate| rate > 0)
        .ok_or_else(|| IngestError::Decode("sample rate unknown".to_string()))?;
    let channels = channels.unwrap_or(1).max(1);

    let decoded = DecodedAudio {
        samples,
        sample_rate,
        channels,
        skipped_packets,
    };

    debug!(
        sample_rate = decoded.sample_rate,
        channels = decoded.channels,
        frames = decoded.frames(),
        duration_seconds = format!("{:.2}", decoded.duration_seconds()),
        "Audio decoding complete"
    );

    Ok(decoded)
}
