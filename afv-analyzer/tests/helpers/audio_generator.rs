//! Audio Test Fixture Generator
//!
//! Builds in-memory WAV fixtures with hound and silent MP3 streams from raw
//! frames

use std::io::Cursor;

/// Generated waveform content
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    Silence,
    /// Sine tone at the given frequency, 30% amplitude
    Tone(f32),
}

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub signal: Signal,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 3.0,
            sample_rate: 44100,
            channels: 1,
            signal: Signal::Tone(440.0),
        }
    }
}

impl AudioConfig {
    pub fn frames(&self) -> usize {
        (self.duration_seconds * self.sample_rate as f64).round() as usize
    }

    fn sample_at(&self, i: usize) -> i16 {
        match self.signal {
            Signal::Silence => 0,
            Signal::Tone(freq) => {
                let t = i as f32 / self.sample_rate as f32;
                (0.3 * (2.0 * std::f32::consts::PI * freq * t).sin() * i16::MAX as f32) as i16
            }
        }
    }

    fn spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }
}

fn write_samples<W: std::io::Write + std::io::Seek>(
    writer: &mut hound::WavWriter<W>,
    config: &AudioConfig,
) -> anyhow::Result<()> {
    for i in 0..config.frames() {
        let sample = config.sample_at(i);
        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }
    Ok(())
}

/// 16-bit PCM WAV file contents
pub fn wav_bytes(config: &AudioConfig) -> anyhow::Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, config.spec())?;
        write_samples(&mut writer, config)?;
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// MPEG-1 layer III frame header: 128 kbps, 44.1 kHz, mono, no padding
const MP3_FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0xC4];

/// Bytes per frame for [`MP3_FRAME_HEADER`]
pub const MP3_FRAME_BYTES: usize = 417;

/// Samples each layer III frame decodes to
pub const MP3_FRAME_SAMPLES: usize = 1152;

/// Sample rate declared by [`MP3_FRAME_HEADER`]
pub const MP3_SAMPLE_RATE: u32 = 44100;

/// Silent MP3 stream of `frames` frames
///
/// Zeroed side info and main data decode to digital silence, which is
/// enough to drive the real MP3 decoder without an encoder.
pub fn silent_mp3_bytes(frames: usize) -> Vec<u8> {
    let mut frame = vec![0u8; MP3_FRAME_BYTES];
    frame[..4].copy_from_slice(&MP3_FRAME_HEADER);
    frame.repeat(frames)
}
