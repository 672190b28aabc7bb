//! Zero-crossing rate
//!
//! Frames are centred like the STFT but padded by repeating the edge
//! samples. Samples within `zcr_threshold` of zero count as positive.

use super::stft::frame_count;
use super::{require_samples, FeatureKind, FeatureParams};
use crate::error::FeatureError;
use crate::ingest::NormalizedWaveform;

/// Fraction of adjacent-sample sign changes in each frame, in `[0, 1)`
pub fn zero_crossing_rate(
    waveform: &NormalizedWaveform,
    params: &FeatureParams,
) -> Result<Vec<f32>, FeatureError> {
    require_samples(FeatureKind::ZeroCrossingRate, waveform, params.n_fft)?;

    let frame_length = params.n_fft;
    let signs = sign_bits(waveform.samples(), frame_length / 2, params.zcr_threshold);
    let frames = frame_count(waveform.len(), frame_length, params.hop_length);

    let rates = (0..frames)
        .map(|t| {
            let start = t * params.hop_length;
            let frame = &signs[start..start + frame_length];
            let crossings = frame.windows(2).filter(|w| w[0] != w[1]).count();
            crossings as f32 / frame_length as f32
        })
        .collect();

    Ok(rates)
}

/// Sign bit of each sample after edge padding by `pad` on both sides
fn sign_bits(samples: &[f32], pad: usize, threshold: f32) -> Vec<bool> {
    let sign = |x: f32| if x.abs() <= threshold { false } else { x.is_sign_negative() };
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(&first), Some(&last)) => (sign(first), sign(last)),
        _ => return Vec::new(),
    };

    let mut bits = Vec::with_capacity(samples.len() + 2 * pad);
    bits.extend(std::iter::repeat(first).take(pad));
    bits.extend(samples.iter().map(|&x| sign(x)));
    bits.extend(std::iter::repeat(last).take(pad));
    bits
}
