//! Chromagram from the power STFT
//!
//! Each FFT bin contributes to the pitch classes near it through a Gaussian
//! bump in log-frequency, weighted towards the centre octave. Rows start at C.

use ndarray::Array2;

use super::stft::{SpectrumScale, Stft};
use super::{require_samples, FeatureKind, FeatureParams};
use crate::error::FeatureError;
use crate::ingest::NormalizedWaveform;

/// Centre octave of the octave weighting (C5 region)
const CENTER_OCTAVE: f64 = 5.0;

/// Gaussian half-width of the octave weighting, in octaves
const OCTAVE_WIDTH: f64 = 2.0;

/// Octaves above A0 (27.5 Hz), assuming A4 = 440 Hz
fn hz_to_octaves(hz: f64) -> f64 {
    (hz / (440.0 / 16.0)).log2()
}

/// `n_chroma × (1 + n_fft / 2)` chroma filterbank
pub fn chroma_filterbank(sample_rate: u32, n_fft: usize, n_chroma: usize) -> Array2<f32> {
    let nc = n_chroma as f64;

    // Fractional chroma bin of every FFT bin; DC gets a synthetic value
    // 1.5 octaves below bin 1.
    let mut frq_bins = vec![0.0f64; n_fft];
    for (k, slot) in frq_bins.iter_mut().enumerate().skip(1) {
        let hz = k as f64 * sample_rate as f64 / n_fft as f64;
        *slot = nc * hz_to_octaves(hz);
    }
    frq_bins[0] = frq_bins.get(1).copied().unwrap_or(0.0) - 1.5 * nc;

    let mut bin_widths = vec![1.0f64; n_fft];
    for k in 0..n_fft.saturating_sub(1) {
        bin_widths[k] = (frq_bins[k + 1] - frq_bins[k]).max(1.0);
    }

    let half = (nc / 2.0).round();
    let mut weights = vec![vec![0.0f64; n_fft]; n_chroma];
    for (c, row) in weights.iter_mut().enumerate() {
        for (k, slot) in row.iter_mut().enumerate() {
            let d = (frq_bins[k] - c as f64 + half + 10.0 * nc).rem_euclid(nc) - half;
            *slot = (-0.5 * (2.0 * d / bin_widths[k]).powi(2)).exp();
        }
    }

    // Unit L2 norm per FFT bin, then octave weighting
    for k in 0..n_fft {
        let norm = weights.iter().map(|row| row[k] * row[k]).sum::<f64>().sqrt();
        let octave_weight = (-0.5 * ((frq_bins[k] / nc - CENTER_OCTAVE) / OCTAVE_WIDTH).powi(2)).exp();
        for row in weights.iter_mut() {
            if norm > 0.0 {
                row[k] /= norm;
            }
            row[k] *= octave_weight;
        }
    }

    // Rotate so row 0 is C instead of A
    let shift = 3 * (n_chroma / 12);
    let bins = n_fft / 2 + 1;
    Array2::from_shape_fn((n_chroma, bins), |(c, k)| {
        weights[(c + shift) % n_chroma][k] as f32
    })
}

/// Chromagram (`n_chroma × frames`), each frame scaled so its max is 1
pub fn chroma_stft(
    waveform: &NormalizedWaveform,
    params: &FeatureParams,
) -> Result<Array2<f32>, FeatureError> {
    require_samples(FeatureKind::Chroma, waveform, params.n_fft)?;

    let stft = Stft::new(params.n_fft, params.hop_length);
    let power = stft.spectrogram(waveform.samples(), SpectrumScale::Power);
    let filters = chroma_filterbank(waveform.sample_rate(), params.n_fft, params.n_chroma);
    let mut chroma = filters.dot(&power);

    for mut column in chroma.columns_mut() {
        let peak = column.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
        if peak > f32::MIN_POSITIVE {
            column.mapv_inplace(|v| v / peak);
        }
    }

    Ok(chroma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::TARGET_SAMPLE_RATE;

    fn tone(freq: f32) -> NormalizedWaveform {
        let sr = TARGET_SAMPLE_RATE;
        let samples = (0..sr)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect();
        NormalizedWaveform::new(samples, sr)
    }

    fn dominant_class(chroma: &Array2<f32>) -> usize {
        let mid = chroma.ncols() / 2;
        chroma
            .column(mid)
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(c, _)| c)
            .unwrap()
    }

    #[test]
    fn test_filterbank_shape() {
        let fb = chroma_filterbank(16000, 2048, 12);
        assert_eq!(fb.dim(), (12, 1025));
        assert!(fb.iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn test_a440_maps_to_pitch_class_a() {
        let chroma = chroma_stft(&tone(440.0), &FeatureParams::default()).unwrap();
        assert_eq!(chroma.nrows(), 12);
        // C=0 ... A=9
        assert_eq!(dominant_class(&chroma), 9);
    }

    #[test]
    fn test_c_major_tone_maps_to_c() {
        // C5
        let chroma = chroma_stft(&tone(523.25), &FeatureParams::default()).unwrap();
        assert_eq!(dominant_class(&chroma), 0);
    }

    #[test]
    fn test_values_in_unit_interval() {
        let chroma = chroma_stft(&tone(311.0), &FeatureParams::default()).unwrap();
        assert!(chroma.iter().all(|&v| (0.0..=1.0 + 1e-6).contains(&v)));
    }

    #[test]
    fn test_silence_is_all_zero() {
        let silence = NormalizedWaveform::new(vec![0.0; 8000], TARGET_SAMPLE_RATE);
        let chroma = chroma_stft(&silence, &FeatureParams::default()).unwrap();
        assert_eq!(chroma.nrows(), 12);
        assert!(chroma.iter().all(|&v| v == 0.0));
    }
}
