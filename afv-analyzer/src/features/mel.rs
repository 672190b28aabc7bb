//! Mel spectrogram, decibel scaling and MFCC
//!
//! Mel scale is the Slaney variant (linear below 1 kHz, logarithmic above)
//! with area-normalised triangular filters.

use ndarray::Array2;

use super::stft::{fft_frequencies, SpectrumScale, Stft};
use super::{require_samples, FeatureKind, FeatureParams};
use crate::error::FeatureError;
use crate::ingest::NormalizedWaveform;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Hz → mel (Slaney)
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// mel → Hz (Slaney)
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// `n` frequencies evenly spaced on the mel scale between `fmin` and `fmax`
fn mel_frequencies(n: usize, fmin: f64, fmax: f64) -> Vec<f64> {
    let min_mel = hz_to_mel(fmin);
    let max_mel = hz_to_mel(fmax);
    if n == 1 {
        return vec![mel_to_hz(min_mel)];
    }
    (0..n)
        .map(|i| mel_to_hz(min_mel + (max_mel - min_mel) * i as f64 / (n - 1) as f64))
        .collect()
}

/// `n_mels × (1 + n_fft / 2)` triangular filterbank
pub fn mel_filterbank(
    sample_rate: u32,
    n_fft: usize,
    n_mels: usize,
    fmin: f32,
    fmax: f32,
) -> Array2<f32> {
    let fft_freqs = fft_frequencies(sample_rate, n_fft);
    let mel_f = mel_frequencies(n_mels + 2, fmin as f64, fmax as f64);
    let fdiff: Vec<f64> = mel_f.windows(2).map(|w| w[1] - w[0]).collect();

    let mut weights = Array2::<f32>::zeros((n_mels, fft_freqs.len()));
    for m in 0..n_mels {
        let enorm = 2.0 / (mel_f[m + 2] - mel_f[m]);
        for (k, &freq) in fft_freqs.iter().enumerate() {
            let freq = freq as f64;
            let lower = (freq - mel_f[m]) / fdiff[m];
            let upper = (mel_f[m + 2] - freq) / fdiff[m + 1];
            let w = lower.min(upper).max(0.0);
            weights[[m, k]] = (w * enorm) as f32;
        }
    }
    weights
}

/// Convert a power spectrogram to dB: `10·log10(max(amin, S) / max(amin, reference))`
///
/// When `top_db` is set, values are clamped to at most `top_db` below the
/// array's maximum.
pub fn power_to_db(power: &Array2<f32>, reference: f32, amin: f32, top_db: Option<f32>) -> Array2<f32> {
    let ref_db = 10.0 * reference.abs().max(amin).log10();
    let mut db = power.mapv(|s| 10.0 * s.max(amin).log10() - ref_db);

    if let Some(top_db) = top_db {
        let peak = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let floor = peak - top_db;
        db.mapv_inplace(|v| v.max(floor));
    }
    db
}

/// Mel-band power spectrogram (`n_mels × frames`)
pub fn mel_power(waveform: &NormalizedWaveform, params: &FeatureParams) -> Array2<f32> {
    let stft = Stft::new(params.n_fft, params.hop_length);
    let power = stft.spectrogram(waveform.samples(), SpectrumScale::Power);
    let fmax = params.fmax_for(waveform.sample_rate());
    let filters = mel_filterbank(waveform.sample_rate(), params.n_fft, params.n_mels, params.fmin, fmax);
    filters.dot(&power)
}

/// Mel spectrogram in dB relative to its own peak
///
/// Every value is ≤ 0. A silent signal has no meaningful peak, so every
/// cell is set to the `-top_db` floor instead of propagating `-inf`.
pub fn mel_spectrogram_db(
    waveform: &NormalizedWaveform,
    params: &FeatureParams,
) -> Result<Array2<f32>, FeatureError> {
    require_samples(FeatureKind::MelSpectrogram, waveform, params.n_fft)?;

    let mel = mel_power(waveform, params);
    let peak = mel.iter().copied().fold(0.0f32, f32::max);

    if peak <= params.amin {
        return Ok(Array2::from_elem(mel.raw_dim(), -params.top_db));
    }

    let db = power_to_db(&mel, peak, params.amin, Some(params.top_db));
    Ok(db.mapv(|v| v.min(0.0)))
}

/// Orthonormal DCT-II basis, `n_out × n_in`
fn dct_basis(n_out: usize, n_in: usize) -> Array2<f32> {
    let n = n_in as f64;
    Array2::from_shape_fn((n_out, n_in), |(k, i)| {
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        let angle = std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n);
        (scale * angle.cos()) as f32
    })
}

/// MFCC (`n_mfcc × frames`) from the dB mel spectrogram (reference 1.0)
pub fn mfcc(waveform: &NormalizedWaveform, params: &FeatureParams) -> Result<Array2<f32>, FeatureError> {
    require_samples(FeatureKind::Mfcc, waveform, params.n_fft)?;

    if params.n_mfcc > params.n_mels {
        return Err(FeatureError::Computation {
            feature: FeatureKind::Mfcc,
            message: format!(
                "{} coefficients requested from {} mel bands",
                params.n_mfcc, params.n_mels
            ),
        });
    }

    let mel = mel_power(waveform, params);
    let db = power_to_db(&mel, 1.0, params.amin, Some(params.top_db));
    Ok(dct_basis(params.n_mfcc, params.n_mels).dot(&db))
}
