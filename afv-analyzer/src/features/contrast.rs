//! Spectral contrast
//!
//! The magnitude spectrum is split into octave sub-bands starting at
//! `contrast_fmin`, plus a band below it; the last band absorbs everything
//! up to Nyquist. Per band and frame, peak and valley are the means of the
//! loudest and quietest `contrast_quantile` share of bins, and the contrast
//! is their difference in dB.

use ndarray::Array2;

use super::mel::power_to_db;
use super::stft::{fft_frequencies, SpectrumScale, Stft};
use super::{require_samples, FeatureKind, FeatureParams};
use crate::error::FeatureError;
use crate::ingest::NormalizedWaveform;

/// Band edges `[0, fmin, 2·fmin, …, fmin·2^n_bands]`
fn band_edges(fmin: f32, n_bands: usize) -> Vec<f32> {
    let mut edges = Vec::with_capacity(n_bands + 2);
    edges.push(0.0);
    for i in 0..=n_bands {
        edges.push(fmin * 2f32.powi(i as i32));
    }
    edges
}

/// Row selection for one band: bins inside the band, one extra bin below
/// (all but the lowest band), everything above for the top band, and the
/// last in-band bin dropped for all but the top band.
///
/// Returns the selected rows and the bin count the quantile is taken from.
fn band_rows(freqs: &[f32], k: usize, n_bands: usize, f_low: f32, f_high: f32) -> Option<(Vec<usize>, usize)> {
    let mut mask: Vec<bool> = freqs.iter().map(|&f| f >= f_low && f <= f_high).collect();
    let first = mask.iter().position(|&m| m)?;
    let last = mask.iter().rposition(|&m| m)?;

    if k > 0 && first > 0 {
        mask[first - 1] = true;
    }
    if k == n_bands {
        for m in mask.iter_mut().skip(last + 1) {
            *m = true;
        }
    }

    let count = mask.iter().filter(|&&m| m).count();
    let mut rows: Vec<usize> = mask
        .iter()
        .enumerate()
        .filter_map(|(i, &m)| m.then_some(i))
        .collect();
    if k < n_bands {
        rows.pop();
    }
    Some((rows, count))
}

/// Spectral contrast (`(n_bands + 1) × frames`)
pub fn spectral_contrast(
    waveform: &NormalizedWaveform,
    params: &FeatureParams,
) -> Result<Array2<f32>, FeatureError> {
    require_samples(FeatureKind::SpectralContrast, waveform, params.n_fft)?;

    let nyquist = waveform.sample_rate() as f32 / 2.0;
    let edges = band_edges(params.contrast_fmin, params.n_bands);
    if let Some(&edge) = edges[..edges.len() - 1].iter().find(|&&e| e >= nyquist) {
        return Err(FeatureError::Computation {
            feature: FeatureKind::SpectralContrast,
            message: format!(
                "band edge {:.0} Hz exceeds Nyquist ({:.0} Hz); lower n_bands or contrast_fmin",
                edge, nyquist
            ),
        });
    }

    let stft = Stft::new(params.n_fft, params.hop_length);
    let magnitude = stft.spectrogram(waveform.samples(), SpectrumScale::Magnitude);
    let freqs = fft_frequencies(waveform.sample_rate(), params.n_fft);
    let frames = magnitude.ncols();

    let rows_out = params.n_bands + 1;
    let mut peak = Array2::<f32>::zeros((rows_out, frames));
    let mut valley = Array2::<f32>::zeros((rows_out, frames));

    let mut column = Vec::new();
    for (k, band) in edges.windows(2).enumerate() {
        let (rows, count) = band_rows(&freqs, k, params.n_bands, band[0], band[1])
            .filter(|(rows, _)| !rows.is_empty())
            .ok_or_else(|| FeatureError::Computation {
                feature: FeatureKind::SpectralContrast,
                message: format!(
                    "band {:.0}-{:.0} Hz contains no FFT bins; increase n_fft",
                    band[0], band[1]
                ),
            })?;

        let quantile_bins = ((params.contrast_quantile as f64 * count as f64).round_ties_even() as usize)
            .max(1)
            .min(rows.len());

        for t in 0..frames {
            column.clear();
            column.extend(rows.iter().map(|&r| magnitude[[r, t]]));
            column.sort_by(f32::total_cmp);

            let low: f32 = column[..quantile_bins].iter().sum();
            let high: f32 = column[column.len() - quantile_bins..].iter().sum();
            valley[[k, t]] = low / quantile_bins as f32;
            peak[[k, t]] = high / quantile_bins as f32;
        }
    }

    let peak_db = power_to_db(&peak, 1.0, params.amin, Some(params.top_db));
    let valley_db = power_to_db(&valley, 1.0, params.amin, Some(params.top_db));
    Ok(peak_db - valley_db)
}
