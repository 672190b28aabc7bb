//! Short-time Fourier analysis shared by the spectral features
//!
//! Frames are centred: the signal is zero-padded by `n_fft / 2` on both
//! sides so frame `t` is centred on sample `t * hop_length`.

use std::sync::Arc;

use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Periodic Hann window of length `n`
pub fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos())
        .collect()
}

/// Frame count for a centred analysis of `len` samples
pub fn frame_count(len: usize, n_fft: usize, hop_length: usize) -> usize {
    let padded = len + 2 * (n_fft / 2);
    if padded < n_fft {
        return 0;
    }
    1 + (padded - n_fft) / hop_length
}

/// Centre frequency in Hz of each of the `1 + n_fft / 2` bins
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f32> {
    (0..=n_fft / 2)
        .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
        .collect()
}

/// Which quantity of each complex bin to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumScale {
    Magnitude,
    Power,
}

/// Forward STFT with a fixed window
pub struct Stft {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    n_fft: usize,
    hop_length: usize,
}

impl Stft {
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n_fft);
        Self {
            fft,
            window: hann_window(n_fft),
            n_fft,
            hop_length,
        }
    }

    /// Number of frequency bins in the output
    pub fn bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// `bins × frames` spectrogram of `samples`
    pub fn spectrogram(&self, samples: &[f32], scale: SpectrumScale) -> Array2<f32> {
        let pad = self.n_fft / 2;
        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let frames = frame_count(samples.len(), self.n_fft, self.hop_length);
        let bins = self.bins();
        let mut out = Array2::<f32>::zeros((bins, frames));

        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        for t in 0..frames {
            let start = t * self.hop_length;
            let frame = &padded[start..start + self.n_fft];
            for ((slot, &sample), &w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                *slot = Complex::new(sample * w, 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (k, value) in buffer.iter().take(bins).enumerate() {
                out[[k, t]] = match scale {
                    SpectrumScale::Magnitude => value.norm(),
                    SpectrumScale::Power => value.norm_sqr(),
                };
            }
        }

        out
    }
}
