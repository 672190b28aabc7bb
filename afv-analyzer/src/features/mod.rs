//! Feature extraction
//!
//! Six independent features, each a pure function of the normalized
//! waveform and [`FeatureParams`]. A failing feature yields its own
//! [`FeatureError`]; the others are unaffected.

pub mod chroma;
pub mod contrast;
pub mod mel;
pub mod stft;
pub mod waveform;
pub mod zcr;

use std::fmt;

use afv_common::config::AnalysisSettings;
use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::FeatureError;
use crate::ingest::NormalizedWaveform;

/// Feature identifiers, in presentation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Waveform,
    MelSpectrogram,
    Mfcc,
    Chroma,
    SpectralContrast,
    ZeroCrossingRate,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 6] = [
        FeatureKind::Waveform,
        FeatureKind::MelSpectrogram,
        FeatureKind::Mfcc,
        FeatureKind::Chroma,
        FeatureKind::SpectralContrast,
        FeatureKind::ZeroCrossingRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Waveform => "waveform",
            FeatureKind::MelSpectrogram => "mel_spectrogram",
            FeatureKind::Mfcc => "mfcc",
            FeatureKind::Chroma => "chroma",
            FeatureKind::SpectralContrast => "spectral_contrast",
            FeatureKind::ZeroCrossingRate => "zero_crossing_rate",
        }
    }

    /// Chart heading
    pub fn title(&self) -> &'static str {
        match self {
            FeatureKind::Waveform => "Waveform",
            FeatureKind::MelSpectrogram => "Mel Spectrogram",
            FeatureKind::Mfcc => "MFCC",
            FeatureKind::Chroma => "Chroma Features",
            FeatureKind::SpectralContrast => "Spectral Contrast",
            FeatureKind::ZeroCrossingRate => "Zero Crossing Rate",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Analysis constants shared by all features
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureParams {
    /// FFT size; also the ZCR frame length
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub fmin: f32,
    /// Upper mel edge; `None` means Nyquist
    pub fmax: Option<f32>,
    pub n_mfcc: usize,
    pub n_chroma: usize,
    pub n_bands: usize,
    pub contrast_fmin: f32,
    pub contrast_quantile: f32,
    /// Power floor before taking logarithms
    pub amin: f32,
    /// Dynamic range kept below the peak, in dB
    pub top_db: f32,
    /// Magnitudes at or below this count as zero for ZCR
    pub zcr_threshold: f32,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            fmin: 0.0,
            fmax: None,
            n_mfcc: 20,
            n_chroma: 12,
            n_bands: 6,
            contrast_fmin: 200.0,
            contrast_quantile: 0.02,
            amin: 1e-10,
            top_db: 80.0,
            zcr_threshold: 1e-10,
        }
    }
}

impl FeatureParams {
    /// Overlay the configurable sizes on the defaults
    pub fn from_settings(settings: &AnalysisSettings) -> Self {
        Self {
            n_fft: settings.n_fft,
            hop_length: settings.hop_length,
            n_mels: settings.n_mels,
            n_mfcc: settings.n_mfcc,
            n_bands: settings.n_bands,
            ..Self::default()
        }
    }

    pub fn fmax_for(&self, sample_rate: u32) -> f32 {
        self.fmax.unwrap_or(sample_rate as f32 / 2.0)
    }

    /// Reject sizes that `kind` cannot be computed with
    ///
    /// Config validation covers the file-driven values, but the fields are
    /// public and library callers can build any combination.
    pub fn check(&self, kind: FeatureKind) -> Result<(), FeatureError> {
        let mut sizes = vec![("n_fft", self.n_fft), ("hop_length", self.hop_length)];
        match kind {
            FeatureKind::Waveform => return Ok(()),
            FeatureKind::MelSpectrogram => sizes.push(("n_mels", self.n_mels)),
            FeatureKind::Mfcc => sizes.extend([("n_mels", self.n_mels), ("n_mfcc", self.n_mfcc)]),
            FeatureKind::Chroma => sizes.push(("n_chroma", self.n_chroma)),
            FeatureKind::SpectralContrast => sizes.push(("n_bands", self.n_bands)),
            FeatureKind::ZeroCrossingRate => {}
        }

        match sizes.into_iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(FeatureError::Computation {
                feature: kind,
                message: format!("{} must be positive", name),
            }),
            None => Ok(()),
        }
    }
}

/// Fail with [`FeatureError::InsufficientSamples`] below `required` samples
pub fn require_samples(
    kind: FeatureKind,
    waveform: &NormalizedWaveform,
    required: usize,
) -> Result<(), FeatureError> {
    if waveform.len() < required {
        return Err(FeatureError::InsufficientSamples {
            feature: kind,
            required,
            actual: waveform.len(),
        });
    }
    Ok(())
}

/// Output of one feature
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureArtifact {
    Waveform(Vec<f32>),
    MelSpectrogram(Array2<f32>),
    Mfcc(Array2<f32>),
    Chroma(Array2<f32>),
    SpectralContrast(Array2<f32>),
    ZeroCrossingRate(Vec<f32>),
}

impl FeatureArtifact {
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureArtifact::Waveform(_) => FeatureKind::Waveform,
            FeatureArtifact::MelSpectrogram(_) => FeatureKind::MelSpectrogram,
            FeatureArtifact::Mfcc(_) => FeatureKind::Mfcc,
            FeatureArtifact::Chroma(_) => FeatureKind::Chroma,
            FeatureArtifact::SpectralContrast(_) => FeatureKind::SpectralContrast,
            FeatureArtifact::ZeroCrossingRate(_) => FeatureKind::ZeroCrossingRate,
        }
    }

    /// `rows × frames` matrix, for the spectral features
    pub fn as_matrix(&self) -> Option<&Array2<f32>> {
        match self {
            FeatureArtifact::MelSpectrogram(m)
            | FeatureArtifact::Mfcc(m)
            | FeatureArtifact::Chroma(m)
            | FeatureArtifact::SpectralContrast(m) => Some(m),
            _ => None,
        }
    }

    /// One-dimensional series, for waveform and ZCR
    pub fn as_series(&self) -> Option<&[f32]> {
        match self {
            FeatureArtifact::Waveform(v) | FeatureArtifact::ZeroCrossingRate(v) => Some(v),
            _ => None,
        }
    }
}

/// Compute a single feature
pub fn extract(
    kind: FeatureKind,
    waveform: &NormalizedWaveform,
    params: &FeatureParams,
) -> Result<FeatureArtifact, FeatureError> {
    params.check(kind)?;

    let artifact = match kind {
        FeatureKind::Waveform => FeatureArtifact::Waveform(waveform::waveform_samples(waveform)?),
        FeatureKind::MelSpectrogram => {
            FeatureArtifact::MelSpectrogram(mel::mel_spectrogram_db(waveform, params)?)
        }
        FeatureKind::Mfcc => FeatureArtifact::Mfcc(mel::mfcc(waveform, params)?),
        FeatureKind::Chroma => FeatureArtifact::Chroma(chroma::chroma_stft(waveform, params)?),
        FeatureKind::SpectralContrast => {
            FeatureArtifact::SpectralContrast(contrast::spectral_contrast(waveform, params)?)
        }
        FeatureKind::ZeroCrossingRate => {
            FeatureArtifact::ZeroCrossingRate(zcr::zero_crossing_rate(waveform, params)?)
        }
    };
    Ok(artifact)
}

/// Per-feature results of one analysis, in [`FeatureKind::ALL`] order
#[derive(Debug, Clone)]
pub struct FeatureSet {
    entries: Vec<(FeatureKind, Result<FeatureArtifact, FeatureError>)>,
}

impl FeatureSet {
    pub fn get(&self, kind: FeatureKind) -> Option<&Result<FeatureArtifact, FeatureError>> {
        self.entries.iter().find(|(k, _)| *k == kind).map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureKind, &Result<FeatureArtifact, FeatureError>)> {
        self.entries.iter().map(|(k, r)| (*k, r))
    }

    pub fn failures(&self) -> impl Iterator<Item = &FeatureError> {
        self.entries.iter().filter_map(|(_, r)| r.as_ref().err())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute all six features on the rayon pool
pub fn extract_all(waveform: &NormalizedWaveform, params: &FeatureParams) -> FeatureSet {
    let entries: Vec<_> = FeatureKind::ALL
        .par_iter()
        .map(|&kind| {
            let started = std::time::Instant::now();
            let result = extract(kind, waveform, params);
            match &result {
                Ok(_) => debug!(
                    feature = %kind,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Feature computed"
                ),
                Err(e) => warn!(feature = %kind, error = %e, "Feature failed"),
            }
            (kind, result)
        })
        .collect();

    FeatureSet { entries }
}
