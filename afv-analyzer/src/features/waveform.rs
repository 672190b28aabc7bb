//! Time-domain waveform and its display envelope

use super::{require_samples, FeatureKind};
use crate::error::FeatureError;
use crate::ingest::NormalizedWaveform;

/// The normalized samples themselves
pub fn waveform_samples(waveform: &NormalizedWaveform) -> Result<Vec<f32>, FeatureError> {
    require_samples(FeatureKind::Waveform, waveform, 1)?;
    Ok(waveform.samples().to_vec())
}

/// Min/max envelope over `points` equal buckets
///
/// Long waveforms are reduced for drawing without losing peaks. When the
/// signal has no more than `points` samples, each sample is its own bucket.
pub fn envelope(samples: &[f32], points: usize) -> (Vec<f32>, Vec<f32>) {
    if samples.is_empty() || points == 0 {
        return (Vec::new(), Vec::new());
    }

    let buckets = points.min(samples.len());
    let mut mins = Vec::with_capacity(buckets);
    let mut maxs = Vec::with_capacity(buckets);

    for b in 0..buckets {
        let start = b * samples.len() / buckets;
        let end = ((b + 1) * samples.len() / buckets).max(start + 1);
        let (lo, hi) = samples[start..end]
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        mins.push(lo);
        maxs.push(hi);
    }

    (mins, maxs)
}
