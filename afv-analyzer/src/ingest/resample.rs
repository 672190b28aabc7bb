//! Sample rate conversion using rubato
//!
//! All analysis runs on a single fixed rate, so every upload passes through
//! here once after downmixing.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

use crate::error::IngestError;

/// Frames fed to the resampler per call
const CHUNK_FRAMES: usize = 1024;

/// Upper bound on flush calls after the input is exhausted
const MAX_FLUSH_CALLS: usize = 64;

/// Resample mono samples from `from_rate` to `to_rate`
///
/// Output length is exactly `round(len * to_rate / from_rate)`. The filter
/// delay is trimmed from the front and the tail is flushed, so the result is
/// time-aligned with the input.
///
/// Returns a copy when the rates already match.
pub fn resample_mono(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, IngestError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(IngestError::Resample(format!(
            "invalid sample rates {} -> {}",
            from_rate, to_rate
        )));
    }

    if from_rate == to_rate {
        debug!("Sample rate already at {} Hz, skipping resample", to_rate);
        return Ok(samples.to_vec());
    }

    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let expected = (samples.len() as f64 * ratio).round() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_FRAMES, 1)
        .map_err(|e| IngestError::Resample(format!("failed to create resampler: {}", e)))?;

    let delay = resampler.output_delay();
    let mut output: Vec<f32> = Vec::with_capacity(expected + delay + CHUNK_FRAMES);

    let mut chunks = samples.chunks_exact(CHUNK_FRAMES);
    for chunk in chunks.by_ref() {
        let input: [&[f32]; 1] = [chunk];
        let out = resampler
            .process(&input[..], None)
            .map_err(|e| IngestError::Resample(format!("resampling failed: {}", e)))?;
        output.extend_from_slice(&out[0]);
    }

    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let input: [&[f32]; 1] = [remainder];
        let out = resampler
            .process_partial(Some(&input[..]), None)
            .map_err(|e| IngestError::Resample(format!("resampling failed: {}", e)))?;
        output.extend_from_slice(&out[0]);
    }

    // Flush the filter tail
    let mut flushes = 0;
    while output.len() < expected + delay && flushes < MAX_FLUSH_CALLS {
        let out = resampler
            .process_partial(Option::<&[&[f32]]>::None, None)
            .map_err(|e| IngestError::Resample(format!("resampler flush failed: {}", e)))?;
        if out[0].is_empty() {
            break;
        }
        output.extend_from_slice(&out[0]);
        flushes += 1;
    }

    output.drain(..delay.min(output.len()));
    output.resize(expected, 0.0);

    debug!(
        "Resampled {} frames ({} Hz) -> {} frames ({} Hz)",
        samples.len(),
        from_rate,
        output.len(),
        to_rate
    );

    Ok(output)
}
