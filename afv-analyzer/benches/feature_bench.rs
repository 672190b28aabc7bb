//! Feature Extraction Performance Benchmark
//!
//! Measures per-feature and all-feature extraction time on a normalized
//! 16 kHz waveform, plus the resample step that precedes it.
//!
//! **Goal:** a 30 s clip is charted well under a second
//!
//! ## Test Scenarios
//!
//! - Each feature alone on 10 s and 30 s of audio
//! - All six features on the rayon pool
//! - 44.1 kHz → 16 kHz mono resample of 30 s

use afv_analyzer::features::{extract, extract_all, FeatureKind, FeatureParams};
use afv_analyzer::ingest::{resample::resample_mono, NormalizedWaveform, TARGET_SAMPLE_RATE};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Two-tone test signal at `sample_rate`
fn test_signal(seconds: f32, sample_rate: u32) -> Vec<f32> {
    let n = (seconds * sample_rate as f32) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            0.4 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
                + 0.2 * (2.0 * std::f32::consts::PI * 1760.0 * t).sin()
        })
        .collect()
}

/// Benchmark: each feature individually
fn bench_single_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_single");
    let params = FeatureParams::default();

    for seconds in [10.0f32, 30.0] {
        let waveform = NormalizedWaveform::new(test_signal(seconds, TARGET_SAMPLE_RATE), TARGET_SAMPLE_RATE);
        group.throughput(Throughput::Elements(waveform.len() as u64));

        for kind in FeatureKind::ALL {
            group.bench_with_input(
                BenchmarkId::new(kind.as_str(), format!("{}s", seconds)),
                &waveform,
                |b, w| b.iter(|| extract(kind, black_box(w), &params)),
            );
        }
    }

    group.finish();
}

/// Benchmark: all features on the rayon pool
fn bench_extract_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_all");
    group.sample_size(20);
    let params = FeatureParams::default();
    let waveform = NormalizedWaveform::new(test_signal(30.0, TARGET_SAMPLE_RATE), TARGET_SAMPLE_RATE);

    group.throughput(Throughput::Elements(waveform.len() as u64));
    group.bench_function("30s", |b| b.iter(|| extract_all(black_box(&waveform), &params)));
    group.finish();
}

/// Benchmark: 44.1 kHz → 16 kHz normalization resample
fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");
    group.sample_size(20);
    let input = test_signal(30.0, 44100);

    group.throughput(Throughput::Elements(input.len() as u64));
    group.bench_function("44100_to_16000_30s", |b| {
        b.iter(|| resample_mono(black_box(&input), 44100, TARGET_SAMPLE_RATE))
    });
    group.finish();
}

criterion_group!(benches, bench_single_features, bench_extract_all, bench_resample);
criterion_main!(benches);
