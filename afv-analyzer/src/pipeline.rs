//! Two-stage analysis: ingestion, then feature extraction
//!
//! Ingestion failures end the request before any feature runs. Feature
//! failures are carried inside the report.

use std::time::Instant;

use tracing::{error, info};
use uuid::Uuid;

use crate::context::AnalysisContext;
use crate::error::IngestError;
use crate::features::{self, FeatureSet};
use crate::ingest::{self, NormalizedWaveform, PlayableAudio, RawAudioUpload, SourceInfo};

/// Everything produced for one upload
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub request_id: Uuid,
    pub file_name: String,
    pub waveform: NormalizedWaveform,
    pub playback: PlayableAudio,
    pub source: SourceInfo,
    pub features: FeatureSet,
}

impl AnalysisReport {
    pub fn duration_seconds(&self) -> f64 {
        self.waveform.duration_seconds()
    }
}

/// Run both stages for one upload (blocking, CPU bound)
pub fn analyze(ctx: &AnalysisContext, upload: RawAudioUpload) -> Result<AnalysisReport, IngestError> {
    let started = Instant::now();
    info!(
        request_id = %ctx.request_id,
        file = %ctx.file_name,
        format = %upload.format,
        bytes = upload.bytes.len(),
        "Analysis started"
    );

    let ingested = ingest::ingest(upload).map_err(|e| {
        error!(request_id = %ctx.request_id, file = %ctx.file_name, error = %e, "Ingestion failed");
        e
    })?;

    let feature_set = features::extract_all(&ingested.waveform, &ctx.config.features);

    info!(
        request_id = %ctx.request_id,
        samples = ingested.waveform.len(),
        failed_features = feature_set.failures().count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Analysis complete"
    );

    Ok(AnalysisReport {
        request_id: ctx.request_id,
        file_name: ctx.file_name.clone(),
        waveform: ingested.waveform,
        playback: ingested.playback,
        source: ingested.source,
        features: feature_set,
    })
}
