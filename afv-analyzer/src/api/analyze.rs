//! Upload analysis endpoint
//!
//! `POST /analyze` takes a multipart form with a `file` field, runs the
//! pipeline on the blocking pool and returns every chart's data in one JSON
//! document. Fatal ingestion errors become HTTP errors; per-feature errors
//! are reported inline next to the successful charts.

use afv_common::human_time::{format_axis_time, format_duration_seconds, format_sample_rate};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ndarray::Array2;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::AnalysisContext;
use crate::error::{ApiError, ApiResult, IngestError};
use crate::features::{waveform::envelope, FeatureArtifact, FeatureKind, FeatureSet};
use crate::ingest::{RawAudioUpload, SourceInfo};
use crate::pipeline::{self, AnalysisReport};
use crate::AppState;

/// Multipart field carrying the audio file
pub const UPLOAD_FIELD: &str = "file";

/// Ticks on the shared time axis
const TIME_TICKS: usize = 8;

/// Response body of `POST /analyze`
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub request_id: Uuid,
    pub file_name: String,
    pub duration_seconds: f64,
    /// e.g. "3.00 seconds"
    pub duration_display: String,
    pub sample_rate: u32,
    /// e.g. "16000 Hz"
    pub sample_rate_display: String,
    pub sample_count: usize,
    pub source: SourceInfo,
    pub playback: PlaybackPayload,
    pub time_axis: Vec<AxisTick>,
    pub features: FeatureResults,
}

/// Original upload for the audio player
#[derive(Debug, Serialize)]
pub struct PlaybackPayload {
    pub mime: &'static str,
    pub data_base64: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AxisTick {
    pub seconds: f64,
    pub label: String,
}

/// Feature outcomes keyed by feature name, in presentation order
#[derive(Debug)]
pub struct FeatureResults(pub Vec<(FeatureKind, FeatureOutcome)>);

impl Serialize for FeatureResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (kind, outcome) in &self.0 {
            map.serialize_entry(kind.as_str(), outcome)?;
        }
        map.end()
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FeatureOutcome {
    Ok {
        title: &'static str,
        artifact: ArtifactPayload,
    },
    Error {
        title: &'static str,
        message: String,
    },
}

/// Chart-ready form of a feature artifact
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArtifactPayload {
    /// Min/max waveform envelope, one pair per column
    Envelope {
        min: Vec<f32>,
        max: Vec<f32>,
        sample_count: usize,
    },
    /// One value per analysis frame
    Series {
        values: Vec<f32>,
        frame_seconds: f64,
    },
    /// Row-major `rows × cols` matrix for a heatmap
    Matrix {
        rows: usize,
        cols: usize,
        data: Vec<f32>,
        min: f32,
        max: f32,
        frame_seconds: f64,
    },
}

impl ArtifactPayload {
    fn matrix(m: &Array2<f32>, frame_seconds: f64) -> Self {
        let (min, max) = m
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let (min, max) = if m.is_empty() { (0.0, 0.0) } else { (min, max) };
        Self::Matrix {
            rows: m.nrows(),
            cols: m.ncols(),
            data: m.iter().copied().collect(),
            min,
            max,
            frame_seconds,
        }
    }
}

/// Evenly spaced labelled ticks from 0 to `duration`
pub fn time_ticks(duration: f64, count: usize) -> Vec<AxisTick> {
    if count == 0 || duration <= 0.0 {
        return vec![AxisTick {
            seconds: 0.0,
            label: format_axis_time(0.0),
        }];
    }
    (0..=count)
        .map(|i| {
            let seconds = duration * i as f64 / count as f64;
            AxisTick {
                seconds,
                label: format_axis_time(seconds),
            }
        })
        .collect()
}

fn feature_results(set: &FeatureSet, ctx: &AnalysisContext, sample_rate: u32) -> FeatureResults {
    let frame_seconds = ctx.config.features.hop_length as f64 / sample_rate as f64;
    let outcomes = set
        .iter()
        .map(|(kind, result)| {
            let outcome = match result {
                Ok(artifact) => FeatureOutcome::Ok {
                    title: kind.title(),
                    artifact: match artifact {
                        FeatureArtifact::Waveform(samples) => {
                            let (min, max) = envelope(samples, ctx.config.waveform_points);
                            ArtifactPayload::Envelope {
                                min,
                                max,
                                sample_count: samples.len(),
                            }
                        }
                        FeatureArtifact::ZeroCrossingRate(values) => ArtifactPayload::Series {
                            values: values.clone(),
                            frame_seconds,
                        },
                        FeatureArtifact::MelSpectrogram(m)
                        | FeatureArtifact::Mfcc(m)
                        | FeatureArtifact::Chroma(m)
                        | FeatureArtifact::SpectralContrast(m) => ArtifactPayload::matrix(m, frame_seconds),
                    },
                },
                Err(e) => FeatureOutcome::Error {
                    title: kind.title(),
                    message: e.to_string(),
                },
            };
            (kind, outcome)
        })
        .collect();
    FeatureResults(outcomes)
}

fn build_response(report: AnalysisReport, ctx: &AnalysisContext) -> AnalysisResponse {
    let duration = report.duration_seconds();
    let sample_rate = report.waveform.sample_rate();
    let features = feature_results(&report.features, ctx, sample_rate);

    AnalysisResponse {
        request_id: report.request_id,
        file_name: report.file_name,
        duration_seconds: duration,
        duration_display: format_duration_seconds(duration),
        sample_rate,
        sample_rate_display: format_sample_rate(sample_rate),
        sample_count: report.waveform.len(),
        source: report.source,
        playback: PlaybackPayload {
            mime: report.playback.mime,
            data_base64: STANDARD.encode(&report.playback.bytes),
        },
        time_axis: time_ticks(duration, TIME_TICKS),
        features,
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Pull the `file` field out of the form: `(file name, bytes)`
async fn read_upload(multipart: &mut Multipart) -> ApiResult<(String, Vec<u8>)> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().trim().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if file_name.is_empty() {
            return Err(IngestError::EmptyInput("uploaded file has no name".to_string()).into());
        }
        return Ok((file_name, bytes.to_vec()));
    }
    Err(IngestError::EmptyInput(format!("no '{}' field in upload", UPLOAD_FIELD)).into())
}

async fn record_error(state: &AppState, err: &ApiError) {
    *state.last_error.write().await = Some(err.to_string());
}

/// POST /analyze
pub async fn analyze_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<AnalysisResponse>> {
    let result = run_analysis(&state, &mut multipart).await;
    if let Err(ref e) = result {
        warn!(error = %e, "Upload rejected");
        record_error(&state, e).await;
    }
    result.map(Json)
}

async fn run_analysis(state: &AppState, multipart: &mut Multipart) -> ApiResult<AnalysisResponse> {
    let (file_name, bytes) = read_upload(multipart).await?;
    let upload = RawAudioUpload::from_named(&file_name, bytes)?;
    let ctx = AnalysisContext::new(file_name, state.config.as_ref().clone());

    info!(request_id = %ctx.request_id, file = %ctx.file_name, "Upload received");

    tokio::task::spawn_blocking(move || -> ApiResult<AnalysisResponse> {
        let report = pipeline::analyze(&ctx, upload)?;
        Ok(build_response(report, &ctx))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("analysis task failed: {}", e)))?
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze_upload))
}
