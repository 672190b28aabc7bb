//! Error types for afv-analyzer
//!
//! Two severities:
//! - [`IngestError`] is fatal for a request: nothing downstream can run
//!   without a normalized waveform.
//! - [`FeatureError`] is isolated to the one feature that produced it.
//!
//! [`ApiError`] maps both onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::features::FeatureKind;

/// Ingestion failure (terminal for the request)
#[derive(Debug, Error)]
pub enum IngestError {
    /// No upload, a zero-byte upload, or audio that decodes to no samples
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Declared container is neither mp3 nor wav
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Unreadable or corrupt container
    #[error("Decode error: {0}")]
    Decode(String),

    /// Sample rate conversion failed
    #[error("Resample error: {0}")]
    Resample(String),

    /// Scoped temporary storage failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Stable machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::EmptyInput(_) => "EMPTY_INPUT",
            IngestError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            IngestError::Decode(_) => "DECODE_ERROR",
            IngestError::Resample(_) => "RESAMPLE_ERROR",
            IngestError::Io(_) => "IO_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            IngestError::EmptyInput(_) => StatusCode::BAD_REQUEST,
            IngestError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            IngestError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IngestError::Resample(_) | IngestError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<hound::Error> for IngestError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => IngestError::Io(e),
            other => IngestError::Decode(format!("WAV container: {}", other)),
        }
    }
}

/// Per-feature failure; never aborts the other features
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// Waveform shorter than one analysis frame
    #[error("{feature} needs at least {required} samples, waveform has {actual}")]
    InsufficientSamples {
        feature: FeatureKind,
        required: usize,
        actual: usize,
    },

    /// Parameters cannot produce a result for this waveform
    #[error("{feature} computation failed: {message}")]
    Computation { feature: FeatureKind, message: String },
}

impl FeatureError {
    pub fn feature(&self) -> FeatureKind {
        match self {
            FeatureError::InsufficientSamples { feature, .. } => *feature,
            FeatureError::Computation { feature, .. } => *feature,
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload larger than the configured limit (413)
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    /// Fatal ingestion failure
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg)
            }
            ApiError::Ingest(ref err) => (err.status(), err.code(), err.to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
