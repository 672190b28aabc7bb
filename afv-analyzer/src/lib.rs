//! afv-analyzer library interface
//!
//! Ingestion, feature extraction and the HTTP surface of the audio feature
//! visualizer, exposed for the binary and for integration testing.

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod features;
pub mod ingest;
pub mod pipeline;

pub use crate::error::{ApiError, ApiResult};

use axum::{extract::DefaultBodyLimit, Router};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::config::AnalyzerConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration, snapshotted into each analysis
    pub config: Arc<AnalyzerConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last fatal analysis error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config: Arc::new(config),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .merge(api::ui_routes())
        .merge(api::analyze_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
