//! UI routes - upload page and chart assets
//!
//! Vanilla HTML/CSS/JS, no frameworks. The page posts the file to
//! `/analyze` and draws every chart on a `<canvas>`.

use axum::{routing::get, Router};

use crate::AppState;

mod root;
mod static_assets;

use root::root_page;
use static_assets::{serve_afv_ui_css, serve_feature_charts_js};

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root_page))
        .route("/static/afv-ui.css", get(serve_afv_ui_css))
        .route("/static/feature-charts.js", get(serve_feature_charts_js))
}
