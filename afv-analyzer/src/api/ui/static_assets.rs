//! Static asset handlers for the upload page
//!
//! Embeds and serves CSS/JS files at compile time

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

const AFV_UI_CSS: &str = include_str!("../../../static/afv-ui.css");
const FEATURE_CHARTS_JS: &str = include_str!("../../../static/feature-charts.js");

fn asset(content_type: &'static str, body: &'static str) -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", content_type),
            ("cache-control", "no-cache, no-store, must-revalidate"),
        ],
        body,
    )
        .into_response()
}

/// GET /static/afv-ui.css
pub async fn serve_afv_ui_css() -> Response {
    asset("text/css", AFV_UI_CSS)
}

/// GET /static/feature-charts.js
///
/// Canvas renderers for line plots and heatmaps
pub async fn serve_feature_charts_js() -> Response {
    asset("application/javascript", FEATURE_CHARTS_JS)
}
