//! Root page handler - upload form and chart grid

use axum::response::{Html, IntoResponse};

use crate::features::FeatureKind;

/// One chart card per feature, error text shown in place of the canvas
fn chart_cards() -> String {
    FeatureKind::ALL
        .iter()
        .map(|kind| {
            format!(
                r#"
        <section class="chart-card" id="card-{id}" hidden>
            <h2>{title}</h2>
            <canvas id="chart-{id}" width="960" height="260"></canvas>
            <p class="chart-error" id="error-{id}" hidden></p>
        </section>"#,
                id = kind.as_str(),
                title = kind.title()
            )
        })
        .collect()
}

/// GET /
pub async fn root_page() -> impl IntoResponse {
    let build_timestamp = env!("BUILD_TIMESTAMP");
    let version = env!("CARGO_PKG_VERSION");
    let git_hash = env!("GIT_HASH");
    let build_profile = env!("BUILD_PROFILE");

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Audio Feature Visualizer</title>
    <link rel="stylesheet" href="/static/afv-ui.css">
</head>
<body>
    <header>
        <div class="header-content">
            <div class="header-left">
                <h1>Audio Feature Visualizer</h1>
                <p class="subtitle">Upload an MP3 or WAV file to inspect its audio features</p>
            </div>
            <div class="header-right">
                <div class="build-info-line">afv-analyzer v{version}</div>
                <div class="build-info-line">{git_hash} ({build_profile})</div>
                <div class="build-info-line">{build_timestamp}</div>
            </div>
        </div>
    </header>
    <main class="content">
        <form id="upload-form" class="upload-form">
            <input type="file" id="file-input" name="file" accept=".mp3,.wav,audio/mpeg,audio/wav">
            <button type="submit" class="button" id="analyze-button">Analyze</button>
            <span class="status" id="status"></span>
        </form>

        <section class="summary" id="summary" hidden>
            <audio id="player" controls></audio>
            <p id="duration-line"></p>
            <p id="rate-line"></p>
        </section>

        <div class="chart-grid">{cards}
        </div>
    </main>
    <script src="/static/feature-charts.js"></script>
</body>
</html>"#,
        version = version,
        git_hash = git_hash,
        build_profile = build_profile,
        build_timestamp = build_timestamp,
        cards = chart_cards(),
    ))
}
