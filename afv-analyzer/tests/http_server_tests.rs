//! HTTP Server & Routing Integration Tests
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

mod helpers;

use afv_analyzer::config::AnalyzerConfig;
use afv_analyzer::{build_router, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use helpers::{silent_mp3_bytes, wav_bytes, AudioConfig, Signal, MP3_FRAME_BYTES};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "afv-test-boundary-7d1f";

fn test_app() -> Router {
    build_router(AppState::new(AnalyzerConfig::default()))
}

/// Multipart body with a single file field
fn multipart_body(field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(field, file_name, bytes)))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// TC-HTTP-001: Root route serves the upload page
#[tokio::test]
async fn tc_http_001_root_route_serves_html() {
    let response = test_app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.contains("text/html"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Audio Feature Visualizer"));
    assert!(html.contains("/static/feature-charts.js"));
    assert!(html.contains("id=\"chart-spectral_contrast\""));
}

/// TC-HTTP-002: Static assets are served with their content types
#[tokio::test]
async fn tc_http_002_static_asset_serving() {
    for (uri, content_type) in [
        ("/static/afv-ui.css", "text/css"),
        ("/static/feature-charts.js", "application/javascript"),
    ] {
        let response = test_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert_eq!(response.headers().get("content-type").unwrap(), content_type);
    }
}

/// TC-HTTP-003: Health endpoint returns module identity
#[tokio::test]
async fn tc_http_003_health_endpoint_returns_json() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "afv-analyzer");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["uptime_seconds"].is_u64());
    assert!(json.get("last_error").is_none());
}

/// TC-HTTP-004: WAV upload returns metadata, playback and all six features
#[tokio::test]
async fn tc_http_004_analyze_wav_upload() {
    let wav = wav_bytes(&AudioConfig {
        duration_seconds: 1.0,
        sample_rate: 44100,
        channels: 2,
        signal: Signal::Tone(440.0),
    })
    .unwrap();

    let response = test_app()
        .oneshot(upload_request("file", "mixed.wav", &wav))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["file_name"], "mixed.wav");
    assert_eq!(json["sample_rate"], 16000);
    assert_eq!(json["sample_rate_display"], "16000 Hz");
    assert_eq!(json["sample_count"], 16000);
    assert_eq!(json["duration_display"], "1.00 seconds");
    assert_eq!(json["source"]["sample_rate"], 44100);
    assert_eq!(json["source"]["channels"], 2);

    assert_eq!(json["playback"]["mime"], "audio/wav");
    let playback = STANDARD
        .decode(json["playback"]["data_base64"].as_str().unwrap())
        .unwrap();
    assert_eq!(playback, wav);

    let features = json["features"].as_object().unwrap();
    let keys: Vec<&str> = features.keys().map(String::as_str).collect();
    assert_eq!(keys.len(), 6);
    for key in [
        "waveform",
        "mel_spectrogram",
        "mfcc",
        "chroma",
        "spectral_contrast",
        "zero_crossing_rate",
    ] {
        assert_eq!(features[key]["status"], "ok", "{} failed: {}", key, features[key]);
    }

    assert_eq!(features["waveform"]["artifact"]["type"], "envelope");
    assert_eq!(features["waveform"]["artifact"]["min"].as_array().unwrap().len(), 2000);
    assert_eq!(features["chroma"]["artifact"]["type"], "matrix");
    assert_eq!(features["chroma"]["artifact"]["rows"], 12);
    assert_eq!(features["mel_spectrogram"]["artifact"]["rows"], 128);
    assert!(features["mel_spectrogram"]["artifact"]["max"].as_f64().unwrap() <= 0.0);
    assert_eq!(features["zero_crossing_rate"]["artifact"]["type"], "series");

    let ticks = json["time_axis"].as_array().unwrap();
    assert_eq!(ticks.first().unwrap()["label"], "0.00s");
    assert_eq!(ticks.last().unwrap()["label"], "1.00s");
}

/// TC-HTTP-005: Short upload succeeds with per-feature errors
#[tokio::test]
async fn tc_http_005_short_upload_reports_feature_errors() {
    let wav = wav_bytes(&AudioConfig {
        duration_seconds: 0.01,
        sample_rate: 16000,
        channels: 1,
        signal: Signal::Tone(440.0),
    })
    .unwrap();

    let response = test_app()
        .oneshot(upload_request("file", "blip.wav", &wav))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["features"]["waveform"]["status"], "ok");
    assert_eq!(json["features"]["mfcc"]["status"], "error");
    assert!(json["features"]["mfcc"]["message"]
        .as_str()
        .unwrap()
        .contains("needs at least 2048 samples"));
}

/// TC-HTTP-006: Unsupported extension is 415
#[tokio::test]
async fn tc_http_006_unsupported_format() {
    let response = test_app()
        .oneshot(upload_request("file", "track.flac", b"fLaC"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "UNSUPPORTED_FORMAT");
}

/// TC-HTTP-007: Corrupt MP3 is 422 and recorded for /health
#[tokio::test]
async fn tc_http_007_corrupt_mp3_is_decode_error() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(upload_request("file", "broken.mp3", &b"not an mpeg stream at all ".repeat(200)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "DECODE_ERROR");

    let health = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = json_body(health).await;
    assert!(json["last_error"].as_str().unwrap().contains("Decode error"));
}

/// TC-HTTP-008: Empty file and missing field are 400 EMPTY_INPUT
#[tokio::test]
async fn tc_http_008_empty_input() {
    let response = test_app()
        .oneshot(upload_request("file", "empty.wav", b""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "EMPTY_INPUT");

    let response = test_app()
        .oneshot(upload_request("attachment", "song.wav", b"RIFF"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "EMPTY_INPUT");
}

/// TC-HTTP-009: Uploads above the configured limit are 413
#[tokio::test]
async fn tc_http_009_payload_too_large() {
    let config = AnalyzerConfig {
        max_upload_bytes: 4 * 1024,
        ..AnalyzerConfig::default()
    };
    let app = build_router(AppState::new(config));

    let wav = wav_bytes(&AudioConfig {
        duration_seconds: 1.0,
        ..AudioConfig::default()
    })
    .unwrap();
    let response = app.oneshot(upload_request("file", "big.wav", &wav)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

/// TC-HTTP-010: Unknown routes are 404
#[tokio::test]
async fn tc_http_010_unknown_route() {
    let response = test_app()
        .oneshot(Request::builder().uri("/import").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// TC-HTTP-011: MP3 upload is analyzed and played back as audio/mpeg
#[tokio::test]
async fn tc_http_011_analyze_mp3_upload() {
    let mp3 = silent_mp3_bytes(100);

    let response = test_app()
        .oneshot(upload_request("file", "quiet.mp3", &mp3))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["sample_rate"], 16000);
    assert_eq!(json["sample_count"], 41796);
    assert_eq!(json["source"]["format"], "mp3");
    assert_eq!(json["source"]["sample_rate"], 44100);
    assert_eq!(json["playback"]["mime"], "audio/mpeg");
    assert_eq!(
        STANDARD
            .decode(json["playback"]["data_base64"].as_str().unwrap())
            .unwrap(),
        mp3
    );
    assert_eq!(json["features"]["zero_crossing_rate"]["status"], "ok");
}

/// TC-HTTP-012: MP3 cut mid-frame is 422
#[tokio::test]
async fn tc_http_012_truncated_mp3_rejected() {
    let mp3 = silent_mp3_bytes(4);
    let cut = &mp3[..3 * MP3_FRAME_BYTES + 50];

    let response = test_app()
        .oneshot(upload_request("file", "cut.mp3", cut))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"]["code"], "DECODE_ERROR");
}
