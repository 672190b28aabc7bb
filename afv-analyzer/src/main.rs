//! afv-analyzer - Audio Feature Visualizer
//!
//! Serves an upload page; each uploaded `.mp3`/`.wav` is normalized to
//! 16 kHz mono and charted as waveform, mel spectrogram, MFCC, chroma,
//! spectral contrast and zero-crossing rate.

use std::path::PathBuf;

use afv_common::config::{load_or_default, resolve_config_path};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use afv_analyzer::config::{AnalyzerConfig, ServerOverrides};
use afv_analyzer::AppState;

const MODULE_NAME: &str = "afv-analyzer";

/// Command-line arguments; each falls back to its `AFV_*` variable
#[derive(Debug, Parser)]
#[command(name = "afv-analyzer", version, about = "Audio feature visualizer")]
struct Args {
    /// HTTP port
    #[arg(short, long, env = "AFV_PORT")]
    port: Option<u16>,

    /// Interface to bind
    #[arg(short, long, env = "AFV_BIND")]
    bind: Option<String>,

    /// Configuration file (default: <config_dir>/afv/afv-analyzer.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first so its log level can seed the filter
    let config_path = resolve_config_path(args.config.as_deref(), "AFV_CONFIG", MODULE_NAME);
    let toml_config = load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;

    let overrides = ServerOverrides {
        port: args.port,
        bind_address: args.bind,
    };
    let config = AnalyzerConfig::resolve(&toml_config, &overrides)
        .context("Invalid server configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_filter());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting {} (Audio Feature Visualizer)", MODULE_NAME);
    match &config_path {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        Some(path) => warn!("Config file {} not found; using built-in defaults", path.display()),
        None => warn!("No config directory available; using built-in defaults"),
    }
    info!(
        "Version: {} ({}, {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );

    if config.port != toml_config.port {
        info!("Port {} overrides configured port {}", config.port, toml_config.port);
    }
    let addr = config.socket_addr()?;
    info!(
        "Analysis: n_fft={} hop={} n_mels={} n_mfcc={} n_bands={}",
        config.features.n_fft,
        config.features.hop_length,
        config.features.n_mels,
        config.features.n_mfcc,
        config.features.n_bands
    );

    let app = afv_analyzer::build_router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
