//! Runtime configuration for afv-analyzer
//!
//! Resolution priority for server settings: CLI → ENV → TOML → defaults.
//! CLI and environment are merged by clap before they reach here (each
//! argument declares its `AFV_*` fallback), so this module only layers the
//! resulting overrides on top of the TOML file.

use std::net::SocketAddr;

use afv_common::config::TomlConfig;
use afv_common::{Error, Result};
use tracing_subscriber::EnvFilter;

use crate::features::FeatureParams;

/// Values supplied on the command line or through `AFV_*` variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerOverrides {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
}

/// Fully resolved configuration, snapshotted into every analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    pub bind_address: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub log_level: String,
    /// Columns in the plotted waveform envelope
    pub waveform_points: usize,
    pub features: FeatureParams,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::from_toml(&TomlConfig::default())
    }
}

impl AnalyzerConfig {
    pub fn from_toml(toml: &TomlConfig) -> Self {
        Self {
            bind_address: toml.bind_address.clone(),
            port: toml.port,
            max_upload_bytes: toml.max_upload_bytes,
            log_level: toml.logging.level.clone(),
            waveform_points: toml.analysis.waveform_points,
            features: FeatureParams::from_settings(&toml.analysis),
        }
    }

    /// Apply CLI/ENV overrides on top of the TOML values
    pub fn resolve(toml: &TomlConfig, overrides: &ServerOverrides) -> Result<Self> {
        let mut config = Self::from_toml(toml);

        if let Some(port) = overrides.port {
            config.port = port;
        }

        if let Some(bind) = overrides.bind_address.as_deref() {
            let bind = bind.trim();
            if bind.is_empty() {
                return Err(Error::Config("bind address override is blank".to_string()));
            }
            config.bind_address = bind.to_string();
        }

        config.socket_addr()?;
        Ok(config)
    }

    /// Log filter for `log_level`, falling back to `info` when it does not parse
    ///
    /// `RUST_LOG` still wins; the binary consults it before this.
    pub fn log_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// Listen address parsed from `bind_address` and `port`
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| {
                Error::Config(format!(
                    "Invalid listen address {}:{}: {}",
                    self.bind_address, self.port, e
                ))
            })
    }
}
