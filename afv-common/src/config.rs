//! Configuration loading and config file resolution
//!
//! Bootstrap configuration is read from a TOML file. Resolution priority for
//! the file location:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. OS-dependent default (`<config_dir>/afv/<module>.toml`)
//!
//! A missing file is not fatal: built-in defaults are used and a warning is
//! logged. A file that exists but fails to parse or validate is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default HTTP port for afv-analyzer
pub const DEFAULT_PORT: u16 = 5790;

/// Default upload body limit (64 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Interface to bind the HTTP server to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted upload body size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Feature extraction settings (optional)
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Analysis parameters exposed to configuration
///
/// Window, hop and band counts default to the conventional values of common
/// audio-analysis libraries so charts look familiar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Number of columns the waveform envelope is reduced to for plotting
    #[serde(default = "default_waveform_points")]
    pub waveform_points: usize,

    /// FFT size (also the analysis window length)
    #[serde(default = "default_n_fft")]
    pub n_fft: usize,

    /// Samples between successive analysis frames
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,

    /// Mel bands in the mel spectrogram
    #[serde(default = "default_n_mels")]
    pub n_mels: usize,

    /// Cepstral coefficients kept for MFCC
    #[serde(default = "default_n_mfcc")]
    pub n_mfcc: usize,

    /// Octave sub-bands for spectral contrast
    #[serde(default = "default_n_bands")]
    pub n_bands: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_waveform_points() -> usize {
    2000
}

fn default_n_fft() -> usize {
    2048
}

fn default_hop_length() -> usize {
    512
}

fn default_n_mels() -> usize {
    128
}

fn default_n_mfcc() -> usize {
    20
}

fn default_n_bands() -> usize {
    6
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            logging: LoggingConfig::default(),
            analysis: AnalysisSettings::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            waveform_points: default_waveform_points(),
            n_fft: default_n_fft(),
            hop_length: default_hop_length(),
            n_mels: default_n_mels(),
            n_mfcc: default_n_mfcc(),
            n_bands: default_n_bands(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from a TOML string and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.bind_address.trim().is_empty() {
            return Err(Error::Config("bind_address must not be empty".to_string()));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be positive".to_string()));
        }
        self.analysis.validate()
    }
}

impl AnalysisSettings {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("waveform_points", self.waveform_points),
            ("n_fft", self.n_fft),
            ("hop_length", self.hop_length),
            ("n_mels", self.n_mels),
            ("n_mfcc", self.n_mfcc),
            ("n_bands", self.n_bands),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::Config(format!("analysis.{} must be positive", name)));
            }
        }

        if self.hop_length > self.n_fft {
            return Err(Error::Config(format!(
                "analysis.hop_length ({}) must not exceed analysis.n_fft ({})",
                self.hop_length, self.n_fft
            )));
        }

        if self.n_mfcc > self.n_mels {
            return Err(Error::Config(format!(
                "analysis.n_mfcc ({}) must not exceed analysis.n_mels ({})",
                self.n_mfcc, self.n_mels
            )));
        }

        Ok(())
    }
}

/// Resolve config file location following CLI → ENV → OS default priority
///
/// Returns `None` only when no OS config directory can be determined and
/// neither override is set.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    module_name: &str,
) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: OS-dependent default
    default_config_path(module_name)
}

/// `~/.config/afv/<module>.toml` on Linux, the platform equivalent elsewhere
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("afv").join(format!("{}.toml", module_name)))
}

/// Load the TOML config at `path`, falling back to defaults when absent
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        warn!("No config directory available, using built-in defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(
            "Config file not found at {}, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML {} failed: {}", path.display(), e)))?;
    let config = TomlConfig::from_toml_str(&content)?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}
