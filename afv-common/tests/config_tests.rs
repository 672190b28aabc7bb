//! Unit tests for configuration resolution and graceful degradation
//!
//! Tests:
//! - Missing TOML files do not cause failure (defaults + warning)
//! - Priority order for config path resolution (CLI > ENV > OS default)
//! - Invalid files are rejected with a configuration error
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate AFV_CONFIG are marked with #[serial].

use afv_common::config::{
    default_config_path, load_or_default, resolve_config_path, TomlConfig, DEFAULT_PORT,
};
use afv_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ENV_VAR: &str = "AFV_CONFIG";

#[test]
#[serial]
fn test_cli_path_wins_over_env() {
    env::set_var(ENV_VAR, "/from/env.toml");

    let resolved = resolve_config_path(Some(Path::new("/from/cli.toml")), ENV_VAR, "afv-analyzer");
    assert_eq!(resolved, Some(PathBuf::from("/from/cli.toml")));

    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    env::set_var(ENV_VAR, "/from/env.toml");

    let resolved = resolve_config_path(None, ENV_VAR, "afv-analyzer");
    assert_eq!(resolved, Some(PathBuf::from("/from/env.toml")));

    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_blank_env_falls_back_to_default() {
    env::set_var(ENV_VAR, "   ");

    let resolved = resolve_config_path(None, ENV_VAR, "afv-analyzer");
    assert_eq!(resolved, default_config_path("afv-analyzer"));

    env::remove_var(ENV_VAR);
}

#[test]
fn test_default_path_is_module_specific() {
    if let Some(path) = default_config_path("afv-analyzer") {
        assert!(path.ends_with("afv/afv-analyzer.toml"));
    }
}

#[test]
fn test_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("does-not-exist.toml");

    let config = load_or_default(Some(&missing)).unwrap();
    assert_eq!(config, TomlConfig::default());
    assert_eq!(config.port, DEFAULT_PORT);
}

#[test]
fn test_no_path_uses_defaults() {
    let config = load_or_default(None).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_existing_file_is_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("afv-analyzer.toml");
    std::fs::write(
        &path,
        r#"
bind_address = "0.0.0.0"
port = 8080

[logging]
level = "debug"

[analysis]
hop_length = 256
"#,
    )
    .unwrap();

    let config = load_or_default(Some(&path)).unwrap();
    assert_eq!(config.bind_address, "0.0.0.0");
    assert_eq!(config.port, 8080);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.analysis.hop_length, 256);
    assert_eq!(config.analysis.n_fft, 2048);
}

#[test]
fn test_invalid_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "[analysis]\nhop_length = 4096\n").unwrap();

    let result = load_or_default(Some(&path));
    assert!(matches!(result, Err(Error::Config(_))));
}
