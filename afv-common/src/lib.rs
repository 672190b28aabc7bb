//! # AFV Common Library
//!
//! Shared code for the audio feature visualizer crates:
//! - Error type shared by configuration and I/O helpers
//! - TOML bootstrap configuration with CLI/ENV override resolution
//! - Human-readable duration and rate formatting

pub mod config;
pub mod error;
pub mod human_time;

pub use error::{Error, Result};
