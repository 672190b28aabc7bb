//! Test Helper Utilities
//!
//! Shared utilities for testing afv-analyzer

#![allow(dead_code, unused_imports)]

pub mod audio_generator;

pub use audio_generator::{
    silent_mp3_bytes, wav_bytes, AudioConfig, Signal, MP3_FRAME_BYTES, MP3_FRAME_SAMPLES,
    MP3_SAMPLE_RATE,
};
