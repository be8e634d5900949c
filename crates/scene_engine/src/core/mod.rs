//! # Core Module
//!
//! Shared configuration types used by the scene, its components and the loader.

pub mod config;

pub use config::{CameraConfig, Config, ConfigError, FlightConfig, LoaderConfig, SceneConfig};
