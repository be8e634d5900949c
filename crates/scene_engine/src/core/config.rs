//! # Scene Configuration
//!
//! Tunables for the scene runtime, grouped by subsystem. Every struct uses
//! `#[serde(default)]` so partial files only override what they name.
//!
//! ```toml
//! debug_names = true
//!
//! [camera]
//! vertical_fov_degrees = 60.0
//!
//! [loader]
//! create_cameras = false
//! ```

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};

/// Top level configuration for a [`Scene`](crate::scene::Scene)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Log resource names when GPU allocations are created and destroyed
    pub debug_names: bool,
    /// Default projection parameters for cameras
    pub camera: CameraConfig,
    /// Free flight camera controls
    pub flight: FlightConfig,
    /// glTF conversion options
    pub loader: LoaderConfig,
}

impl Config for SceneConfig {}

/// Perspective defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub vertical_fov_degrees: f32,
    /// Near clip plane distance
    pub near_plane: f32,
    /// Far clip plane distance
    pub far_plane: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            vertical_fov_degrees: 75.0,
            near_plane: 0.1,
            far_plane: 10_000.0,
        }
    }
}

impl CameraConfig {
    /// Field of view in radians
    pub fn vertical_fov(&self) -> f32 {
        self.vertical_fov_degrees.to_radians()
    }
}

/// Free flight controller tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// Movement speed in world units per second
    pub speed: f32,
    /// Speed multiplier while boost is held
    pub boost_factor: f32,
    /// Degrees of rotation per pixel of mouse travel
    pub mouse_sensitivity: f32,
    /// Pitch is clamped to plus/minus this many degrees
    pub max_pitch_degrees: f32,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            boost_factor: 3.0,
            mouse_sensitivity: 0.1,
            max_pitch_degrees: 89.0,
        }
    }
}

/// glTF conversion options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Load this glTF scene instead of the document's default scene
    pub scene_index: Option<usize>,
    /// Add a draw director to the scene after loading if none exists
    pub create_draw_director: bool,
    /// Attach camera components to nodes carrying glTF perspective cameras
    pub create_cameras: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            scene_index: None,
            create_draw_director: true,
            create_cameras: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = SceneConfig::default();
        assert_relative_eq!(config.camera.vertical_fov(), 75f32.to_radians());
        assert_relative_eq!(config.camera.near_plane, 0.1);
        assert_relative_eq!(config.flight.max_pitch_degrees, 89.0);
        assert!(config.loader.create_draw_director);
        assert_eq!(config.loader.scene_index, None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SceneConfig = toml::from_str(
            "debug_names = true\n[camera]\nvertical_fov_degrees = 60.0\n",
        )
        .unwrap();

        assert!(config.debug_names);
        assert_relative_eq!(config.camera.vertical_fov_degrees, 60.0);
        assert_relative_eq!(config.camera.far_plane, 10_000.0);
        assert_eq!(config.flight, FlightConfig::default());
    }

    #[test]
    fn test_ron_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.ron");

        let mut config = SceneConfig::default();
        config.loader.scene_index = Some(2);
        config.flight.speed = 12.5;
        config.save_to_file(&path).unwrap();

        let loaded = SceneConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        std::fs::write(&path, "{}").unwrap();

        let result = SceneConfig::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = SceneConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, SceneConfig::default());
    }
}
