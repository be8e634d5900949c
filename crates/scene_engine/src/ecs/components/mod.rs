//! Components attached to scene nodes

pub mod camera;
pub mod free_flight;
pub mod mesh_instance;

pub use camera::{Camera, CameraUboBlock};
pub use free_flight::{FreeFlightController, MovementKeys};
pub use mesh_instance::MeshInstance;
