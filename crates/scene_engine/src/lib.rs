//! # Scene Engine
//!
//! Scene graph runtime for glTF content rendered with Vulkan.
//!
//! ## Features
//!
//! - **Component dispatch**: components opt into update, before-draw, draw and
//!   event hooks; node-local components run before scene-wide ones
//! - **Batched drawing**: every mesh instance is drawn through one instanced
//!   draw per mesh with per-frame transform buffers
//! - **Frame-in-flight resources**: uniform and storage buffers rotate per frame
//! - **Tracked allocations**: every GPU allocation goes through an injected
//!   allocator and a leak tracker
//! - **glTF import**: textures, materials, meshes, node hierarchy and cameras
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), SceneError> {
//!     let mut scene = Scene::headless(ash::vk::Extent2D { width: 1280, height: 720 }, SceneConfig::default());
//!     let report = load_gltf(&mut scene, "models/box.gltf")?;
//!     println!("{}", report.summary());
//!
//!     let mut clock = FrameClock::new();
//!     let mut commands = CommandLog::new();
//!     for _ in 0..3 {
//!         scene.update(&clock.tick())?;
//!         scene.draw(&clock.render_info(), &mut commands)?;
//!     }
//!     scene.cleanup(false);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod error;

pub mod assets;
pub mod backend;
pub mod ecs;
pub mod events;
pub mod foundation;
pub mod scene;

pub use error::{SceneError, SceneResult};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{load_gltf, load_gltf_slice, LoadReport, Vertex},
        backend::vulkan::{
            CommandLog, CommandRecorder, FrameRotator, GpuAllocator, HostAllocator, RenderContext,
            VulkanCommandRecorder, VmaAllocator,
        },
        core::{Config, SceneConfig},
        ecs::{
            components::{Camera, FreeFlightController, MeshInstance},
            globals::{DrawDirector, GeometryStore, MaterialBuffer, TextureStore},
            Component, FrameRenderInfo, FrameUpdateInfo, HookContext, OnBeforeDraw, OnDraw, OnEvent, OnUpdate,
            SceneDrawInfo,
        },
        error::{SceneError, SceneResult},
        events::{Event, EventKind, Key},
        foundation::{
            math::{Mat4, Transform, Vec3},
            time::FrameClock,
        },
        scene::{Scene, SceneState},
    };
}
