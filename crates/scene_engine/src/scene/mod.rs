//! Scene runtime
//!
//! [`Scene`] ties the node tree and both component registries to a
//! rendering context and exposes the per-frame entry points.

mod runtime;

pub use runtime::{Scene, SceneState};
