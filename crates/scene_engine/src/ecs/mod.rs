//! Scene graph component model
//!
//! Nodes form a hierarchy; components attach to a node or to the scene and
//! opt into the update, before-draw, draw and event hooks. Registries own the
//! components and dispatch each hook in attach order.

pub mod component;
pub mod components;
pub mod context;
pub mod globals;
pub mod node;
pub mod registry;

#[cfg(test)]
mod tests;

pub use component::{
    downcast_mut, downcast_ref, query_capabilities, AsAny, Capabilities, Component, OnBeforeDraw, OnDraw, OnEvent,
    OnUpdate,
};
pub use context::{DeferredQueue, FrameRenderInfo, FrameUpdateInfo, HookContext, SceneDrawInfo};
pub use node::{Node, NodeTree};
pub use registry::{Owner, Registry, Scope};
