//! Per-invocation data handed to component hooks

use std::cell::RefCell;
use std::sync::Arc;

use ash::vk;

use super::component::Component;
use super::node::NodeTree;
use super::registry::{Owner, Registry};
use crate::backend::vulkan::{CommandRecorder, FrameRotator, RenderContext, INFLIGHT_FRAME_COUNT};
use crate::foundation::collections::{BufferSetKey, ComponentKey, NodeKey};
use crate::scene::Scene;

/// Timing of one simulated tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameUpdateInfo {
    /// Monotonic tick counter
    pub frame_number: u64,
    /// Seconds since the previous tick
    pub delta_seconds: f32,
    /// Seconds since the clock started
    pub total_seconds: f64,
}

impl FrameUpdateInfo {
    /// Update info for `frame_number` with a fixed delta
    pub fn fixed(frame_number: u64, delta_seconds: f32) -> Self {
        Self {
            frame_number,
            delta_seconds,
            total_seconds: frame_number as f64 * f64::from(delta_seconds),
        }
    }
}

/// Identity of one rendered frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameRenderInfo {
    /// Monotonic frame counter, selects per-frame resources
    pub frame_number: u64,
}

impl FrameRenderInfo {
    /// Render info for `frame_number`
    pub fn new(frame_number: u64) -> Self {
        Self { frame_number }
    }

    /// Slot of the frame in flight this frame writes
    pub fn in_flight_index(&self) -> usize {
        FrameRotator::<(), INFLIGHT_FRAME_COUNT>::slot_index(self.frame_number)
    }
}

/// Mutable recording state shared by all draw hooks of one frame
pub struct SceneDrawInfo<'a> {
    frame: FrameRenderInfo,
    recorder: &'a mut dyn CommandRecorder,
    bound_geometry: Option<BufferSetKey>,
}

impl<'a> SceneDrawInfo<'a> {
    /// Start recording `frame` into `recorder`
    pub fn new(frame: FrameRenderInfo, recorder: &'a mut dyn CommandRecorder) -> Self {
        Self {
            frame,
            recorder,
            bound_geometry: None,
        }
    }

    /// Frame being recorded
    pub fn frame(&self) -> FrameRenderInfo {
        self.frame
    }

    /// Command sink
    pub fn recorder(&mut self) -> &mut dyn CommandRecorder {
        &mut *self.recorder
    }

    /// Push the instance transform offset the vertex shader adds to `gl_InstanceIndex`
    pub fn push_transform_offset(&mut self, offset: u32) {
        self.recorder
            .push_constants(vk::ShaderStageFlags::VERTEX, 0, bytemuck::bytes_of(&offset));
    }

    /// Geometry buffer set bound by the last draw
    pub fn bound_geometry(&self) -> Option<BufferSetKey> {
        self.bound_geometry
    }

    /// Remember the bound geometry buffer set
    pub fn set_bound_geometry(&mut self, key: Option<BufferSetKey>) {
        self.bound_geometry = key;
    }
}

type DeferredChange = Box<dyn FnOnce(&mut Scene)>;

/// Structural changes queued by hooks, applied before the next update or draw pass
#[derive(Default)]
pub struct DeferredQueue {
    pending: RefCell<Vec<DeferredChange>>,
}

impl DeferredQueue {
    /// Queue a change
    pub fn push(&self, change: impl FnOnce(&mut Scene) + 'static) {
        self.pending.borrow_mut().push(Box::new(change));
    }

    /// Number of queued changes
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Remove and return everything queued
    pub fn take(&self) -> Vec<DeferredChange> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }
}

impl std::fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredQueue").field("pending", &self.len()).finish()
    }
}

/// Read access to the scene from inside a hook
///
/// The component whose hook is running is detached from its registry for the
/// duration of the call, so lookups never return it.
pub struct HookContext<'a> {
    pub(crate) owner: Owner,
    pub(crate) tree: &'a NodeTree,
    pub(crate) locals: &'a Registry,
    pub(crate) globals: &'a Registry,
    pub(crate) render: &'a Arc<RenderContext>,
    pub(crate) deferred: &'a DeferredQueue,
}

impl<'a> HookContext<'a> {
    /// Who owns the running component
    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// Owning node, `None` for global components
    pub fn owner_node(&self) -> Option<NodeKey> {
        match self.owner {
            Owner::Node(key) => Some(key),
            Owner::Scene => None,
        }
    }

    /// Node hierarchy
    pub fn tree(&self) -> &'a NodeTree {
        self.tree
    }

    /// Rendering context of the scene
    pub fn render_context(&self) -> &'a Arc<RenderContext> {
        self.render
    }

    /// Node-local component registry
    pub fn locals(&self) -> &'a Registry {
        self.locals
    }

    /// Global component registry
    pub fn globals(&self) -> &'a Registry {
        self.globals
    }

    /// First global component of type `T`
    pub fn global<T: Component>(&self) -> Option<&'a T> {
        self.globals.first::<T>()
    }

    /// Component of type `T` attached to `node`
    pub fn component<T: Component>(&self, node: NodeKey) -> Option<&'a T> {
        let node = self.tree.get(node)?;
        node.components()
            .iter()
            .find_map(|&key| self.locals.get_as::<T>(key))
    }

    /// Nodes carrying a component of type `T`, with the component key
    pub fn nodes_with_component<T: Component>(&self) -> Vec<(NodeKey, ComponentKey)> {
        self.locals
            .find_all::<T>()
            .into_iter()
            .filter_map(|key| match self.locals.owner(key)? {
                Owner::Node(node) => Some((node, key)),
                Owner::Scene => None,
            })
            .collect()
    }

    /// Queue a structural change; it runs at the start of the next update or draw
    pub fn defer(&self, change: impl FnOnce(&mut Scene) + 'static) {
        self.deferred.push(change);
    }
}
