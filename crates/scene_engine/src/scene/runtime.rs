//! The scene: node tree, component registries and per-frame entry points

use std::sync::Arc;

use ash::vk;

use crate::backend::vulkan::{CommandRecorder, RenderContext};
use crate::core::SceneConfig;
use crate::ecs::components::MeshInstance;
use crate::ecs::globals::{DrawDirector, GeometryStore, MaterialBuffer, TextureStore};
use crate::ecs::registry::DispatchEnv;
use crate::ecs::{
    Component, DeferredQueue, FrameRenderInfo, FrameUpdateInfo, Node, NodeTree, Owner, Registry, SceneDrawInfo, Scope,
};
use crate::error::SceneResult;
use crate::events::Event;
use crate::foundation::collections::{ComponentKey, MeshKey, NodeKey};

/// Lifecycle position of a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneState {
    /// Default globals only, no content yet
    Uninitialized,
    /// Content present, no frame processed since
    Loaded,
    /// Last entry point was `update`
    Updating,
    /// Last entry point was `draw`
    Drawing,
    /// Torn down by `cleanup(false)`
    Cleaned,
}

/// Root of a renderable scene
///
/// Owns every node and component. Per frame, callers run [`update`](Self::update)
/// once per tick, then [`draw`](Self::draw) once per rendered frame; within each
/// phase node-local components run before global ones.
///
/// Hooks only see the scene through shared borrows. Structural changes they
/// request with [`HookContext::defer`](crate::ecs::HookContext::defer) are
/// applied at the start of the next `update` or `draw`.
pub struct Scene {
    context: Arc<RenderContext>,
    config: SceneConfig,
    tree: NodeTree,
    locals: Registry,
    globals: Registry,
    deferred: DeferredQueue,
    plan_dirty: bool,
    state: SceneState,
}

impl Scene {
    /// Empty scene with default configuration
    pub fn new(context: Arc<RenderContext>) -> Self {
        Self::with_config(context, SceneConfig::default())
    }

    /// Empty scene carrying the default global components
    pub fn with_config(context: Arc<RenderContext>, config: SceneConfig) -> Self {
        let mut scene = Self {
            context,
            config,
            tree: NodeTree::new(),
            locals: Registry::new(Scope::Local),
            globals: Registry::new(Scope::Global),
            deferred: DeferredQueue::default(),
            plan_dirty: false,
            state: SceneState::Uninitialized,
        };
        scene.init_default_globals();
        scene
    }

    /// Scene backed by a host memory allocator
    pub fn headless(extent: vk::Extent2D, config: SceneConfig) -> Self {
        let context = RenderContext::headless(extent).with_debug_names(config.debug_names);
        Self::with_config(Arc::new(context), config)
    }

    fn init_default_globals(&mut self) {
        self.globals.register(Owner::Scene, Box::new(MaterialBuffer::new()));
        self.globals.register(Owner::Scene, Box::new(GeometryStore::new()));
        self.globals.register(Owner::Scene, Box::new(TextureStore::new()));
    }

    /// Rendering context
    pub fn context(&self) -> &Arc<RenderContext> {
        &self.context
    }

    /// Configuration the scene was built with
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Lifecycle state
    pub fn state(&self) -> SceneState {
        self.state
    }

    /// Node hierarchy
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// Node-local registry
    pub fn locals(&self) -> &Registry {
        &self.locals
    }

    /// Global registry
    pub fn globals(&self) -> &Registry {
        &self.globals
    }

    fn content_changed(&mut self) {
        self.plan_dirty = true;
        if matches!(self.state, SceneState::Uninitialized | SceneState::Cleaned) {
            self.state = SceneState::Loaded;
        }
    }

    pub(crate) fn mark_loaded(&mut self) {
        self.state = SceneState::Loaded;
    }

    /// Create a node under `parent`, or a root node
    ///
    /// # Panics
    /// If `parent` is not a node of this scene.
    pub fn make_node(&mut self, parent: Option<NodeKey>) -> NodeKey {
        let key = self.tree.insert(parent);
        self.content_changed();
        key
    }

    /// Remove a node, its descendants and all their components
    pub fn remove_node(&mut self, node: NodeKey) {
        for component in self.tree.remove(node) {
            self.locals.remove(component);
        }
        self.content_changed();
    }

    /// Attach `component` to `node`
    ///
    /// # Panics
    /// If `node` is not a node of this scene.
    pub fn make_component<C: Component>(&mut self, node: NodeKey, component: C) -> ComponentKey {
        assert!(self.tree.contains(node), "component attached to unknown node {node:?}");
        let key = self.locals.register(Owner::Node(node), Box::new(component));
        self.tree.attach_component(node, key);
        self.content_changed();
        key
    }

    /// Attach a scene-wide component
    pub fn make_global<C: Component>(&mut self, component: C) -> ComponentKey {
        let key = self.globals.register(Owner::Scene, Box::new(component));
        self.content_changed();
        key
    }

    /// Remove a node-local or global component; returns whether it existed
    pub fn remove_component(&mut self, key: ComponentKey) -> bool {
        if let Some(owner) = self.locals.owner(key) {
            if let Owner::Node(node) = owner {
                self.tree.detach_component(node, key);
            }
            self.locals.remove(key);
        } else if !self.globals.remove(key) {
            return false;
        }
        self.plan_dirty = true;
        true
    }

    /// Point the [`MeshInstance`] on `node` at another mesh
    ///
    /// Returns `false` if the node carries no mesh instance.
    pub fn set_instance_mesh(&mut self, node: NodeKey, mesh: MeshKey) -> bool {
        let Some(instance) = self.get_component_mut::<MeshInstance>(node) else {
            return false;
        };
        if instance.mesh() != mesh {
            instance.set_mesh(mesh);
            self.plan_dirty = true;
        }
        true
    }

    /// First component of type `T` on `node`
    pub fn get_component<T: Component>(&self, node: NodeKey) -> Option<&T> {
        self.tree
            .get(node)?
            .components()
            .iter()
            .find_map(|&key| self.locals.get_as::<T>(key))
    }

    /// Mutable first component of type `T` on `node`
    pub fn get_component_mut<T: Component>(&mut self, node: NodeKey) -> Option<&mut T> {
        let key = self
            .tree
            .get(node)?
            .components()
            .iter()
            .copied()
            .find(|&key| self.locals.get_as::<T>(key).is_some())?;
        self.locals.get_as_mut::<T>(key)
    }

    /// First global component of type `T`
    pub fn global<T: Component>(&self) -> Option<&T> {
        self.globals.first::<T>()
    }

    /// Mutable first global component of type `T`
    pub fn global_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.globals.first_mut::<T>()
    }

    /// Run `f` with a global component and the rendering context
    pub fn with_global_mut<T: Component, R>(&mut self, f: impl FnOnce(&mut T, &Arc<RenderContext>) -> R) -> Option<R> {
        let global = self.globals.first_mut::<T>()?;
        Some(f(global, &self.context))
    }

    /// Nodes carrying a `T`, in creation order
    pub fn find_nodes_with_component<T: Component>(&self) -> Vec<NodeKey> {
        self.tree
            .iter()
            .filter(|(_, node)| {
                node.components()
                    .iter()
                    .any(|&key| self.locals.get_as::<T>(key).is_some())
            })
            .map(|(key, _)| key)
            .collect()
    }

    /// Node by key
    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.tree.get(key)
    }

    /// Mutable node by key
    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.tree.get_mut(key)
    }

    /// Node at `index` in creation order
    pub fn node_by_index(&self, index: usize) -> Option<NodeKey> {
        self.tree.node_by_index(index)
    }

    /// Root nodes in creation order
    pub fn root_nodes(&self) -> &[NodeKey] {
        self.tree.roots()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.tree.len()
    }

    /// Whether the draw plan is out of date
    pub fn draw_plan_dirty(&self) -> bool {
        self.plan_dirty
    }

    /// Rebuild the [`DrawDirector`]'s plan if the scene has one
    pub fn refresh_draw_plan(&mut self) -> SceneResult<()> {
        if let Some(director) = self.globals.first_mut::<DrawDirector>() {
            director.init_or_update(&self.context, &self.tree, &self.locals)?;
        }
        self.plan_dirty = false;
        Ok(())
    }

    fn apply_deferred(&mut self) {
        let changes = self.deferred.take();
        if !changes.is_empty() {
            log::debug!("Applying {} deferred scene changes", changes.len());
        }
        for change in changes {
            change(self);
        }
    }

    /// Advance one tick: deferred changes, then local and global update hooks
    pub fn update(&mut self, info: &FrameUpdateInfo) -> SceneResult<()> {
        self.apply_deferred();
        self.state = SceneState::Updating;

        self.locals.invoke_update(
            info,
            &DispatchEnv {
                tree: &self.tree,
                peer: &self.globals,
                render: &self.context,
                deferred: &self.deferred,
            },
        )?;
        self.globals.invoke_update(
            info,
            &DispatchEnv {
                tree: &self.tree,
                peer: &self.locals,
                render: &self.context,
                deferred: &self.deferred,
            },
        )
    }

    /// Record one frame: before-draw hooks, then draw hooks
    ///
    /// Applies pending deferred changes, then rebuilds the draw plan if the
    /// set of nodes, components or instanced meshes changed.
    pub fn draw(&mut self, info: &FrameRenderInfo, recorder: &mut dyn CommandRecorder) -> SceneResult<()> {
        self.apply_deferred();
        if self.plan_dirty {
            self.refresh_draw_plan()?;
        }
        self.state = SceneState::Drawing;

        self.locals.invoke_before_draw(
            info,
            &DispatchEnv {
                tree: &self.tree,
                peer: &self.globals,
                render: &self.context,
                deferred: &self.deferred,
            },
        )?;
        self.globals.invoke_before_draw(
            info,
            &DispatchEnv {
                tree: &self.tree,
                peer: &self.locals,
                render: &self.context,
                deferred: &self.deferred,
            },
        )?;

        let mut draw_info = SceneDrawInfo::new(*info, recorder);
        self.locals.invoke_draw(
            &mut draw_info,
            &DispatchEnv {
                tree: &self.tree,
                peer: &self.globals,
                render: &self.context,
                deferred: &self.deferred,
            },
        )?;
        self.globals.invoke_draw(
            &mut draw_info,
            &DispatchEnv {
                tree: &self.tree,
                peer: &self.locals,
                render: &self.context,
                deferred: &self.deferred,
            },
        )
    }

    /// Deliver an input or window event to local, then global handlers
    pub fn handle_event(&mut self, event: &Event) {
        self.locals.invoke_on_event(
            event,
            &DispatchEnv {
                tree: &self.tree,
                peer: &self.globals,
                render: &self.context,
                deferred: &self.deferred,
            },
        );
        self.globals.invoke_on_event(
            event,
            &DispatchEnv {
                tree: &self.tree,
                peer: &self.locals,
                render: &self.context,
                deferred: &self.deferred,
            },
        );
    }

    /// Release every node and component
    ///
    /// Safe to call repeatedly. With `reinitialize` the default global
    /// components are recreated and the scene is ready for new content.
    pub fn cleanup(&mut self, reinitialize: bool) {
        for component in self.tree.clear() {
            self.locals.remove(component);
        }
        self.locals.cleanup();
        self.globals.cleanup();
        drop(self.deferred.take());
        self.plan_dirty = false;
        self.state = SceneState::Cleaned;

        if reinitialize {
            self.init_default_globals();
            self.state = SceneState::Loaded;
        }
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        self.cleanup(false);
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("state", &self.state)
            .field("nodes", &self.tree.len())
            .field("locals", &self.locals.len())
            .field("globals", &self.globals.len())
            .finish()
    }
}
