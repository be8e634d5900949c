//! Component registries and capability dispatch
//!
//! A scene has two registries: the local one for components attached to
//! nodes and the global one for scene-wide components. Each registry owns its
//! components and keeps one dispatch list per [`Capabilities`] flag, filled
//! in registration order. Dispatch walks a list front to back.

use std::sync::Arc;

use super::component::{downcast_mut, downcast_ref, query_capabilities, Capabilities, Component};
use super::context::{
    DeferredQueue, FrameRenderInfo, FrameUpdateInfo, HookContext, SceneDrawInfo,
};
use super::node::NodeTree;
use crate::backend::vulkan::RenderContext;
use crate::error::SceneResult;
use crate::events::Event;
use crate::foundation::collections::{ComponentKey, NodeKey, SlotMap};

/// Which registry a component lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Attached to a node
    Local,
    /// Attached to the scene
    Global,
}

/// Owner of a registered component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// The scene itself
    Scene,
    /// A node of the scene
    Node(NodeKey),
}

struct ComponentSlot {
    owner: Owner,
    capabilities: Capabilities,
    component: Option<Box<dyn Component>>,
}

#[derive(Default)]
struct DispatchLists {
    update: Vec<ComponentKey>,
    before_draw: Vec<ComponentKey>,
    draw: Vec<ComponentKey>,
    event: Vec<ComponentKey>,
}

impl DispatchLists {
    fn lists_mut(&mut self) -> [(Capabilities, &mut Vec<ComponentKey>); 4] {
        [
            (Capabilities::UPDATE, &mut self.update),
            (Capabilities::BEFORE_DRAW, &mut self.before_draw),
            (Capabilities::DRAW, &mut self.draw),
            (Capabilities::EVENT, &mut self.event),
        ]
    }

    fn list(&self, capability: Capabilities) -> &[ComponentKey] {
        if capability == Capabilities::UPDATE {
            &self.update
        } else if capability == Capabilities::BEFORE_DRAW {
            &self.before_draw
        } else if capability == Capabilities::DRAW {
            &self.draw
        } else if capability == Capabilities::EVENT {
            &self.event
        } else {
            &[]
        }
    }
}

/// Scene state a dispatch pass hands to hooks
pub(crate) struct DispatchEnv<'a> {
    pub tree: &'a NodeTree,
    pub peer: &'a Registry,
    pub render: &'a Arc<RenderContext>,
    pub deferred: &'a DeferredQueue,
}

/// Owning store of components with per-capability dispatch lists
pub struct Registry {
    scope: Scope,
    slots: SlotMap<ComponentKey, ComponentSlot>,
    order: Vec<ComponentKey>,
    dispatch: DispatchLists,
}

impl Registry {
    /// Empty registry
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            slots: SlotMap::with_key(),
            order: Vec::new(),
            dispatch: DispatchLists::default(),
        }
    }

    /// Local or global
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Take ownership of `component` and file it into its dispatch lists
    pub fn register(&mut self, owner: Owner, mut component: Box<dyn Component>) -> ComponentKey {
        let capabilities = query_capabilities(component.as_mut());
        log::debug!(
            "Registering {} component {} with {:?}",
            if self.scope == Scope::Local { "local" } else { "global" },
            component.name(),
            capabilities
        );

        let key = self.slots.insert(ComponentSlot {
            owner,
            capabilities,
            component: Some(component),
        });
        self.order.push(key);
        for (flag, list) in self.dispatch.lists_mut() {
            if capabilities.contains(flag) {
                list.push(key);
            }
        }
        key
    }

    /// Remove a component, running its cleanup
    ///
    /// Returns whether the key was registered here.
    pub fn remove(&mut self, key: ComponentKey) -> bool {
        let Some(slot) = self.slots.remove(key) else {
            return false;
        };
        self.order.retain(|&k| k != key);
        for (_, list) in self.dispatch.lists_mut() {
            list.retain(|&k| k != key);
        }
        if let Some(mut component) = slot.component {
            log::debug!("Removing component {}", component.name());
            component.cleanup();
        }
        true
    }

    /// Component by key
    pub fn get(&self, key: ComponentKey) -> Option<&dyn Component> {
        self.slots.get(key)?.component.as_deref()
    }

    /// Mutable component by key
    pub fn get_mut(&mut self, key: ComponentKey) -> Option<&mut (dyn Component + 'static)> {
        self.slots.get_mut(key)?.component.as_deref_mut()
    }

    /// Component by key, downcast to `T`
    pub fn get_as<T: Component>(&self, key: ComponentKey) -> Option<&T> {
        self.get(key).and_then(|component| downcast_ref::<T>(component))
    }

    /// Mutable component by key, downcast to `T`
    pub fn get_as_mut<T: Component>(&mut self, key: ComponentKey) -> Option<&mut T> {
        self.get_mut(key).and_then(|component| downcast_mut::<T>(component))
    }

    /// First registered component of type `T`
    pub fn first<T: Component>(&self) -> Option<&T> {
        self.order.iter().find_map(|&key| self.get_as::<T>(key))
    }

    /// Mutable first registered component of type `T`
    pub fn first_mut<T: Component>(&mut self) -> Option<&mut T> {
        let key = self.first_key::<T>()?;
        self.get_as_mut::<T>(key)
    }

    /// Key of the first registered component of type `T`
    pub fn first_key<T: Component>(&self) -> Option<ComponentKey> {
        self.order
            .iter()
            .copied()
            .find(|&key| self.get_as::<T>(key).is_some())
    }

    /// Keys of every component of type `T` in registration order
    pub fn find_all<T: Component>(&self) -> Vec<ComponentKey> {
        self.order
            .iter()
            .copied()
            .filter(|&key| self.get_as::<T>(key).is_some())
            .collect()
    }

    /// Owner of a registered component
    pub fn owner(&self, key: ComponentKey) -> Option<Owner> {
        self.slots.get(key).map(|slot| slot.owner)
    }

    /// Capabilities queried at registration
    pub fn capabilities(&self, key: ComponentKey) -> Option<Capabilities> {
        self.slots.get(key).map(|slot| slot.capabilities)
    }

    /// Keys in registration order
    pub fn keys(&self) -> &[ComponentKey] {
        &self.order
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of components dispatched for `capability`
    pub fn dispatch_len(&self, capability: Capabilities) -> usize {
        self.dispatch.list(capability).len()
    }

    /// Remove every component, newest first
    pub fn cleanup(&mut self) {
        while let Some(&key) = self.order.last() {
            self.remove(key);
        }
    }

    /// Take a component out of its slot for exclusive use
    pub(crate) fn detach(&mut self, key: ComponentKey) -> Option<(Owner, Box<dyn Component>)> {
        let slot = self.slots.get_mut(key)?;
        let component = slot.component.take()?;
        Some((slot.owner, component))
    }

    /// Put a detached component back
    pub(crate) fn reattach(&mut self, key: ComponentKey, component: Box<dyn Component>) {
        if let Some(slot) = self.slots.get_mut(key) {
            slot.component = Some(component);
        }
    }

    pub(crate) fn invoke_update(&mut self, info: &FrameUpdateInfo, env: &DispatchEnv<'_>) -> SceneResult<()> {
        self.dispatch(Capabilities::UPDATE, env, |component, ctx| match component.as_update() {
            Some(hook) => hook.on_update(info, ctx),
            None => Ok(()),
        })
    }

    pub(crate) fn invoke_before_draw(&mut self, info: &FrameRenderInfo, env: &DispatchEnv<'_>) -> SceneResult<()> {
        self.dispatch(Capabilities::BEFORE_DRAW, env, |component, ctx| {
            match component.as_before_draw() {
                Some(hook) => hook.on_before_draw(info, ctx),
                None => Ok(()),
            }
        })
    }

    pub(crate) fn invoke_draw(&mut self, info: &mut SceneDrawInfo<'_>, env: &DispatchEnv<'_>) -> SceneResult<()> {
        self.dispatch(Capabilities::DRAW, env, |component, ctx| match component.as_draw() {
            Some(hook) => hook.on_draw(info, ctx),
            None => Ok(()),
        })
    }

    pub(crate) fn invoke_on_event(&mut self, event: &Event, env: &DispatchEnv<'_>) {
        let result = self.dispatch(Capabilities::EVENT, env, |component, ctx| {
            if let Some(hook) = component.as_event() {
                hook.on_event(event, ctx);
            }
            Ok(())
        });
        debug_assert!(result.is_ok());
    }

    fn dispatch<F>(&mut self, capability: Capabilities, env: &DispatchEnv<'_>, mut invoke: F) -> SceneResult<()>
    where
        F: FnMut(&mut dyn Component, &HookContext<'_>) -> SceneResult<()>,
    {
        for index in 0..self.dispatch.list(capability).len() {
            let key = self.dispatch.list(capability)[index];
            let Some((owner, mut component)) = self.detach(key) else {
                continue;
            };

            let result = {
                let (locals, globals) = match self.scope {
                    Scope::Local => (&*self, env.peer),
                    Scope::Global => (env.peer, &*self),
                };
                let ctx = HookContext {
                    owner,
                    tree: env.tree,
                    locals,
                    globals,
                    render: env.render,
                    deferred: env.deferred,
                };
                invoke(component.as_mut(), &ctx)
            };

            self.reattach(key, component);
            result?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("scope", &self.scope)
            .field("components", &self.slots.len())
            .finish()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::OnUpdate;
    use ash::vk;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Counter {
        ticks: u32,
    }

    impl OnUpdate for Counter {
        fn on_update(&mut self, _info: &FrameUpdateInfo, ctx: &HookContext<'_>) -> SceneResult<()> {
            assert!(ctx.locals().get_as::<Counter>(ctx.locals().keys()[0]).is_none());
            self.ticks += 1;
            Ok(())
        }
    }

    impl Component for Counter {
        fn as_update(&mut self) -> Option<&mut dyn OnUpdate> {
            Some(self)
        }
    }

    struct CleanupRecorder(Rc<RefCell<Vec<&'static str>>>, &'static str);

    impl Component for CleanupRecorder {
        fn cleanup(&mut self) {
            self.0.borrow_mut().push(self.1);
        }
    }

    fn env_parts() -> (NodeTree, Registry, Arc<RenderContext>, DeferredQueue) {
        (
            NodeTree::new(),
            Registry::new(Scope::Global),
            Arc::new(RenderContext::headless(vk::Extent2D { width: 1, height: 1 })),
            DeferredQueue::default(),
        )
    }

    #[test]
    fn test_register_files_dispatch_lists() {
        let mut registry = Registry::new(Scope::Local);
        let counter = registry.register(Owner::Scene, Box::new(Counter { ticks: 0 }));
        registry.register(Owner::Scene, Box::new(CleanupRecorder(Rc::default(), "inert")));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.dispatch_len(Capabilities::UPDATE), 1);
        assert_eq!(registry.dispatch_len(Capabilities::DRAW), 0);
        assert_eq!(registry.capabilities(counter), Some(Capabilities::UPDATE));
        assert_eq!(registry.first_key::<Counter>(), Some(counter));
    }

    #[test]
    fn test_update_detaches_running_component() {
        let (tree, peer, render, deferred) = env_parts();
        let mut registry = Registry::new(Scope::Local);
        let key = registry.register(Owner::Scene, Box::new(Counter { ticks: 0 }));
        let env = DispatchEnv {
            tree: &tree,
            peer: &peer,
            render: &render,
            deferred: &deferred,
        };

        registry.invoke_update(&FrameUpdateInfo::default(), &env).unwrap();
        registry.invoke_update(&FrameUpdateInfo::default(), &env).unwrap();
        assert_eq!(registry.get_as::<Counter>(key).unwrap().ticks, 2);
    }

    #[test]
    fn test_cleanup_runs_newest_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = Registry::new(Scope::Global);
        registry.register(Owner::Scene, Box::new(CleanupRecorder(log.clone(), "first")));
        registry.register(Owner::Scene, Box::new(CleanupRecorder(log.clone(), "second")));

        registry.cleanup();
        registry.cleanup();
        assert!(registry.is_empty());
        assert_eq!(*log.borrow(), vec!["second", "first"]);
    }

    #[test]
    fn test_remove_purges_dispatch() {
        let mut registry = Registry::new(Scope::Local);
        let key = registry.register(Owner::Scene, Box::new(Counter { ticks: 0 }));
        assert!(registry.remove(key));
        assert!(!registry.remove(key));
        assert_eq!(registry.dispatch_len(Capabilities::UPDATE), 0);
    }
}
