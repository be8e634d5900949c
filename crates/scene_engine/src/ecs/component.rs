//! Component trait and lifecycle capabilities
//!
//! A component is attached either to a node or to the scene itself. It opts
//! into lifecycle hooks by implementing the matching capability trait and
//! returning itself from the matching `as_*` accessor:
//!
//! ```ignore
//! impl OnUpdate for Spinner {
//!     fn on_update(&mut self, info: &FrameUpdateInfo, _ctx: &HookContext<'_>) -> SceneResult<()> {
//!         self.angle += info.delta_seconds;
//!         Ok(())
//!     }
//! }
//!
//! impl Component for Spinner {
//!     fn as_update(&mut self) -> Option<&mut dyn OnUpdate> {
//!         Some(self)
//!     }
//! }
//! ```
//!
//! The registry queries these accessors once, when the component is attached,
//! and files the component into one dispatch list per capability.

use std::any::Any;

use bitflags::bitflags;

use super::context::{FrameRenderInfo, FrameUpdateInfo, HookContext, SceneDrawInfo};
use crate::error::SceneResult;
use crate::events::Event;

bitflags! {
    /// Lifecycle hooks a component takes part in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Per tick simulation update
        const UPDATE = 1 << 0;
        /// Per frame preparation before any draw
        const BEFORE_DRAW = 1 << 1;
        /// Command recording
        const DRAW = 1 << 2;
        /// Input and window events
        const EVENT = 1 << 3;
    }
}

/// Runs once per simulated tick
pub trait OnUpdate {
    /// Advance the component's state
    fn on_update(&mut self, info: &FrameUpdateInfo, ctx: &HookContext<'_>) -> SceneResult<()>;
}

/// Runs once per frame before any draw hook
///
/// Values finalized here (camera matrices, per-frame uniforms) are what draw
/// hooks of the same frame observe.
pub trait OnBeforeDraw {
    /// Finalize per-frame state
    fn on_before_draw(&mut self, info: &FrameRenderInfo, ctx: &HookContext<'_>) -> SceneResult<()>;
}

/// Records draw commands
pub trait OnDraw {
    /// Record this component's commands
    fn on_draw(&mut self, info: &mut SceneDrawInfo<'_>, ctx: &HookContext<'_>) -> SceneResult<()>;
}

/// Consumes input and window events
pub trait OnEvent {
    /// React to an event
    fn on_event(&mut self, event: &Event, ctx: &HookContext<'_>);
}

/// Upcast helper so components can be downcast to their concrete type
pub trait AsAny: Any {
    /// `&self` as `&dyn Any`
    fn as_any(&self) -> &dyn Any;
    /// `&mut self` as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A unit of behavior attached to a node or to the scene
pub trait Component: AsAny {
    /// Name used in logs
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Update capability
    fn as_update(&mut self) -> Option<&mut dyn OnUpdate> {
        None
    }

    /// Before draw capability
    fn as_before_draw(&mut self) -> Option<&mut dyn OnBeforeDraw> {
        None
    }

    /// Draw capability
    fn as_draw(&mut self) -> Option<&mut dyn OnDraw> {
        None
    }

    /// Event capability
    fn as_event(&mut self) -> Option<&mut dyn OnEvent> {
        None
    }

    /// Release GPU resources; called once when the component is removed
    fn cleanup(&mut self) {}
}

/// Capabilities a component opted into
pub fn query_capabilities(component: &mut dyn Component) -> Capabilities {
    let mut capabilities = Capabilities::empty();
    capabilities.set(Capabilities::UPDATE, component.as_update().is_some());
    capabilities.set(Capabilities::BEFORE_DRAW, component.as_before_draw().is_some());
    capabilities.set(Capabilities::DRAW, component.as_draw().is_some());
    capabilities.set(Capabilities::EVENT, component.as_event().is_some());
    capabilities
}

/// Downcast a component to its concrete type
pub fn downcast_ref<T: Component>(component: &dyn Component) -> Option<&T> {
    component.as_any().downcast_ref::<T>()
}

/// Mutably downcast a component to its concrete type
pub fn downcast_mut<T: Component>(component: &mut dyn Component) -> Option<&mut T> {
    component.as_any_mut().downcast_mut::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inert;
    impl Component for Inert {}

    struct Ticking(u32);
    impl OnUpdate for Ticking {
        fn on_update(&mut self, _info: &FrameUpdateInfo, _ctx: &HookContext<'_>) -> SceneResult<()> {
            self.0 += 1;
            Ok(())
        }
    }
    impl OnEvent for Ticking {
        fn on_event(&mut self, _event: &Event, _ctx: &HookContext<'_>) {}
    }
    impl Component for Ticking {
        fn as_update(&mut self) -> Option<&mut dyn OnUpdate> {
            Some(self)
        }
        fn as_event(&mut self) -> Option<&mut dyn OnEvent> {
            Some(self)
        }
    }

    #[test]
    fn test_query_capabilities() {
        assert_eq!(query_capabilities(&mut Inert), Capabilities::empty());
        assert_eq!(
            query_capabilities(&mut Ticking(0)),
            Capabilities::UPDATE | Capabilities::EVENT
        );
    }

    #[test]
    fn test_downcast() {
        let mut boxed: Box<dyn Component> = Box::new(Ticking(7));
        assert!(downcast_ref::<Inert>(boxed.as_ref()).is_none());
        assert_eq!(downcast_ref::<Ticking>(boxed.as_ref()).map(|t| t.0), Some(7));

        downcast_mut::<Ticking>(boxed.as_mut()).unwrap().0 = 9;
        assert_eq!(downcast_ref::<Ticking>(boxed.as_ref()).unwrap().0, 9);
        assert!(boxed.name().ends_with("Ticking"));
    }
}
