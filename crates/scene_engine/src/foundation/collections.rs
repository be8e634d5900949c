//! Arena handle types
//!
//! Every cross reference inside a scene is one of these keys. Keys are
//! generational, so a handle to a removed node or mesh simply stops resolving
//! instead of dangling.

pub use slotmap::{SecondaryMap, SlotMap};

slotmap::new_key_type! {
    /// Handle of a node in a scene's node arena
    pub struct NodeKey;

    /// Handle of a component inside a [`Registry`](crate::ecs::Registry)
    pub struct ComponentKey;

    /// Handle of a mesh owned by the geometry store
    pub struct MeshKey;

    /// Handle of a vertex/index buffer pair owned by the geometry store
    pub struct BufferSetKey;
}
