//! Mesh reference carried by drawable nodes

use crate::ecs::Component;
use crate::foundation::collections::MeshKey;

/// Marks its node as one instance of `mesh`
///
/// The [`DrawDirector`](crate::ecs::globals::DrawDirector) batches all
/// instances of the same mesh into one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshInstance {
    mesh: MeshKey,
}

impl MeshInstance {
    /// Instance of `mesh`
    pub fn new(mesh: MeshKey) -> Self {
        Self { mesh }
    }

    /// Mesh in the scene's geometry store
    ///
    /// Retarget through [`Scene::set_instance_mesh`](crate::scene::Scene::set_instance_mesh)
    /// so the draw plan is rebuilt.
    pub fn mesh(&self) -> MeshKey {
        self.mesh
    }

    pub(crate) fn set_mesh(&mut self, mesh: MeshKey) {
        self.mesh = mesh;
    }
}

impl Component for MeshInstance {}
