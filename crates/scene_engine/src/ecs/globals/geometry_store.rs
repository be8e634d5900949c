//! Vertex and index storage shared by all meshes of a scene

use std::sync::Arc;

use ash::vk;

use crate::assets::Vertex;
use crate::backend::vulkan::{ManagedVectorBuffer, MemoryLocation, RenderContext};
use crate::ecs::{Component, SceneDrawInfo};
use crate::error::SceneResult;
use crate::foundation::collections::{BufferSetKey, MeshKey, SlotMap};

/// Index range of a mesh drawn with one material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Primitive {
    /// First index in the buffer set's index buffer
    pub first_index: u32,
    /// Number of indices
    pub index_count: u32,
    /// Number of vertices referenced
    pub vertex_count: u32,
    /// Index into the material buffer, -1 for the default material
    pub material_index: i32,
}

impl Primitive {
    fn cmd_draw(&self, draw: &mut SceneDrawInfo<'_>, instance_count: u32) {
        if self.index_count == 0 {
            return;
        }
        draw.recorder()
            .draw_indexed(self.index_count, instance_count, self.first_index, 0, 0);
    }
}

/// Vertex buffer plus index buffer, bound together
pub struct GeometryBufferSet {
    vertices: ManagedVectorBuffer<Vertex>,
    indices: ManagedVectorBuffer<u32>,
}

impl GeometryBufferSet {
    fn new(name: &str) -> Self {
        Self {
            vertices: ManagedVectorBuffer::new(
                format!("{name} vertices"),
                vk::BufferUsageFlags::VERTEX_BUFFER,
                MemoryLocation::DeviceLocal,
            ),
            indices: ManagedVectorBuffer::new(
                format!("{name} indices"),
                vk::BufferUsageFlags::INDEX_BUFFER,
                MemoryLocation::DeviceLocal,
            ),
        }
    }

    fn init(&mut self, context: &Arc<RenderContext>, vertices: Vec<Vertex>, indices: Vec<u32>) -> SceneResult<()> {
        *self.vertices.data_mut() = vertices;
        *self.indices.data_mut() = indices;
        if !self.vertices.is_empty() {
            self.vertices.init_or_update(context)?;
        }
        if !self.indices.is_empty() {
            self.indices.init_or_update(context)?;
        }
        Ok(())
    }

    /// Bind both buffers; returns `false` when there are no vertices
    pub fn cmd_bind(&self, draw: &mut SceneDrawInfo<'_>) -> bool {
        if !self.vertices.buffer().exists() {
            return false;
        }
        let recorder = draw.recorder();
        recorder.bind_vertex_buffers(0, &[self.vertices.buffer().buffer()], &[0]);
        if self.indices.buffer().exists() {
            recorder.bind_index_buffer(self.indices.buffer().buffer(), 0, vk::IndexType::UINT32);
        }
        true
    }

    /// CPU copy of the vertices
    pub fn vertices(&self) -> &[Vertex] {
        self.vertices.data()
    }

    /// CPU copy of the indices
    pub fn indices(&self) -> &[u32] {
        self.indices.data()
    }

    /// Native vertex buffer
    pub fn vertex_buffer(&self) -> vk::Buffer {
        self.vertices.buffer().buffer()
    }

    /// Native index buffer
    pub fn index_buffer(&self) -> vk::Buffer {
        self.indices.buffer().buffer()
    }

    fn destroy(&mut self) {
        self.vertices.destroy();
        self.indices.destroy();
    }
}

/// Drawable geometry: primitives inside one buffer set
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Display name
    pub name: String,
    /// Buffer set holding the primitives' data
    pub buffer_set: BufferSetKey,
    /// Index ranges, drawn in order
    pub primitives: Vec<Primitive>,
}

impl Mesh {
    /// Record `instance_count` instances of every primitive
    ///
    /// The buffer set is only bound when it differs from the one recorded in
    /// `draw`.
    pub fn cmd_draw(&self, buffers: &GeometryBufferSet, draw: &mut SceneDrawInfo<'_>, instance_count: u32) {
        if self.primitives.is_empty() {
            return;
        }
        if draw.bound_geometry() != Some(self.buffer_set) {
            if !buffers.cmd_bind(draw) {
                return;
            }
            draw.set_bound_geometry(Some(self.buffer_set));
        }
        for primitive in &self.primitives {
            primitive.cmd_draw(draw, instance_count);
        }
    }
}

/// Global component owning all geometry buffers and meshes
#[derive(Default)]
pub struct GeometryStore {
    buffer_sets: SlotMap<BufferSetKey, GeometryBufferSet>,
    meshes: SlotMap<MeshKey, Mesh>,
}

impl GeometryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload vertices and indices into a new buffer set
    ///
    /// On allocation failure nothing is kept.
    pub fn create_buffer_set(
        &mut self,
        context: &Arc<RenderContext>,
        name: &str,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
    ) -> SceneResult<BufferSetKey> {
        let mut set = GeometryBufferSet::new(name);
        if let Err(err) = set.init(context, vertices, indices) {
            set.destroy();
            return Err(err);
        }
        Ok(self.buffer_sets.insert(set))
    }

    /// Register a mesh over an existing buffer set
    pub fn create_mesh(&mut self, name: impl Into<String>, buffer_set: BufferSetKey, primitives: Vec<Primitive>) -> MeshKey {
        self.meshes.insert(Mesh {
            name: name.into(),
            buffer_set,
            primitives,
        })
    }

    /// Mesh by key
    pub fn mesh(&self, key: MeshKey) -> Option<&Mesh> {
        self.meshes.get(key)
    }

    /// Buffer set by key
    pub fn buffer_set(&self, key: BufferSetKey) -> Option<&GeometryBufferSet> {
        self.buffer_sets.get(key)
    }

    /// All meshes
    pub fn meshes(&self) -> impl Iterator<Item = (MeshKey, &Mesh)> {
        self.meshes.iter()
    }

    /// Number of meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Number of buffer sets
    pub fn buffer_set_count(&self) -> usize {
        self.buffer_sets.len()
    }

    /// Record an instanced draw of `mesh`; `false` if the mesh or its buffers are gone
    pub fn cmd_draw_mesh(&self, mesh: MeshKey, draw: &mut SceneDrawInfo<'_>, instance_count: u32) -> bool {
        let Some(mesh) = self.meshes.get(mesh) else {
            return false;
        };
        let Some(buffers) = self.buffer_sets.get(mesh.buffer_set) else {
            return false;
        };
        mesh.cmd_draw(buffers, draw, instance_count);
        true
    }

    /// Drop every mesh and free every buffer set
    pub fn clear(&mut self) {
        self.meshes.clear();
        for (_, set) in self.buffer_sets.iter_mut() {
            set.destroy();
        }
        self.buffer_sets.clear();
    }
}

impl Component for GeometryStore {
    fn cleanup(&mut self) {
        self.clear();
    }
}
