//! Batched instanced drawing of every mesh instance in the scene
//!
//! [`DrawDirector::init_or_update`] groups mesh-instance nodes by mesh into
//! [`DrawOp`]s. Each op owns a contiguous range of the per-frame transform
//! buffer starting at its `transform_offset`; the ranges of all ops partition
//! `0..total_instances` in op order.
//!
//! Every draw rewrites the whole transform range of the current frame from
//! the nodes' world transforms, uploads it, then records one instanced draw
//! per op with the op's offset pushed as a vertex stage push constant.
//!
//! Shaders index the transform buffer with `offset + gl_InstanceIndex`.

use std::collections::HashMap;
use std::sync::Arc;

use ash::vk;

use super::GeometryStore;
use crate::backend::vulkan::{
    DescriptorInfo, FrameRotator, ManagedVectorBuffer, MemoryLocation, RenderContext, INFLIGHT_FRAME_COUNT,
};
use crate::ecs::components::MeshInstance;
use crate::ecs::{Component, HookContext, NodeTree, OnDraw, Registry, SceneDrawInfo};
use crate::error::SceneResult;
use crate::foundation::collections::{MeshKey, NodeKey};
use crate::foundation::math::{to_columns, Mat4};

/// Column-major model matrix as stored in the transform buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceTransform {
    /// Node to world matrix
    pub model: [[f32; 4]; 4],
}

unsafe impl bytemuck::Pod for InstanceTransform {}
unsafe impl bytemuck::Zeroable for InstanceTransform {}

impl From<&Mat4> for InstanceTransform {
    fn from(matrix: &Mat4) -> Self {
        Self {
            model: to_columns(matrix),
        }
    }
}

/// One instanced draw of a single mesh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawOp {
    /// Mesh drawn by this op
    pub mesh: MeshKey,
    /// Nodes drawn, in encounter order
    pub instances: Vec<NodeKey>,
    /// First slot of this op in the transform buffer
    pub transform_offset: u32,
}

impl DrawOp {
    /// Number of instances drawn
    pub fn instance_count(&self) -> u32 {
        self.instances.len() as u32
    }
}

type TransformBuffer = ManagedVectorBuffer<InstanceTransform>;

/// Global component that batches and draws all mesh instances
pub struct DrawDirector {
    ops: Vec<DrawOp>,
    transforms: FrameRotator<TransformBuffer>,
    total_instances: u32,
}

impl Default for DrawDirector {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawDirector {
    /// Director without a plan; buffers are created by the first `init_or_update`
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            transforms: FrameRotator::new(),
            total_instances: 0,
        }
    }

    /// Rebuild the draw plan from the nodes carrying a [`MeshInstance`]
    ///
    /// Meshes keep the order in which they are first encountered walking the
    /// tree in creation order. Transform buffers grow to fit the new total and
    /// are never shrunk. On allocation failure every transform buffer is
    /// released before the error is returned.
    pub fn init_or_update(&mut self, context: &Arc<RenderContext>, tree: &NodeTree, locals: &Registry) -> SceneResult<()> {
        let mut ops: Vec<DrawOp> = Vec::new();
        let mut by_mesh: HashMap<MeshKey, usize> = HashMap::new();

        for (node_key, node) in tree.iter() {
            let Some(instance) = node
                .components()
                .iter()
                .find_map(|&key| locals.get_as::<MeshInstance>(key))
            else {
                continue;
            };
            let op_index = *by_mesh.entry(instance.mesh()).or_insert_with(|| {
                ops.push(DrawOp {
                    mesh: instance.mesh(),
                    instances: Vec::new(),
                    transform_offset: 0,
                });
                ops.len() - 1
            });
            ops[op_index].instances.push(node_key);
        }

        let mut running = 0u32;
        for op in &mut ops {
            op.transform_offset = running;
            running += op.instance_count();
        }

        log::debug!("Draw plan rebuilt: {} ops, {} instances", ops.len(), running);
        self.ops = ops;
        self.total_instances = running;

        if !self.transforms.is_initialized() {
            self.transforms.init(|slot| {
                ManagedVectorBuffer::new(
                    format!("Transform Buffer #{slot}"),
                    vk::BufferUsageFlags::STORAGE_BUFFER,
                    MemoryLocation::HostVisible,
                )
            });
        }

        let total = running as usize;
        let result = self.transforms.iter_mut().try_for_each(|buffer| {
            buffer.data_mut().resize(total, InstanceTransform::from(&Mat4::identity()));
            buffer.init_or_update(context).map(|_| ())
        });
        if result.is_err() {
            self.release_buffers();
        }
        result
    }

    /// Current plan, in draw order
    pub fn draw_ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Sum of instance counts over all ops
    pub fn total_instances(&self) -> u32 {
        self.total_instances
    }

    /// Transform buffer used by `frame_number`
    ///
    /// # Panics
    /// Before the first `init_or_update`.
    pub fn transform_buffer(&self, frame_number: u64) -> &ManagedVectorBuffer<InstanceTransform> {
        &self.transforms[frame_number]
    }

    /// Storage buffer binding, set `i` holds the transforms written in slot `i`
    pub fn descriptor_infos_current(&self, stages: vk::ShaderStageFlags) -> DescriptorInfo {
        let sets = (0..INFLIGHT_FRAME_COUNT)
            .map(|slot| vec![self.slot_descriptor(slot)])
            .collect();
        DescriptorInfo::buffers(vk::DescriptorType::STORAGE_BUFFER, stages, sets)
    }

    /// Storage buffer binding, set `i` holds the transforms of the frame before slot `i`
    pub fn descriptor_infos_previous(&self, stages: vk::ShaderStageFlags) -> DescriptorInfo {
        let sets = (0..INFLIGHT_FRAME_COUNT)
            .map(|slot| {
                let previous = FrameRotator::<(), INFLIGHT_FRAME_COUNT>::previous_slot_index(slot as u64);
                vec![self.slot_descriptor(previous)]
            })
            .collect();
        DescriptorInfo::buffers(vk::DescriptorType::STORAGE_BUFFER, stages, sets)
    }

    fn slot_descriptor(&self, slot: usize) -> vk::DescriptorBufferInfo {
        if self.transforms.is_initialized() {
            self.transforms[slot as u64].descriptor_info()
        } else {
            vk::DescriptorBufferInfo {
                buffer: vk::Buffer::null(),
                offset: 0,
                range: vk::WHOLE_SIZE,
            }
        }
    }

    fn release_buffers(&mut self) {
        if self.transforms.is_initialized() {
            for buffer in self.transforms.iter_mut() {
                buffer.destroy();
            }
        }
    }

    fn write_transforms(&mut self, frame_number: u64, tree: &NodeTree) {
        let buffer = self.transforms.get_mut(frame_number);
        let data = buffer.data_mut();
        for op in &self.ops {
            for (index, &node) in op.instances.iter().enumerate() {
                let matrix = tree.world_matrix(node).unwrap_or_else(|| {
                    log::warn!("Mesh instance node {node:?} no longer exists, drawing it at the origin");
                    Mat4::identity()
                });
                data[op.transform_offset as usize + index] = InstanceTransform::from(&matrix);
            }
        }
    }
}

impl OnDraw for DrawDirector {
    fn on_draw(&mut self, info: &mut SceneDrawInfo<'_>, ctx: &HookContext<'_>) -> SceneResult<()> {
        if self.ops.is_empty() {
            return Ok(());
        }
        let frame_number = info.frame().frame_number;

        self.write_transforms(frame_number, ctx.tree());
        if let Err(err) = self.transforms.get_mut(frame_number).init_or_update(ctx.render_context()) {
            self.release_buffers();
            return Err(err);
        }

        let Some(geometry) = ctx.global::<GeometryStore>() else {
            log::warn!("No GeometryStore in scene, skipping {} draw ops", self.ops.len());
            return Ok(());
        };
        for op in &self.ops {
            info.push_transform_offset(op.transform_offset);
            if !geometry.cmd_draw_mesh(op.mesh, info, op.instance_count()) {
                log::warn!("Draw op references missing mesh {:?}, skipped", op.mesh);
            }
        }
        Ok(())
    }
}

impl Component for DrawDirector {
    fn as_draw(&mut self) -> Option<&mut dyn OnDraw> {
        Some(self)
    }

    fn cleanup(&mut self) {
        self.release_buffers();
        self.transforms.reset();
        self.ops.clear();
        self.total_instances = 0;
    }
}
