//! Command recording seam
//!
//! Draw hooks record through [`CommandRecorder`] instead of calling into a
//! device directly. [`VulkanCommandRecorder`] records into a real command
//! buffer; [`CommandLog`] keeps the stream in memory.

use ash::vk;

/// The commands the scene records while drawing
pub trait CommandRecorder {
    /// `vkCmdPushConstants` against the bound pipeline layout
    fn push_constants(&mut self, stages: vk::ShaderStageFlags, offset: u32, data: &[u8]);

    /// `vkCmdBindVertexBuffers`
    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[vk::Buffer], offsets: &[vk::DeviceSize]);

    /// `vkCmdBindIndexBuffer`
    fn bind_index_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType);

    /// `vkCmdDrawIndexed`
    fn draw_indexed(&mut self, index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32, first_instance: u32);
}

/// Records into a Vulkan command buffer in the recording state
pub struct VulkanCommandRecorder<'a> {
    device: &'a ash::Device,
    command_buffer: vk::CommandBuffer,
    pipeline_layout: vk::PipelineLayout,
}

impl<'a> VulkanCommandRecorder<'a> {
    /// Wrap a command buffer; push constants go through `pipeline_layout`
    pub fn new(device: &'a ash::Device, command_buffer: vk::CommandBuffer, pipeline_layout: vk::PipelineLayout) -> Self {
        Self {
            device,
            command_buffer,
            pipeline_layout,
        }
    }

    /// Command buffer being recorded
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }
}

// SAFETY (all methods): the command buffer is in the recording state for the
// lifetime of the recorder and every handle passed in is owned by live scene
// resources.
impl CommandRecorder for VulkanCommandRecorder<'_> {
    fn push_constants(&mut self, stages: vk::ShaderStageFlags, offset: u32, data: &[u8]) {
        unsafe {
            self.device
                .cmd_push_constants(self.command_buffer, self.pipeline_layout, stages, offset, data);
        }
    }

    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[vk::Buffer], offsets: &[vk::DeviceSize]) {
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(self.command_buffer, first_binding, buffers, offsets);
        }
    }

    fn bind_index_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) {
        unsafe {
            self.device
                .cmd_bind_index_buffer(self.command_buffer, buffer, offset, index_type);
        }
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32, first_instance: u32) {
        unsafe {
            self.device.cmd_draw_indexed(
                self.command_buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }
}

/// One recorded command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCommand {
    /// Push constant upload
    PushConstants {
        /// Stages the range is visible to
        stages: vk::ShaderStageFlags,
        /// Byte offset in the push constant block
        offset: u32,
        /// Raw bytes
        data: Vec<u8>,
    },
    /// Vertex buffer binding
    BindVertexBuffers {
        /// First binding slot
        first_binding: u32,
        /// Bound buffers
        buffers: Vec<vk::Buffer>,
    },
    /// Index buffer binding
    BindIndexBuffer {
        /// Bound buffer
        buffer: vk::Buffer,
        /// Index width
        index_type: vk::IndexType,
    },
    /// Indexed draw
    DrawIndexed {
        /// Indices per instance
        index_count: u32,
        /// Instance count
        instance_count: u32,
        /// First index
        first_index: u32,
        /// Added to each index
        vertex_offset: i32,
        /// First instance id
        first_instance: u32,
    },
}

/// In-memory command stream
#[derive(Debug, Default, Clone)]
pub struct CommandLog {
    commands: Vec<RecordedCommand>,
}

impl CommandLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    /// Forget recorded commands
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Number of indexed draws
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, RecordedCommand::DrawIndexed { .. }))
            .count()
    }

    /// Number of vertex buffer bindings
    pub fn vertex_bind_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, RecordedCommand::BindVertexBuffers { .. }))
            .count()
    }

    /// Every push constant payload read as a native endian `u32`
    pub fn pushed_u32s(&self) -> Vec<u32> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                RecordedCommand::PushConstants { data, .. } if data.len() == 4 => {
                    Some(u32::from_ne_bytes([data[0], data[1], data[2], data[3]]))
                }
                _ => None,
            })
            .collect()
    }
}

impl CommandRecorder for CommandLog {
    fn push_constants(&mut self, stages: vk::ShaderStageFlags, offset: u32, data: &[u8]) {
        self.commands.push(RecordedCommand::PushConstants {
            stages,
            offset,
            data: data.to_vec(),
        });
    }

    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[vk::Buffer], _offsets: &[vk::DeviceSize]) {
        self.commands.push(RecordedCommand::BindVertexBuffers {
            first_binding,
            buffers: buffers.to_vec(),
        });
    }

    fn bind_index_buffer(&mut self, buffer: vk::Buffer, _offset: vk::DeviceSize, index_type: vk::IndexType) {
        self.commands.push(RecordedCommand::BindIndexBuffer { buffer, index_type });
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32, first_instance: u32) {
        self.commands.push(RecordedCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }
}
