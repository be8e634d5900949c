//! Uniform buffer holding a single POD block
//!
//! The CPU copy is edited through [`ManagedUbo::value_mut`] and pushed with
//! [`ManagedUbo::update`]. The buffer lives in host visible memory since it
//! is rewritten every frame.

use std::sync::Arc;

use ash::vk;
use bytemuck::Pod;

use super::allocator::BufferDesc;
use super::buffer::ManagedBuffer;
use super::context::RenderContext;
use crate::error::SceneResult;

/// One uniform block of type `T` with its GPU buffer
pub struct ManagedUbo<T: Pod> {
    value: T,
    buffer: ManagedBuffer,
}

impl<T: Pod> ManagedUbo<T> {
    /// Zeroed block without an allocation
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            value: T::zeroed(),
            buffer: ManagedBuffer::new(name),
        }
    }

    /// Allocate the uniform buffer and upload the current value
    pub fn create(&mut self, context: &Arc<RenderContext>) -> SceneResult<()> {
        let size = std::mem::size_of::<T>() as vk::DeviceSize;
        self.buffer
            .create(context, BufferDesc::host_visible(size, vk::BufferUsageFlags::UNIFORM_BUFFER))?;
        self.update()
    }

    /// CPU side block
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Mutable CPU side block
    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Write the CPU block into the buffer
    pub fn update(&mut self) -> SceneResult<()> {
        self.buffer.map_and_write(bytemuck::bytes_of(&self.value))
    }

    /// Underlying resource handle
    pub fn buffer(&self) -> &ManagedBuffer {
        &self.buffer
    }

    /// Descriptor covering the block
    pub fn descriptor_info(&self) -> vk::DescriptorBufferInfo {
        self.buffer.descriptor_info()
    }

    /// Release the GPU buffer if allocated
    pub fn destroy(&mut self) {
        if self.buffer.exists() {
            self.buffer.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::vulkan::HostAllocator;

    #[test]
    fn test_update_uploads_block() {
        let host = Arc::new(HostAllocator::new());
        let context = Arc::new(RenderContext::new(host.clone(), vk::Extent2D { width: 1, height: 1 }));

        let mut ubo: ManagedUbo<[u32; 4]> = ManagedUbo::new("block");
        ubo.create(&context).unwrap();
        assert_eq!(ubo.buffer().size(), 16);

        ubo.value_mut()[1] = 9;
        ubo.update().unwrap();

        let bytes = host.buffer_contents(ubo.buffer().buffer()).unwrap();
        assert_eq!(&bytes[4..8], &9u32.to_ne_bytes());

        ubo.destroy();
        ubo.destroy();
        assert_eq!(host.live_buffers(), 0);
    }
}
