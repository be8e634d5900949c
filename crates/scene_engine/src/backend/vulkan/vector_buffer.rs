//! CPU vector mirrored into a grow-only GPU buffer

use std::sync::Arc;

use ash::vk;
use bytemuck::Pod;

use super::allocator::{BufferDesc, MemoryLocation};
use super::buffer::ManagedBuffer;
use super::context::RenderContext;
use crate::error::SceneResult;

/// Growable array of POD elements with a GPU copy
///
/// The GPU buffer only ever grows: [`init_or_update`](Self::init_or_update)
/// reallocates when the vector no longer fits and otherwise reuses the
/// existing allocation, so descriptors written against it stay valid while
/// the element count shrinks or stays put.
pub struct ManagedVectorBuffer<T: Pod> {
    data: Vec<T>,
    buffer: ManagedBuffer,
    usage: vk::BufferUsageFlags,
    location: MemoryLocation,
    capacity: usize,
    reallocations: usize,
}

impl<T: Pod> ManagedVectorBuffer<T> {
    /// Empty vector; nothing is allocated until the first `init_or_update`
    pub fn new(name: impl Into<String>, usage: vk::BufferUsageFlags, location: MemoryLocation) -> Self {
        Self {
            data: Vec::new(),
            buffer: ManagedBuffer::new(name),
            usage,
            location,
            capacity: 0,
            reallocations: 0,
        }
    }

    /// CPU side elements
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable CPU side elements; call `upload` or `init_or_update` afterwards
    pub fn data_mut(&mut self) -> &mut Vec<T> {
        &mut self.data
    }

    /// Number of CPU side elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the CPU side is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element capacity of the GPU buffer
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many times the GPU buffer has been (re)allocated
    pub fn reallocations(&self) -> usize {
        self.reallocations
    }

    /// Underlying resource handle
    pub fn buffer(&self) -> &ManagedBuffer {
        &self.buffer
    }

    /// Make sure the GPU buffer fits the vector, then upload it
    ///
    /// Returns `true` when a new allocation was made. On allocation failure the
    /// old buffer has already been released and the handle is left empty.
    pub fn init_or_update(&mut self, context: &Arc<RenderContext>) -> SceneResult<bool> {
        // Zero sized buffers are invalid, so an empty vector still reserves one element
        let required = self.data.len().max(1);
        let grow = !self.buffer.exists() || self.capacity < required;

        if grow {
            if self.buffer.exists() {
                self.buffer.destroy();
                self.capacity = 0;
            }
            let size = (required * std::mem::size_of::<T>()) as vk::DeviceSize;
            self.buffer.create(
                context,
                BufferDesc {
                    size,
                    usage: self.usage,
                    location: self.location,
                },
            )?;
            self.capacity = required;
            self.reallocations += 1;
        }

        self.upload()?;
        Ok(grow)
    }

    /// Upload the whole vector into the existing GPU buffer
    pub fn upload(&mut self) -> SceneResult<()> {
        if self.data.is_empty() {
            return Ok(());
        }
        self.buffer.write(0, bytemuck::cast_slice(&self.data))
    }

    /// Upload a sub range of elements
    pub fn upload_range(&mut self, range: std::ops::Range<usize>) -> SceneResult<()> {
        let element_size = std::mem::size_of::<T>() as vk::DeviceSize;
        let offset = range.start as vk::DeviceSize * element_size;
        self.buffer.write(offset, bytemuck::cast_slice(&self.data[range]))
    }

    /// Descriptor covering the GPU buffer
    pub fn descriptor_info(&self) -> vk::DescriptorBufferInfo {
        self.buffer.descriptor_info()
    }

    /// Release the GPU buffer, keeping the CPU side
    pub fn destroy(&mut self) {
        if self.buffer.exists() {
            self.buffer.destroy();
        }
        self.capacity = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::vulkan::HostAllocator;

    fn context() -> (Arc<HostAllocator>, Arc<RenderContext>) {
        let host = Arc::new(HostAllocator::new());
        let context = Arc::new(RenderContext::new(host.clone(), vk::Extent2D { width: 1, height: 1 }));
        (host, context)
    }

    #[test]
    fn test_growth_only_reallocates_when_needed() {
        let (host, context) = context();
        let mut vector: ManagedVectorBuffer<u32> =
            ManagedVectorBuffer::new("indices", vk::BufferUsageFlags::STORAGE_BUFFER, MemoryLocation::HostVisible);

        let mut capacities = Vec::new();
        for count in [2usize, 2, 5, 5, 9] {
            vector.data_mut().resize(count, 3);
            vector.init_or_update(&context).unwrap();
            capacities.push(vector.capacity());
        }

        assert_eq!(capacities, vec![2, 2, 5, 5, 9]);
        assert_eq!(vector.reallocations(), 3);
        assert_eq!(host.buffer_creations(), 3);
        assert_eq!(host.live_buffers(), 1);
    }

    #[test]
    fn test_shrinking_keeps_allocation() {
        let (_host, context) = context();
        let mut vector: ManagedVectorBuffer<f32> =
            ManagedVectorBuffer::new("weights", vk::BufferUsageFlags::STORAGE_BUFFER, MemoryLocation::HostVisible);

        vector.data_mut().resize(8, 1.0);
        assert!(vector.init_or_update(&context).unwrap());
        let handle = vector.buffer().buffer();

        vector.data_mut().truncate(3);
        assert!(!vector.init_or_update(&context).unwrap());
        assert_eq!(vector.capacity(), 8);
        assert_eq!(vector.buffer().buffer(), handle);
    }

    #[test]
    fn test_upload_range_writes_at_element_offset() {
        let (host, context) = context();
        let mut vector: ManagedVectorBuffer<u32> =
            ManagedVectorBuffer::new("range", vk::BufferUsageFlags::STORAGE_BUFFER, MemoryLocation::HostVisible);
        vector.data_mut().extend([0, 0, 0]);
        vector.init_or_update(&context).unwrap();

        vector.data_mut()[2] = 0xAABB_CCDD;
        vector.upload_range(2..3).unwrap();

        let bytes = host.buffer_contents(vector.buffer().buffer()).unwrap();
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_ne_bytes(chunk.try_into().unwrap()))
            .collect();
        assert_eq!(words, vec![0, 0, 0xAABB_CCDD]);
    }

    #[test]
    fn test_empty_vector_still_allocates() {
        let (_host, context) = context();
        let mut vector: ManagedVectorBuffer<u64> =
            ManagedVectorBuffer::new("empty", vk::BufferUsageFlags::STORAGE_BUFFER, MemoryLocation::HostVisible);
        vector.init_or_update(&context).unwrap();
        assert!(vector.buffer().exists());
        assert_eq!(vector.capacity(), 1);
    }
}
