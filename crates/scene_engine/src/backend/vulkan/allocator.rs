//! GPU allocation service
//!
//! The scene core never talks to a memory allocator directly. It asks a
//! [`GpuAllocator`] for buffers and images and gets back opaque allocations.
//! [`VmaAllocator`](super::VmaAllocator) is the production implementation;
//! [`HostAllocator`](super::HostAllocator) keeps everything in host memory for
//! headless runs and tests.

use ash::vk;

use crate::error::SceneResult;

/// Where an allocation should live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryLocation {
    /// Device local memory, written through a staging copy
    DeviceLocal,
    /// Host visible memory, written by mapping
    HostVisible,
}

/// Request for a buffer allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: vk::DeviceSize,
    /// Usage flags the buffer is created with
    pub usage: vk::BufferUsageFlags,
    /// Memory preference
    pub location: MemoryLocation,
}

impl BufferDesc {
    /// Host visible buffer of the given size and usage
    pub fn host_visible(size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> Self {
        Self {
            size,
            usage,
            location: MemoryLocation::HostVisible,
        }
    }

    /// Device local buffer of the given size and usage
    pub fn device_local(size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> Self {
        Self {
            size,
            usage,
            location: MemoryLocation::DeviceLocal,
        }
    }
}

/// Live buffer allocation returned by an allocator
///
/// Not `Clone`: exactly one owner hands it back to
/// [`GpuAllocator::destroy_buffer`].
#[derive(Debug, PartialEq, Eq)]
pub struct BufferAllocation {
    /// Allocator private identifier
    pub raw: u64,
    /// Native buffer handle
    pub buffer: vk::Buffer,
    /// Size in bytes
    pub size: vk::DeviceSize,
    /// Memory the buffer lives in
    pub location: MemoryLocation,
}

/// Request for a sampled 2D image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    /// Pixel dimensions
    pub extent: vk::Extent2D,
    /// Texel format of the supplied pixels
    pub format: vk::Format,
}

impl ImageDesc {
    /// Bytes a tightly packed RGBA8 image of this extent occupies
    pub fn rgba8_size(&self) -> vk::DeviceSize {
        vk::DeviceSize::from(self.extent.width) * vk::DeviceSize::from(self.extent.height) * 4
    }
}

/// Live image allocation returned by an allocator
#[derive(Debug, PartialEq, Eq)]
pub struct ImageAllocation {
    /// Allocator private identifier
    pub raw: u64,
    /// Native image handle
    pub image: vk::Image,
    /// View covering the whole image
    pub view: vk::ImageView,
    /// Pixel dimensions
    pub extent: vk::Extent2D,
    /// Texel format
    pub format: vk::Format,
}

/// Opaque allocate/free service
///
/// Failures are reported as [`SceneError::AllocationFailed`](crate::error::SceneError::AllocationFailed)
/// or [`SceneError::Api`](crate::error::SceneError::Api) and are fatal for the
/// requesting operation.
pub trait GpuAllocator {
    /// Allocate a buffer
    fn create_buffer(&self, name: &str, desc: &BufferDesc) -> SceneResult<BufferAllocation>;

    /// Copy `data` into the buffer at `offset`
    ///
    /// Host visible memory is mapped and written; device local memory goes
    /// through a staging copy that has completed when this returns.
    fn write_buffer(&self, allocation: &BufferAllocation, offset: vk::DeviceSize, data: &[u8]) -> SceneResult<()>;

    /// Free a buffer
    fn destroy_buffer(&self, allocation: BufferAllocation);

    /// Allocate a sampled image, upload `pixels` and leave it in shader read layout
    fn create_image(&self, name: &str, desc: &ImageDesc, pixels: &[u8]) -> SceneResult<ImageAllocation>;

    /// Free an image and its view
    fn destroy_image(&self, allocation: ImageAllocation);
}
