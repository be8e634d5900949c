//! # Vulkan resource layer
//!
//! Everything the scene needs from the GPU side: the allocation service and
//! its implementations, RAII resource handles, frame-in-flight rotation,
//! descriptor descriptions and the command recording seam.

pub mod allocator;
pub mod buffer;
pub mod context;
pub mod descriptor;
pub mod frame_rotator;
pub mod host;
pub mod image;
pub mod recorder;
pub mod tracker;
pub mod uniform_buffer;
pub mod vector_buffer;
pub mod vma;

pub use allocator::{BufferAllocation, BufferDesc, GpuAllocator, ImageAllocation, ImageDesc, MemoryLocation};
pub use buffer::ManagedBuffer;
pub use context::RenderContext;
pub use descriptor::DescriptorInfo;
pub use frame_rotator::{FrameRotator, INFLIGHT_FRAME_COUNT};
pub use host::HostAllocator;
pub use image::ManagedImage;
pub use recorder::{CommandLog, CommandRecorder, RecordedCommand, VulkanCommandRecorder};
pub use tracker::{AllocationId, AllocationKind, AllocationRecord, AllocationTracker};
pub use uniform_buffer::ManagedUbo;
pub use vector_buffer::ManagedVectorBuffer;
pub use vma::VmaAllocator;
