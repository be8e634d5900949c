//! Host memory allocator
//!
//! Implements [`GpuAllocator`] on plain byte vectors. Handles are synthesized
//! from a counter, so they are unique but never valid on a real device. Used
//! by the inspector binary and by the test suite, which reads buffer contents
//! back to check what the scene uploaded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use ash::vk::{self, Handle};

use super::allocator::{BufferAllocation, BufferDesc, GpuAllocator, ImageAllocation, ImageDesc};
use crate::error::{SceneError, SceneResult};

#[derive(Debug)]
struct HostBuffer {
    name: String,
    bytes: Vec<u8>,
}

/// [`GpuAllocator`] backed by host memory
#[derive(Debug, Default)]
pub struct HostAllocator {
    next_raw: AtomicU64,
    budget: Option<u64>,
    used: AtomicU64,
    buffer_creations: AtomicUsize,
    buffers: Mutex<HashMap<u64, HostBuffer>>,
    images: Mutex<HashMap<u64, Vec<u8>>>,
}

impl HostAllocator {
    /// Allocator without a size limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator that fails once more than `bytes` would be live
    pub fn with_budget(bytes: u64) -> Self {
        Self {
            budget: Some(bytes),
            ..Self::default()
        }
    }

    /// Contents of a live buffer
    pub fn buffer_contents(&self, buffer: vk::Buffer) -> Option<Vec<u8>> {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&buffer.as_raw())
            .map(|host| host.bytes.clone())
    }

    /// Debug name a live buffer was created with
    pub fn buffer_name(&self, buffer: vk::Buffer) -> Option<String> {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&buffer.as_raw())
            .map(|host| host.name.clone())
    }

    /// Number of buffers created over the allocator's lifetime
    pub fn buffer_creations(&self) -> usize {
        self.buffer_creations.load(Ordering::Relaxed)
    }

    /// Number of buffers currently allocated
    pub fn live_buffers(&self) -> usize {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of images currently allocated
    pub fn live_images(&self) -> usize {
        self.images.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Bytes currently allocated
    pub fn used_bytes(&self) -> u64 {
        self.used.load(Ordering::Relaxed)
    }

    fn reserve(&self, name: &str, size: u64) -> SceneResult<u64> {
        let used = self.used.load(Ordering::Relaxed);
        if let Some(budget) = self.budget {
            if used + size > budget {
                return Err(SceneError::AllocationFailed {
                    name: name.to_string(),
                    size,
                    reason: format!("host budget of {budget} bytes exhausted ({used} in use)"),
                });
            }
        }
        self.used.fetch_add(size, Ordering::Relaxed);
        // Raw handles start at 1 so no allocation ever looks like a null handle
        Ok(self.next_raw.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl GpuAllocator for HostAllocator {
    fn create_buffer(&self, name: &str, desc: &BufferDesc) -> SceneResult<BufferAllocation> {
        let raw = self.reserve(name, desc.size)?;
        let size = usize::try_from(desc.size).map_err(|_| SceneError::AllocationFailed {
            name: name.to_string(),
            size: desc.size,
            reason: "size exceeds host address space".to_string(),
        })?;

        self.buffers.lock().unwrap_or_else(PoisonError::into_inner).insert(
            raw,
            HostBuffer {
                name: name.to_string(),
                bytes: vec![0; size],
            },
        );
        self.buffer_creations.fetch_add(1, Ordering::Relaxed);

        Ok(BufferAllocation {
            raw,
            buffer: vk::Buffer::from_raw(raw),
            size: desc.size,
            location: desc.location,
        })
    }

    fn write_buffer(&self, allocation: &BufferAllocation, offset: vk::DeviceSize, data: &[u8]) -> SceneResult<()> {
        let mut buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        let host = buffers
            .get_mut(&allocation.raw)
            .ok_or_else(|| SceneError::ResourceMissing(format!("host buffer {}", allocation.raw)))?;

        let start = usize::try_from(offset).map_err(|_| SceneError::invalid("write offset out of range"))?;
        let end = start + data.len();
        if end > host.bytes.len() {
            return Err(SceneError::invalid(format!(
                "write of {} bytes at {} overflows '{}' ({} bytes)",
                data.len(),
                start,
                host.name,
                host.bytes.len()
            )));
        }
        host.bytes[start..end].copy_from_slice(data);
        Ok(())
    }

    fn destroy_buffer(&self, allocation: BufferAllocation) {
        if self
            .buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&allocation.raw)
            .is_some()
        {
            self.used.fetch_sub(allocation.size, Ordering::Relaxed);
        }
    }

    fn create_image(&self, name: &str, desc: &ImageDesc, pixels: &[u8]) -> SceneResult<ImageAllocation> {
        let size = desc.rgba8_size();
        if pixels.len() as u64 != size {
            return Err(SceneError::invalid(format!(
                "image '{name}' expects {size} bytes of pixels, got {}",
                pixels.len()
            )));
        }
        let raw = self.reserve(name, size)?;
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(raw, pixels.to_vec());

        Ok(ImageAllocation {
            raw,
            image: vk::Image::from_raw(raw),
            view: vk::ImageView::from_raw(raw),
            extent: desc.extent,
            format: desc.format,
        })
    }

    fn destroy_image(&self, allocation: ImageAllocation) {
        if let Some(pixels) = self
            .images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&allocation.raw)
        {
            self.used.fetch_sub(pixels.len() as u64, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_write_and_read_back() {
        let allocator = HostAllocator::new();
        let allocation = allocator
            .create_buffer("test", &BufferDesc::host_visible(8, vk::BufferUsageFlags::UNIFORM_BUFFER))
            .unwrap();

        allocator.write_buffer(&allocation, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(allocator.buffer_contents(allocation.buffer).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(allocator.write_buffer(&allocation, 6, &[0; 4]).is_err());

        allocator.destroy_buffer(allocation);
        assert_eq!(allocator.live_buffers(), 0);
        assert_eq!(allocator.used_bytes(), 0);
    }

    #[test]
    fn test_budget_exhaustion() {
        let allocator = HostAllocator::with_budget(100);
        let desc = BufferDesc::device_local(64, vk::BufferUsageFlags::VERTEX_BUFFER);

        let first = allocator.create_buffer("first", &desc).unwrap();
        let second = allocator.create_buffer("second", &desc);
        assert!(matches!(second, Err(SceneError::AllocationFailed { size: 64, .. })));

        allocator.destroy_buffer(first);
        assert!(allocator.create_buffer("third", &desc).is_ok());
        assert_eq!(allocator.buffer_creations(), 2);
    }

    #[test]
    fn test_handles_are_never_null() {
        let allocator = HostAllocator::new();
        let allocation = allocator
            .create_buffer("first", &BufferDesc::host_visible(4, vk::BufferUsageFlags::STORAGE_BUFFER))
            .unwrap();
        assert_ne!(allocation.buffer, vk::Buffer::null());
    }
}
