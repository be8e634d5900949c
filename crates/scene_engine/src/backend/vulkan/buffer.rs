//! Resource handle for GPU buffers
//!
//! [`ManagedBuffer`] owns at most one buffer allocation. It starts empty,
//! allocates on [`create`](ManagedBuffer::create) and frees on
//! [`destroy`](ManagedBuffer::destroy) or drop. Every allocation is registered
//! with the context's [`AllocationTracker`](super::AllocationTracker) for its
//! whole lifetime.
//!
//! # Contract
//! - `create` on a live handle panics.
//! - `destroy` on a handle without an allocation panics (double destroy).
//! - Dropping a live handle frees it silently.

use std::sync::Arc;

use ash::vk;

use super::allocator::{BufferAllocation, BufferDesc};
use super::context::RenderContext;
use super::tracker::{AllocationId, AllocationKind};
use crate::error::{SceneError, SceneResult};

struct LiveBuffer {
    context: Arc<RenderContext>,
    allocation: BufferAllocation,
    tracking: AllocationId,
    desc: BufferDesc,
}

/// GPU buffer wrapper owning exactly one allocation
pub struct ManagedBuffer {
    name: String,
    live: Option<LiveBuffer>,
}

impl ManagedBuffer {
    /// Handle without an allocation
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            live: None,
        }
    }

    /// Allocate the buffer
    ///
    /// # Panics
    /// If the handle already owns an allocation.
    pub fn create(&mut self, context: &Arc<RenderContext>, desc: BufferDesc) -> SceneResult<()> {
        assert!(self.live.is_none(), "ManagedBuffer '{}' created twice", self.name);

        let allocation = context.allocator().create_buffer(&self.name, &desc)?;
        let tracking = context
            .tracker()
            .register(&self.name, desc.size, AllocationKind::Buffer);
        if context.debug_names() {
            log::debug!("Created buffer '{}' ({} bytes, {:?})", self.name, desc.size, desc.location);
        }

        self.live = Some(LiveBuffer {
            context: Arc::clone(context),
            allocation,
            tracking,
            desc,
        });
        Ok(())
    }

    /// Whether the handle currently owns an allocation
    pub fn exists(&self) -> bool {
        self.live.is_some()
    }

    /// Debug name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Allocated size in bytes, 0 without an allocation
    pub fn size(&self) -> vk::DeviceSize {
        self.live.as_ref().map_or(0, |live| live.desc.size)
    }

    /// Creation parameters of the live allocation
    pub fn desc(&self) -> Option<&BufferDesc> {
        self.live.as_ref().map(|live| &live.desc)
    }

    /// Native handle, null without an allocation
    pub fn buffer(&self) -> vk::Buffer {
        self.live
            .as_ref()
            .map_or_else(vk::Buffer::null, |live| live.allocation.buffer)
    }

    /// Write bytes at `offset`
    pub fn write(&mut self, offset: vk::DeviceSize, data: &[u8]) -> SceneResult<()> {
        let live = self
            .live
            .as_ref()
            .ok_or_else(|| SceneError::ResourceMissing(self.name.clone()))?;
        live.context.allocator().write_buffer(&live.allocation, offset, data)
    }

    /// Map, write from the start of the buffer, unmap
    pub fn map_and_write(&mut self, data: &[u8]) -> SceneResult<()> {
        self.write(0, data)
    }

    /// Descriptor covering the whole buffer
    pub fn descriptor_info(&self) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.buffer(),
            offset: 0,
            range: if self.exists() { self.size() } else { vk::WHOLE_SIZE },
        }
    }

    /// Free the allocation
    ///
    /// # Panics
    /// If there is no allocation to free.
    pub fn destroy(&mut self) {
        assert!(self.live.is_some(), "ManagedBuffer '{}' destroyed without a live allocation", self.name);
        self.release();
    }

    fn release(&mut self) {
        if let Some(live) = self.live.take() {
            if live.context.debug_names() {
                log::debug!("Destroying buffer '{}'", self.name);
            }
            live.context.tracker().release(live.tracking);
            live.context.allocator().destroy_buffer(live.allocation);
        }
    }
}

impl Drop for ManagedBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ManagedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedBuffer")
            .field("name", &self.name)
            .field("buffer", &self.buffer())
            .field("size", &self.size())
            .finish()
    }
}
