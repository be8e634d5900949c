//! Production allocator on top of the Vulkan Memory Allocator
//!
//! The device, queue and command pool belong to the rendering context that
//! creates this allocator; only the VMA allocations made here are owned.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use ash::vk;
use vk_mem::Alloc;

use super::allocator::{BufferAllocation, BufferDesc, GpuAllocator, ImageAllocation, ImageDesc, MemoryLocation};
use crate::error::{SceneError, SceneResult};

/// [`GpuAllocator`] backed by `vk-mem`
pub struct VmaAllocator {
    device: ash::Device,
    allocator: vk_mem::Allocator,
    transfer_queue: vk::Queue,
    command_pool: vk::CommandPool,
    next_raw: AtomicU64,
    allocations: Mutex<HashMap<u64, vk_mem::Allocation>>,
}

impl VmaAllocator {
    /// Wrap an allocator created for `device`
    ///
    /// `transfer_queue` and `command_pool` are used for staging uploads into
    /// device local memory. The pool must allow transient one-shot buffers.
    pub fn new(
        device: ash::Device,
        allocator: vk_mem::Allocator,
        transfer_queue: vk::Queue,
        command_pool: vk::CommandPool,
    ) -> Self {
        Self {
            device,
            allocator,
            transfer_queue,
            command_pool,
            next_raw: AtomicU64::new(1),
            allocations: Mutex::new(HashMap::new()),
        }
    }

    fn allocation_info(location: MemoryLocation) -> vk_mem::AllocationCreateInfo {
        match location {
            MemoryLocation::DeviceLocal => vk_mem::AllocationCreateInfo {
                usage: vk_mem::MemoryUsage::AutoPreferDevice,
                ..Default::default()
            },
            MemoryLocation::HostVisible => vk_mem::AllocationCreateInfo {
                usage: vk_mem::MemoryUsage::AutoPreferHost,
                flags: vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE,
                required_flags: vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
                ..Default::default()
            },
        }
    }

    fn store(&self, allocation: vk_mem::Allocation) -> u64 {
        let raw = self.next_raw.fetch_add(1, Ordering::Relaxed);
        self.allocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(raw, allocation);
        raw
    }

    fn write_mapped(&self, raw: u64, offset: vk::DeviceSize, data: &[u8]) -> SceneResult<()> {
        let offset = usize::try_from(offset).map_err(|_| SceneError::invalid("write offset out of range"))?;
        let mut allocations = self.allocations.lock().unwrap_or_else(PoisonError::into_inner);
        let allocation = allocations
            .get_mut(&raw)
            .ok_or_else(|| SceneError::ResourceMissing(format!("vma allocation {raw}")))?;

        // SAFETY: the allocation is host visible and coherent, and callers bound
        // `offset + data.len()` by the buffer size.
        unsafe {
            let mapped = self.allocator.map_memory(allocation)?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.add(offset), data.len());
            self.allocator.unmap_memory(allocation);
        }
        Ok(())
    }

    fn submit_once(&self, record: impl FnOnce(&ash::Device, vk::CommandBuffer)) -> SceneResult<()> {
        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        // SAFETY: the pool and queue outlive this allocator; the fence wait below
        // keeps the command buffer alive until execution has finished.
        unsafe {
            let command_buffer = self
                .device
                .allocate_command_buffers(&allocate_info)?
                .into_iter()
                .next()
                .ok_or_else(|| SceneError::invalid("command pool returned no command buffer"))?;

            let result = self.record_and_wait(command_buffer, record);
            self.device.free_command_buffers(self.command_pool, &[command_buffer]);
            result
        }
    }

    unsafe fn record_and_wait(
        &self,
        command_buffer: vk::CommandBuffer,
        record: impl FnOnce(&ash::Device, vk::CommandBuffer),
    ) -> SceneResult<()> {
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        self.device.begin_command_buffer(command_buffer, &begin_info)?;
        record(&self.device, command_buffer);
        self.device.end_command_buffer(command_buffer)?;

        let fence = self.device.create_fence(&vk::FenceCreateInfo::default(), None)?;
        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers).build();
        let waited = self
            .device
            .queue_submit(self.transfer_queue, &[submit_info], fence)
            .and_then(|()| self.device.wait_for_fences(&[fence], true, u64::MAX));
        self.device.destroy_fence(fence, None);
        waited?;
        Ok(())
    }

    fn with_staging<R>(&self, name: &str, data: &[u8], use_staging: impl FnOnce(vk::Buffer) -> SceneResult<R>) -> SceneResult<R> {
        let staging_name = format!("{name} (staging)");
        let staging = self.create_buffer(
            &staging_name,
            &BufferDesc::host_visible(data.len() as vk::DeviceSize, vk::BufferUsageFlags::TRANSFER_SRC),
        )?;
        let result = self
            .write_mapped(staging.raw, 0, data)
            .and_then(|()| use_staging(staging.buffer));
        self.destroy_buffer(staging);
        result
    }
}

impl GpuAllocator for VmaAllocator {
    fn create_buffer(&self, name: &str, desc: &BufferDesc) -> SceneResult<BufferAllocation> {
        let usage = match desc.location {
            MemoryLocation::DeviceLocal => desc.usage | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::HostVisible => desc.usage,
        };
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(desc.size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        // SAFETY: create info is fully initialized and the allocator is live.
        let (buffer, allocation) = unsafe {
            self.allocator
                .create_buffer(&buffer_info, &Self::allocation_info(desc.location))
        }
        .map_err(|result| SceneError::AllocationFailed {
            name: name.to_string(),
            size: desc.size,
            reason: format!("{result:?}"),
        })?;

        Ok(BufferAllocation {
            raw: self.store(allocation),
            buffer,
            size: desc.size,
            location: desc.location,
        })
    }

    fn write_buffer(&self, allocation: &BufferAllocation, offset: vk::DeviceSize, data: &[u8]) -> SceneResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        if offset + data.len() as vk::DeviceSize > allocation.size {
            return Err(SceneError::invalid(format!(
                "write of {} bytes at {offset} overflows buffer of {} bytes",
                data.len(),
                allocation.size
            )));
        }

        match allocation.location {
            MemoryLocation::HostVisible => self.write_mapped(allocation.raw, offset, data),
            MemoryLocation::DeviceLocal => self.with_staging("buffer upload", data, |staging| {
                let region = vk::BufferCopy {
                    src_offset: 0,
                    dst_offset: offset,
                    size: data.len() as vk::DeviceSize,
                };
                self.submit_once(|device, command_buffer| unsafe {
                    device.cmd_copy_buffer(command_buffer, staging, allocation.buffer, &[region]);
                })
            }),
        }
    }

    fn destroy_buffer(&self, allocation: BufferAllocation) {
        let stored = self
            .allocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&allocation.raw);
        match stored {
            // SAFETY: the buffer was created by this allocator and is no longer referenced.
            Some(mut vma_allocation) => unsafe {
                self.allocator.destroy_buffer(allocation.buffer, &mut vma_allocation);
            },
            None => log::warn!("Destroying unknown buffer allocation {}", allocation.raw),
        }
    }

    fn create_image(&self, name: &str, desc: &ImageDesc, pixels: &[u8]) -> SceneResult<ImageAllocation> {
        let extent = vk::Extent3D {
            width: desc.extent.width,
            height: desc.extent.height,
            depth: 1,
        };
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(desc.format)
            .extent(extent)
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        // SAFETY: create info is fully initialized and the allocator is live.
        let (image, mut vma_allocation) = unsafe {
            self.allocator
                .create_image(&image_info, &Self::allocation_info(MemoryLocation::DeviceLocal))
        }
        .map_err(|result| SceneError::AllocationFailed {
            name: name.to_string(),
            size: desc.rgba8_size(),
            reason: format!("{result:?}"),
        })?;

        let range = vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        };

        let uploaded = self.with_staging(name, pixels, |staging| {
            self.submit_once(|device, command_buffer| unsafe {
                let to_transfer = vk::ImageMemoryBarrier::builder()
                    .old_layout(vk::ImageLayout::UNDEFINED)
                    .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(image)
                    .subresource_range(range)
                    .src_access_mask(vk::AccessFlags::empty())
                    .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                    .build();
                device.cmd_pipeline_barrier(
                    command_buffer,
                    vk::PipelineStageFlags::TOP_OF_PIPE,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &[to_transfer],
                );

                let region = vk::BufferImageCopy {
                    buffer_offset: 0,
                    buffer_row_length: 0,
                    buffer_image_height: 0,
                    image_subresource: vk::ImageSubresourceLayers {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        mip_level: 0,
                        base_array_layer: 0,
                        layer_count: 1,
                    },
                    image_offset: vk::Offset3D::default(),
                    image_extent: extent,
                };
                device.cmd_copy_buffer_to_image(
                    command_buffer,
                    staging,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );

                let to_shader = vk::ImageMemoryBarrier::builder()
                    .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                    .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(image)
                    .subresource_range(range)
                    .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                    .dst_access_mask(vk::AccessFlags::SHADER_READ)
                    .build();
                device.cmd_pipeline_barrier(
                    command_buffer,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::PipelineStageFlags::FRAGMENT_SHADER,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &[to_shader],
                );
            })
        });

        let view = uploaded.and_then(|()| {
            let view_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(desc.format)
                .subresource_range(range);
            // SAFETY: the image is live and in shader read layout.
            unsafe { self.device.create_image_view(&view_info, None) }.map_err(SceneError::from)
        });

        match view {
            Ok(view) => Ok(ImageAllocation {
                raw: self.store(vma_allocation),
                image,
                view,
                extent: desc.extent,
                format: desc.format,
            }),
            Err(err) => {
                // SAFETY: the image was created above and nothing references it yet.
                unsafe { self.allocator.destroy_image(image, &mut vma_allocation) };
                Err(err)
            }
        }
    }

    fn destroy_image(&self, allocation: ImageAllocation) {
        let stored = self
            .allocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&allocation.raw);
        // SAFETY: the image and view were created by this allocator and are no longer referenced.
        unsafe {
            self.device.destroy_image_view(allocation.view, None);
            match stored {
                Some(mut vma_allocation) => self.allocator.destroy_image(allocation.image, &mut vma_allocation),
                None => log::warn!("Destroying unknown image allocation {}", allocation.raw),
            }
        }
    }
}

impl Drop for VmaAllocator {
    fn drop(&mut self) {
        let remaining = self.allocations.lock().unwrap_or_else(PoisonError::into_inner).len();
        if remaining > 0 {
            log::warn!("VmaAllocator dropped with {remaining} live allocations");
        }
    }
}
