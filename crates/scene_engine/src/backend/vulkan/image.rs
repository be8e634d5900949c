//! Resource handle for sampled images

use std::sync::Arc;

use ash::vk;

use super::allocator::{ImageAllocation, ImageDesc};
use super::context::RenderContext;
use super::tracker::{AllocationId, AllocationKind};
use crate::error::SceneResult;

struct LiveImage {
    context: Arc<RenderContext>,
    allocation: ImageAllocation,
    tracking: AllocationId,
}

/// Sampled 2D image owning exactly one allocation
///
/// Same contract as [`ManagedBuffer`](super::ManagedBuffer): create once,
/// destroy once, released on drop.
pub struct ManagedImage {
    name: String,
    live: Option<LiveImage>,
}

impl ManagedImage {
    /// Handle without an allocation
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            live: None,
        }
    }

    /// Allocate the image and upload tightly packed pixels
    ///
    /// # Panics
    /// If the handle already owns an allocation.
    pub fn create(&mut self, context: &Arc<RenderContext>, desc: ImageDesc, pixels: &[u8]) -> SceneResult<()> {
        assert!(self.live.is_none(), "ManagedImage '{}' created twice", self.name);

        let allocation = context.allocator().create_image(&self.name, &desc, pixels)?;
        let tracking = context
            .tracker()
            .register(&self.name, desc.rgba8_size(), AllocationKind::Image);
        self.live = Some(LiveImage {
            context: Arc::clone(context),
            allocation,
            tracking,
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

    /// Pixel dimensions, zero without an allocation
    pub fn extent(&self) -> vk::Extent2D {
        self.live
            .as_ref()
            .map_or_else(vk::Extent2D::default, |live| live.allocation.extent)
    }

    /// Image view, null without an allocation
    pub fn view(&self) -> vk::ImageView {
        self.live
            .as_ref()
            .map_or_else(vk::ImageView::null, |live| live.allocation.view)
    }

    /// Descriptor for sampling the image with `sampler`
    pub fn descriptor_info(&self, sampler: vk::Sampler) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo {
            sampler,
            image_view: self.view(),
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }
    }

    /// Free the allocation
    ///
    /// # Panics
    /// If there is no allocation to free.
    pub fn destroy(&mut self) {
        assert!(self.live.is_some(), "ManagedImage '{}' destroyed without a live allocation", self.name);
        self.release();
    }

    fn release(&mut self) {
        if let Some(live) = self.live.take() {
            live.context.tracker().release(live.tracking);
            live.context.allocator().destroy_image(live.allocation);
        }
    }
}

impl Drop for ManagedImage {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::vulkan::HostAllocator;

    #[test]
    fn test_image_lifecycle() {
        let host = Arc::new(HostAllocator::new());
        let context = Arc::new(RenderContext::new(host.clone(), vk::Extent2D { width: 1, height: 1 }));
        let desc = ImageDesc {
            extent: vk::Extent2D { width: 2, height: 2 },
            format: vk::Format::R8G8B8A8_UNORM,
        };

        let mut image = ManagedImage::new("checker");
        image.create(&context, desc, &[255; 16]).unwrap();
        assert!(image.exists());
        assert_eq!(image.extent().width, 2);
        assert_eq!(host.live_images(), 1);
        assert_eq!(context.tracker().live_bytes(), 16);

        let info = image.descriptor_info(vk::Sampler::null());
        assert_eq!(info.image_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);

        drop(image);
        assert_eq!(host.live_images(), 0);
        assert_eq!(context.tracker().live_count(), 0);
    }
}
