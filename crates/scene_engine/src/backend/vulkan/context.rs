//! Rendering context shared by every GPU resource of a scene
//!
//! Bundles the allocation service, the allocation tracker and the swapchain
//! extent. The core reads it and never reconfigures it; the windowing layer
//! that owns the swapchain updates the extent after a resize.

use std::sync::{Arc, PoisonError, RwLock};

use ash::vk;

use super::allocator::GpuAllocator;
use super::host::HostAllocator;
use super::tracker::AllocationTracker;

/// Allocator, tracker and surface state for one device
pub struct RenderContext {
    allocator: Arc<dyn GpuAllocator>,
    tracker: AllocationTracker,
    swapchain_extent: RwLock<vk::Extent2D>,
    debug_names: bool,
}

impl RenderContext {
    /// Create a context around an allocator
    pub fn new(allocator: Arc<dyn GpuAllocator>, swapchain_extent: vk::Extent2D) -> Self {
        Self {
            allocator,
            tracker: AllocationTracker::new(),
            swapchain_extent: RwLock::new(swapchain_extent),
            debug_names: false,
        }
    }

    /// Context backed by a fresh [`HostAllocator`]
    pub fn headless(swapchain_extent: vk::Extent2D) -> Self {
        Self::new(Arc::new(HostAllocator::new()), swapchain_extent)
    }

    /// Log resource names on create and destroy
    #[must_use]
    pub fn with_debug_names(mut self, enabled: bool) -> Self {
        self.debug_names = enabled;
        self
    }

    /// Allocation service
    pub fn allocator(&self) -> &dyn GpuAllocator {
        self.allocator.as_ref()
    }

    /// Live allocation registry for this context
    pub fn tracker(&self) -> &AllocationTracker {
        &self.tracker
    }

    /// Whether resource names should be logged
    pub fn debug_names(&self) -> bool {
        self.debug_names
    }

    /// Current swapchain extent
    pub fn swapchain_extent(&self) -> vk::Extent2D {
        *self.swapchain_extent.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a new swapchain extent; called by the swapchain owner after a resize
    pub fn set_swapchain_extent(&self, extent: vk::Extent2D) {
        *self.swapchain_extent.write().unwrap_or_else(PoisonError::into_inner) = extent;
    }

    /// Width over height of the swapchain, 1.0 for a degenerate extent
    pub fn aspect_ratio(&self) -> f32 {
        aspect_ratio(self.swapchain_extent())
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        let leaks = self.tracker.report_leaks();
        if leaks > 0 {
            log::warn!("Render context destroyed with {leaks} live allocations");
        }
    }
}

/// Width over height, 1.0 for a degenerate extent
pub fn aspect_ratio(extent: vk::Extent2D) -> f32 {
    if extent.width == 0 || extent.height == 0 {
        1.0
    } else {
        extent.width as f32 / extent.height as f32
    }
}
