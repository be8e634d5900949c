//! Descriptor descriptions for resources owned by the scene
//!
//! The scene does not create descriptor sets. Components describe what
//! should be bound, one entry per descriptor set; pipeline code that owns the
//! layouts turns these into `vkUpdateDescriptorSets` writes. A resource that
//! rotates per frame in flight yields one set per slot.

use ash::vk;

/// What a binding contains across one or more descriptor sets
#[derive(Debug, Clone)]
pub struct DescriptorInfo {
    /// Descriptor type of the binding
    pub descriptor_type: vk::DescriptorType,
    /// Shader stages that access the binding
    pub stages: vk::ShaderStageFlags,
    /// Buffer infos, outer index is the descriptor set
    pub buffer_sets: Vec<Vec<vk::DescriptorBufferInfo>>,
    /// Image infos, outer index is the descriptor set
    pub image_sets: Vec<Vec<vk::DescriptorImageInfo>>,
}

impl DescriptorInfo {
    /// Binding made of buffers
    pub fn buffers(
        descriptor_type: vk::DescriptorType,
        stages: vk::ShaderStageFlags,
        buffer_sets: Vec<Vec<vk::DescriptorBufferInfo>>,
    ) -> Self {
        Self {
            descriptor_type,
            stages,
            buffer_sets,
            image_sets: Vec::new(),
        }
    }

    /// Binding made of images
    pub fn images(
        descriptor_type: vk::DescriptorType,
        stages: vk::ShaderStageFlags,
        image_sets: Vec<Vec<vk::DescriptorImageInfo>>,
    ) -> Self {
        Self {
            descriptor_type,
            stages,
            buffer_sets: Vec::new(),
            image_sets,
        }
    }

    /// Number of descriptor sets described
    pub fn set_count(&self) -> usize {
        self.buffer_sets.len().max(self.image_sets.len())
    }

    /// Descriptor count of the binding in set `index`
    pub fn descriptor_count(&self, index: usize) -> usize {
        match self.buffer_sets.get(index) {
            Some(buffers) => buffers.len(),
            None => self.image_sets.get(index).map_or(0, Vec::len),
        }
    }
}
