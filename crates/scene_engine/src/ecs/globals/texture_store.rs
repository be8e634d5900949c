//! Sampled textures of a scene

use std::sync::Arc;

use ash::vk;

use crate::backend::vulkan::{DescriptorInfo, ImageDesc, ManagedImage, RenderContext};
use crate::ecs::Component;
use crate::error::SceneResult;

/// Sampler parameters a texture expects
///
/// Samplers are created by the pipeline owner; the scene only records
/// what each texture asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerDesc {
    /// Magnification filter
    pub mag_filter: vk::Filter,
    /// Minification filter
    pub min_filter: vk::Filter,
    /// Mipmap filter
    pub mipmap_mode: vk::SamplerMipmapMode,
    /// Wrap along u
    pub address_mode_u: vk::SamplerAddressMode,
    /// Wrap along v
    pub address_mode_v: vk::SamplerAddressMode,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            mag_filter: vk::Filter::LINEAR,
            min_filter: vk::Filter::LINEAR,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            address_mode_u: vk::SamplerAddressMode::REPEAT,
            address_mode_v: vk::SamplerAddressMode::REPEAT,
        }
    }
}

impl SamplerDesc {
    /// Create info for a matching `vk::Sampler`
    pub fn create_info(&self) -> vk::SamplerCreateInfo {
        vk::SamplerCreateInfo::builder()
            .mag_filter(self.mag_filter)
            .min_filter(self.min_filter)
            .mipmap_mode(self.mipmap_mode)
            .address_mode_u(self.address_mode_u)
            .address_mode_v(self.address_mode_v)
            .address_mode_w(self.address_mode_v)
            .max_lod(vk::LOD_CLAMP_NONE)
            .build()
    }
}

/// Image plus the sampler it wants
pub struct Texture {
    /// Uploaded RGBA8 image
    pub image: ManagedImage,
    /// Requested sampler
    pub sampler: SamplerDesc,
}

impl Texture {
    /// Display name
    pub fn name(&self) -> &str {
        self.image.name()
    }
}

/// Global component owning all textures of a scene
#[derive(Default)]
pub struct TextureStore {
    textures: Vec<Texture>,
}

impl TextureStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload RGBA8 pixels as a new texture, returning its index
    pub fn create_texture(
        &mut self,
        context: &Arc<RenderContext>,
        name: impl Into<String>,
        extent: vk::Extent2D,
        rgba: &[u8],
        sampler: SamplerDesc,
    ) -> SceneResult<usize> {
        let mut image = ManagedImage::new(name);
        image.create(
            context,
            ImageDesc {
                extent,
                format: vk::Format::R8G8B8A8_UNORM,
            },
            rgba,
        )?;
        self.textures.push(Texture { image, sampler });
        Ok(self.textures.len() - 1)
    }

    /// Texture by index
    pub fn get(&self, index: usize) -> Option<&Texture> {
        self.textures.get(index)
    }

    /// Textures in index order
    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    /// Number of textures
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Combined image sampler array over every texture, one set
    pub fn descriptor_info(&self, stages: vk::ShaderStageFlags, sampler: vk::Sampler) -> DescriptorInfo {
        let images = self
            .textures
            .iter()
            .map(|texture| texture.image.descriptor_info(sampler))
            .collect();
        DescriptorInfo::images(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, stages, vec![images])
    }

    /// Free every texture
    pub fn clear(&mut self) {
        for texture in &mut self.textures {
            if texture.image.exists() {
                texture.image.destroy();
            }
        }
        self.textures.clear();
    }
}

impl Component for TextureStore {
    fn cleanup(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::vulkan::HostAllocator;

    #[test]
    fn test_create_and_describe() {
        let host = Arc::new(HostAllocator::new());
        let context = Arc::new(RenderContext::new(host.clone(), vk::Extent2D { width: 1, height: 1 }));
        let mut store = TextureStore::new();

        let index = store
            .create_texture(&context, "checker", vk::Extent2D { width: 2, height: 1 }, &[255; 8], SamplerDesc::default())
            .unwrap();
        assert_eq!(index, 0);
        assert_eq!(store.get(0).unwrap().name(), "checker");
        assert_eq!(host.live_images(), 1);

        let info = store.descriptor_info(vk::ShaderStageFlags::FRAGMENT, vk::Sampler::null());
        assert_eq!(info.descriptor_count(0), 1);
        assert_eq!(info.image_sets[0][0].image_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);

        store.cleanup();
        assert_eq!(host.live_images(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_pixel_size_mismatch_fails() {
        let context = Arc::new(RenderContext::headless(vk::Extent2D { width: 1, height: 1 }));
        let mut store = TextureStore::new();
        let result = store.create_texture(&context, "short", vk::Extent2D { width: 2, height: 2 }, &[0; 4], SamplerDesc::default());
        assert!(result.is_err());
        assert!(store.is_empty());
    }
}
