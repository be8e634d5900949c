//! Scene materials and their GPU representation

use std::sync::Arc;

use ash::vk;

use crate::backend::vulkan::{DescriptorInfo, ManagedVectorBuffer, MemoryLocation, RenderContext};
use crate::ecs::Component;
use crate::error::SceneResult;

/// How a material's alpha channel is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum AlphaMode {
    /// Alpha ignored
    #[default]
    Opaque = 0,
    /// Alpha tested against the cutoff
    Mask = 1,
    /// Alpha blended
    Blend = 2,
}

/// Default cutoff for [`AlphaMode::Mask`]
pub const DEFAULT_ALPHA_CUTOFF: f32 = 0.5;

/// Metallic-roughness material
///
/// Texture references are indices into the scene's
/// [`TextureStore`](super::TextureStore), -1 when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Display name
    pub name: String,
    /// Linear RGBA base color
    pub base_color_factor: [f32; 4],
    /// Linear RGB emission
    pub emissive_factor: [f32; 3],
    /// Metalness in 0..1
    pub metallic_factor: f32,
    /// Roughness in 0..1
    pub roughness_factor: f32,
    /// Alpha interpretation
    pub alpha_mode: AlphaMode,
    /// Threshold for [`AlphaMode::Mask`]
    pub alpha_cutoff: f32,
    /// Disable backface culling
    pub double_sided: bool,
    /// Base color texture
    pub base_color_texture: i32,
    /// Metallic (B) roughness (G) texture
    pub metallic_roughness_texture: i32,
    /// Tangent space normal map
    pub normal_texture: i32,
    /// Emission texture
    pub emissive_texture: i32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_color_factor: [1.0; 4],
            emissive_factor: [0.0; 3],
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: DEFAULT_ALPHA_CUTOFF,
            double_sided: false,
            base_color_texture: -1,
            metallic_roughness_texture: -1,
            normal_texture: -1,
            emissive_texture: -1,
        }
    }
}

/// std430 layout of one material, 64 bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialBufferObject {
    /// Base color
    pub base_color_factor: [f32; 4],
    /// Emission
    pub emissive_factor: [f32; 3],
    /// Metalness
    pub metallic_factor: f32,
    /// Roughness
    pub roughness_factor: f32,
    /// Mask threshold
    pub alpha_cutoff: f32,
    /// [`AlphaMode`] discriminant
    pub alpha_mode: u32,
    /// 1 when double sided
    pub double_sided: u32,
    /// Texture indices: base color, metallic roughness, normal, emissive
    pub textures: [i32; 4],
}

unsafe impl bytemuck::Pod for MaterialBufferObject {}
unsafe impl bytemuck::Zeroable for MaterialBufferObject {}

impl From<&Material> for MaterialBufferObject {
    fn from(material: &Material) -> Self {
        Self {
            base_color_factor: material.base_color_factor,
            emissive_factor: material.emissive_factor,
            metallic_factor: material.metallic_factor,
            roughness_factor: material.roughness_factor,
            alpha_cutoff: material.alpha_cutoff,
            alpha_mode: material.alpha_mode as u32,
            double_sided: u32::from(material.double_sided),
            textures: [
                material.base_color_texture,
                material.metallic_roughness_texture,
                material.normal_texture,
                material.emissive_texture,
            ],
        }
    }
}

/// Global component holding every material of the scene
pub struct MaterialBuffer {
    materials: Vec<Material>,
    buffer: ManagedVectorBuffer<MaterialBufferObject>,
}

impl Default for MaterialBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialBuffer {
    /// Empty buffer, nothing allocated
    pub fn new() -> Self {
        Self {
            materials: Vec::new(),
            buffer: ManagedVectorBuffer::new(
                "Materials",
                vk::BufferUsageFlags::STORAGE_BUFFER,
                MemoryLocation::DeviceLocal,
            ),
        }
    }

    /// Materials in index order
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Mutable materials; call [`update_buffer`](Self::update_buffer) afterwards
    pub fn materials_mut(&mut self) -> &mut Vec<Material> {
        &mut self.materials
    }

    /// Append a material, returning its index
    pub fn push(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Number of materials
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Whether there are no materials
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Pack the materials and upload them
    pub fn update_buffer(&mut self, context: &Arc<RenderContext>) -> SceneResult<()> {
        *self.buffer.data_mut() = self.materials.iter().map(MaterialBufferObject::from).collect();
        self.buffer.init_or_update(context)?;
        Ok(())
    }

    /// GPU buffer
    pub fn gpu_buffer(&self) -> &ManagedVectorBuffer<MaterialBufferObject> {
        &self.buffer
    }

    /// Storage buffer binding for the material array
    pub fn descriptor_info(&self, stages: vk::ShaderStageFlags) -> DescriptorInfo {
        DescriptorInfo::buffers(
            vk::DescriptorType::STORAGE_BUFFER,
            stages,
            vec![vec![self.buffer.descriptor_info()]],
        )
    }
}

impl Component for MaterialBuffer {
    fn cleanup(&mut self) {
        self.materials.clear();
        self.buffer.data_mut().clear();
        self.buffer.destroy();
    }
}
