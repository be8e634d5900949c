//! Scene level tests driving full update and draw passes against host memory

mod lifecycle;

use std::sync::Arc;

use ash::vk;

use crate::backend::vulkan::{HostAllocator, RenderContext};
use crate::core::SceneConfig;
use crate::scene::Scene;

const EXTENT: vk::Extent2D = vk::Extent2D { width: 1280, height: 720 };

fn host_scene(host: HostAllocator) -> (Arc<HostAllocator>, Scene) {
    let host = Arc::new(host);
    let context = Arc::new(RenderContext::new(host.clone(), EXTENT));
    (host, Scene::with_config(context, SceneConfig::default()))
}

fn read_f32s(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
