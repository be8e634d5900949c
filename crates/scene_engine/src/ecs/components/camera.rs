//! Perspective camera with per-frame uniform blocks
//!
//! The camera keeps one [`CameraUboBlock`] per frame in flight. Its
//! before-draw hook writes the block of the current frame, so every draw hook
//! of that frame reads matrices computed for it.

use std::sync::Arc;

use ash::vk;

use super::FreeFlightController;
use crate::backend::vulkan::{DescriptorInfo, FrameRotator, ManagedUbo, RenderContext, INFLIGHT_FRAME_COUNT};
use crate::core::CameraConfig;
use crate::ecs::{
    Component, FrameRenderInfo, FrameUpdateInfo, HookContext, OnBeforeDraw, OnEvent, OnUpdate,
};
use crate::error::SceneResult;
use crate::events::{Event, EventKind};
use crate::foundation::math::{to_columns, Mat4, Mat4Ext, Vec3};

/// Camera matrices as seen by shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraUboBlock {
    /// Projection of the current frame
    pub projection: [[f32; 4]; 4],
    /// View of the current frame
    pub view: [[f32; 4]; 4],
    /// Projection of the previous frame
    pub previous_projection: [[f32; 4]; 4],
    /// View of the previous frame
    pub previous_view: [[f32; 4]; 4],
    /// `projection * view`
    pub projection_view: [[f32; 4]; 4],
    /// Previous frame's `projection * view`
    pub previous_projection_view: [[f32; 4]; 4],
}

unsafe impl bytemuck::Pod for CameraUboBlock {}
unsafe impl bytemuck::Zeroable for CameraUboBlock {}

#[derive(Debug, Clone, Copy)]
struct FrameMatrices {
    projection: Mat4,
    view: Mat4,
    projection_view: Mat4,
}

/// Node component describing a perspective camera
pub struct Camera {
    vertical_fov: f32,
    aspect: Option<f32>,
    near: f32,
    far: f32,
    eye: Vec3,
    target: Vec3,
    up: Vec3,
    view: Mat4,
    projection: Mat4,
    last_frame: Option<FrameMatrices>,
    ubos: FrameRotator<ManagedUbo<CameraUboBlock>>,
    controller: Option<FreeFlightController>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(&CameraConfig::default())
    }
}

impl Camera {
    /// Camera at (0, 0, -1) looking at the origin
    ///
    /// The aspect ratio follows the swapchain until set explicitly.
    pub fn new(config: &CameraConfig) -> Self {
        let mut camera = Self {
            vertical_fov: config.vertical_fov(),
            aspect: None,
            near: config.near_plane,
            far: config.far_plane,
            eye: Vec3::new(0.0, 0.0, -1.0),
            target: Vec3::zeros(),
            up: Vec3::y(),
            view: Mat4::identity(),
            projection: Mat4::identity(),
            last_frame: None,
            ubos: FrameRotator::new(),
            controller: None,
        };
        camera.update_view();
        camera.update_projection(1.0);
        camera
    }

    /// Attach a flight controller; it drives the view from then on
    #[must_use]
    pub fn with_controller(mut self, controller: FreeFlightController) -> Self {
        self.view = controller.view_matrix();
        self.eye = controller.position();
        self.controller = Some(controller);
        self
    }

    /// Place the camera
    pub fn set_view(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.eye = eye;
        self.target = target;
        self.up = up;
        self.update_view();
    }

    /// Set projection parameters; `aspect` of `None` follows the swapchain
    pub fn set_perspective(&mut self, vertical_fov: f32, aspect: Option<f32>, near: f32, far: f32) {
        self.vertical_fov = vertical_fov;
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self.update_projection(aspect.unwrap_or(1.0));
    }

    /// Eye position
    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    /// Explicit aspect ratio, if any
    pub fn aspect(&self) -> Option<f32> {
        self.aspect
    }

    /// Vertical field of view in radians
    pub fn vertical_fov(&self) -> f32 {
        self.vertical_fov
    }

    /// World to view matrix
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// View to clip matrix, Vulkan conventions
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// `projection * view`
    pub fn projection_view(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Attached controller
    pub fn controller(&self) -> Option<&FreeFlightController> {
        self.controller.as_ref()
    }

    /// Block written for `frame_number`, `None` before the first draw
    pub fn ubo_block(&self, frame_number: u64) -> Option<&CameraUboBlock> {
        self.ubos
            .is_initialized()
            .then(|| self.ubos[frame_number].value())
    }

    /// Uniform buffer binding, one set per frame in flight
    pub fn descriptor_infos(&self, stages: vk::ShaderStageFlags) -> DescriptorInfo {
        let sets = (0..INFLIGHT_FRAME_COUNT as u64)
            .map(|slot| {
                vec![if self.ubos.is_initialized() {
                    self.ubos[slot].descriptor_info()
                } else {
                    vk::DescriptorBufferInfo {
                        buffer: vk::Buffer::null(),
                        offset: 0,
                        range: vk::WHOLE_SIZE,
                    }
                }]
            })
            .collect();
        DescriptorInfo::buffers(vk::DescriptorType::UNIFORM_BUFFER, stages, sets)
    }

    fn update_view(&mut self) {
        self.view = Mat4::look_at(self.eye, self.target, self.up);
    }

    fn update_projection(&mut self, aspect: f32) {
        self.projection = Mat4::perspective(self.vertical_fov, aspect, self.near, self.far)
            * Mat4::vulkan_coordinate_transform();
    }

    fn ensure_ubos(&mut self, context: &Arc<RenderContext>) -> SceneResult<()> {
        if self.ubos.is_initialized() {
            return Ok(());
        }
        self.ubos.init(|slot| ManagedUbo::new(format!("Camera Ubo #{slot}")));
        let result = self.ubos.iter_mut().try_for_each(|ubo| ubo.create(context));
        if result.is_err() {
            self.destroy_ubos();
        }
        result
    }

    fn destroy_ubos(&mut self) {
        if let Some(mut ubos) = self.ubos.reset() {
            for ubo in &mut ubos {
                ubo.destroy();
            }
        }
    }
}

impl OnUpdate for Camera {
    fn on_update(&mut self, info: &FrameUpdateInfo, _ctx: &HookContext<'_>) -> SceneResult<()> {
        if let Some(controller) = self.controller.as_mut() {
            controller.update(info.delta_seconds);
            self.eye = controller.position();
            self.view = controller.view_matrix();
        }
        Ok(())
    }
}

impl OnBeforeDraw for Camera {
    fn on_before_draw(&mut self, info: &FrameRenderInfo, ctx: &HookContext<'_>) -> SceneResult<()> {
        let context = ctx.render_context();
        self.ensure_ubos(context)?;

        let aspect = self.aspect.unwrap_or_else(|| context.aspect_ratio());
        self.update_projection(aspect);

        let current = FrameMatrices {
            projection: self.projection,
            view: self.view,
            projection_view: self.projection * self.view,
        };
        let previous = self.last_frame.unwrap_or(current);
        self.last_frame = Some(current);

        let ubo = &mut self.ubos[info.frame_number];
        *ubo.value_mut() = CameraUboBlock {
            projection: to_columns(&current.projection),
            view: to_columns(&current.view),
            previous_projection: to_columns(&previous.projection),
            previous_view: to_columns(&previous.view),
            projection_view: to_columns(&current.projection_view),
            previous_projection_view: to_columns(&previous.projection_view),
        };
        ubo.update()
    }
}

impl OnEvent for Camera {
    fn on_event(&mut self, event: &Event, _ctx: &HookContext<'_>) {
        if let EventKind::Resized { width, height } = event.kind {
            if height > 0 {
                let aspect = width as f32 / height as f32;
                self.aspect = Some(aspect);
                self.update_projection(aspect);
            }
            return;
        }
        if let Some(controller) = self.controller.as_mut() {
            if controller.handle_event(event) {
                self.eye = controller.position();
                self.view = controller.view_matrix();
            }
        }
    }
}

impl Component for Camera {
    fn as_update(&mut self) -> Option<&mut dyn OnUpdate> {
        Some(self)
    }

    fn as_before_draw(&mut self) -> Option<&mut dyn OnBeforeDraw> {
        Some(self)
    }

    fn as_event(&mut self) -> Option<&mut dyn OnEvent> {
        Some(self)
    }

    fn cleanup(&mut self) {
        self.destroy_ubos();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ubo_block_size() {
        assert_eq!(std::mem::size_of::<CameraUboBlock>(), 6 * 64);
    }

    #[test]
    fn test_view_looks_down_negative_z() {
        let mut camera = Camera::default();
        camera.set_view(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y());
        let origin = camera.view_matrix().transform_point(&crate::foundation::math::Point3::origin());
        assert_relative_eq!(origin.z, -5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_projection_maps_near_and_far_to_unit_depth() {
        let mut camera = Camera::default();
        camera.set_perspective(std::f32::consts::FRAC_PI_2, Some(1.0), 1.0, 100.0);
        camera.set_view(Vec3::zeros(), -Vec3::z(), Vec3::y());

        let clip = |z: f32| {
            let p = camera.projection_view() * crate::foundation::math::Vec4::new(0.0, 0.0, z, 1.0);
            p.z / p.w
        };
        assert_relative_eq!(clip(-1.0), 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip(-100.0), 1.0, epsilon = 1e-4);
    }
}
