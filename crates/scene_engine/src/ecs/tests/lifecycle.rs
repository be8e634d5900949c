use std::cell::RefCell;
use std::rc::Rc;

use super::{host_scene, EXTENT};
use crate::assets::Vertex;
use crate::backend::vulkan::{CommandLog, HostAllocator};
use crate::ecs::components::{Camera, MeshInstance};
use crate::ecs::globals::{DrawDirector, GeometryStore, MaterialBuffer, Primitive, TextureStore};
use crate::ecs::{
    Component, FrameRenderInfo, FrameUpdateInfo, HookContext, OnBeforeDraw, OnDraw, OnEvent, OnUpdate, SceneDrawInfo,
};
use crate::error::{SceneError, SceneResult};
use crate::events::{Event, Key};
use crate::foundation::math::{to_columns, Vec3};
use crate::scene::{Scene, SceneState};

type Log = Rc<RefCell<Vec<String>>>;

/// Records every hook it receives
struct HookRecorder {
    label: &'static str,
    log: Log,
}

impl HookRecorder {
    fn new(label: &'static str, log: &Log) -> Self {
        Self {
            label,
            log: Rc::clone(log),
        }
    }

    fn record(&self, hook: &str) {
        self.log.borrow_mut().push(format!("{}:{hook}", self.label));
    }
}

impl OnUpdate for HookRecorder {
    fn on_update(&mut self, _info: &FrameUpdateInfo, _ctx: &HookContext<'_>) -> SceneResult<()> {
        self.record("update");
        Ok(())
    }
}

impl OnBeforeDraw for HookRecorder {
    fn on_before_draw(&mut self, _info: &FrameRenderInfo, _ctx: &HookContext<'_>) -> SceneResult<()> {
        self.record("before_draw");
        Ok(())
    }
}

impl OnDraw for HookRecorder {
    fn on_draw(&mut self, _info: &mut SceneDrawInfo<'_>, _ctx: &HookContext<'_>) -> SceneResult<()> {
        self.record("draw");
        Ok(())
    }
}

impl OnEvent for HookRecorder {
    fn on_event(&mut self, _event: &Event, _ctx: &HookContext<'_>) {
        self.record("event");
    }
}

impl Component for HookRecorder {
    fn as_update(&mut self) -> Option<&mut dyn OnUpdate> {
        Some(self)
    }

    fn as_before_draw(&mut self) -> Option<&mut dyn OnBeforeDraw> {
        Some(self)
    }

    fn as_draw(&mut self) -> Option<&mut dyn OnDraw> {
        Some(self)
    }

    fn as_event(&mut self) -> Option<&mut dyn OnEvent> {
        Some(self)
    }

    fn cleanup(&mut self) {
        self.record("cleanup");
    }
}

fn take(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.borrow_mut())
}

#[test]
fn test_hooks_run_locals_then_globals_in_attach_order() {
    let (_host, mut scene) = host_scene(HostAllocator::new());
    let log: Log = Rc::default();

    let a = scene.make_node(None);
    let b = scene.make_node(None);
    scene.make_component(a, HookRecorder::new("a1", &log));
    scene.make_global(HookRecorder::new("g1", &log));
    scene.make_component(b, HookRecorder::new("b1", &log));
    scene.make_component(a, HookRecorder::new("a2", &log));

    scene.update(&FrameUpdateInfo::fixed(0, 0.016)).unwrap();
    assert_eq!(take(&log), ["a1:update", "b1:update", "a2:update", "g1:update"]);
    assert_eq!(scene.state(), SceneState::Updating);

    let mut commands = CommandLog::new();
    scene.draw(&FrameRenderInfo::new(0), &mut commands).unwrap();
    assert_eq!(
        take(&log),
        [
            "a1:before_draw",
            "b1:before_draw",
            "a2:before_draw",
            "g1:before_draw",
            "a1:draw",
            "b1:draw",
            "a2:draw",
            "g1:draw",
        ]
    );
    assert_eq!(scene.state(), SceneState::Drawing);

    scene.handle_event(&Event::key_pressed(Key::W, 0.0));
    assert_eq!(take(&log), ["a1:event", "b1:event", "a2:event", "g1:event"]);
}

#[test]
fn test_removed_component_no_longer_dispatched() {
    let (_host, mut scene) = host_scene(HostAllocator::new());
    let log: Log = Rc::default();

    let node = scene.make_node(None);
    let first = scene.make_component(node, HookRecorder::new("first", &log));
    scene.make_component(node, HookRecorder::new("second", &log));

    assert!(scene.remove_component(first));
    assert!(!scene.remove_component(first));
    assert_eq!(take(&log), ["first:cleanup"]);

    scene.update(&FrameUpdateInfo::fixed(0, 0.016)).unwrap();
    assert_eq!(take(&log), ["second:update"]);
    assert!(scene.get_component::<HookRecorder>(node).is_some());
}

#[test]
fn test_removing_node_cleans_its_subtree() {
    let (_host, mut scene) = host_scene(HostAllocator::new());
    let log: Log = Rc::default();

    let parent = scene.make_node(None);
    let child = scene.make_node(Some(parent));
    let other = scene.make_node(None);
    scene.make_component(parent, HookRecorder::new("parent", &log));
    scene.make_component(child, HookRecorder::new("child", &log));
    scene.make_component(other, HookRecorder::new("other", &log));

    scene.remove_node(parent);
    let mut cleaned = take(&log);
    cleaned.sort();
    assert_eq!(cleaned, ["child:cleanup", "parent:cleanup"]);
    assert_eq!(scene.node_count(), 1);
    assert!(scene.node(child).is_none());

    scene.update(&FrameUpdateInfo::fixed(0, 0.016)).unwrap();
    assert_eq!(take(&log), ["other:update"]);
}

/// Captures what the camera on another node exposes during draw
struct CameraObserver {
    seen: Rc<RefCell<Vec<bool>>>,
}

impl OnDraw for CameraObserver {
    fn on_draw(&mut self, info: &mut SceneDrawInfo<'_>, ctx: &HookContext<'_>) -> SceneResult<()> {
        let frame = info.frame().frame_number;
        for (node, _) in ctx.nodes_with_component::<Camera>() {
            let camera = ctx
                .component::<Camera>(node)
                .ok_or_else(|| SceneError::ResourceMissing("camera".to_string()))?;
            let block = camera
                .ubo_block(frame)
                .ok_or_else(|| SceneError::ResourceMissing("camera block".to_string()))?;
            self.seen
                .borrow_mut()
                .push(block.projection_view == to_columns(&camera.projection_view()));
        }
        Ok(())
    }
}

impl Component for CameraObserver {
    fn as_draw(&mut self) -> Option<&mut dyn OnDraw> {
        Some(self)
    }
}

#[test]
fn test_draw_hooks_see_camera_written_in_before_draw() {
    let (_host, mut scene) = host_scene(HostAllocator::new());
    let seen = Rc::new(RefCell::new(Vec::new()));

    // Observer attached first so the camera's before-draw order is not what makes this pass
    let observer = scene.make_node(None);
    scene.make_component(observer, CameraObserver { seen: Rc::clone(&seen) });
    let eye = scene.make_node(None);
    scene.make_component(eye, Camera::default());

    let mut commands = CommandLog::new();
    for frame in 0..3u64 {
        if let Some(camera) = scene.get_component_mut::<Camera>(eye) {
            camera.set_view(Vec3::new(0.0, 1.0, frame as f32 + 2.0), Vec3::zeros(), Vec3::y());
        }
        scene.update(&FrameUpdateInfo::fixed(frame, 0.016)).unwrap();
        scene.draw(&FrameRenderInfo::new(frame), &mut commands).unwrap();
    }

    assert_eq!(*seen.borrow(), vec![true, true, true]);
}

#[test]
fn test_camera_block_carries_previous_frame() {
    let (_host, mut scene) = host_scene(HostAllocator::new());
    let eye = scene.make_node(None);
    scene.make_component(eye, Camera::default());
    let mut commands = CommandLog::new();

    scene.draw(&FrameRenderInfo::new(0), &mut commands).unwrap();
    let first = scene.get_component::<Camera>(eye).unwrap().projection_view();

    scene
        .get_component_mut::<Camera>(eye)
        .unwrap()
        .set_view(Vec3::new(3.0, 0.0, 0.0), Vec3::zeros(), Vec3::y());
    scene.draw(&FrameRenderInfo::new(1), &mut commands).unwrap();

    let camera = scene.get_component::<Camera>(eye).unwrap();
    let block = camera.ubo_block(1).unwrap();
    assert_eq!(block.previous_projection_view, to_columns(&first));
    assert_eq!(block.projection_view, to_columns(&camera.projection_view()));
    assert_ne!(block.projection_view, block.previous_projection_view);

    let aspect = EXTENT.width as f32 / EXTENT.height as f32;
    approx::assert_relative_eq!(camera.aspect().unwrap_or(aspect), aspect);
}

#[test]
fn test_cleanup_of_empty_scene_twice() {
    let (_host, mut scene) = host_scene(HostAllocator::new());

    scene.cleanup(false);
    assert_eq!(scene.node_count(), 0);
    scene.cleanup(false);
    assert_eq!(scene.node_count(), 0);
    assert_eq!(scene.state(), SceneState::Cleaned);
}

#[test]
fn test_double_cleanup_is_harmless() {
    let (host, mut scene) = host_scene(HostAllocator::new());
    let log: Log = Rc::default();

    let node = scene.make_node(None);
    scene.make_component(node, Camera::default());
    scene.make_component(node, HookRecorder::new("recorder", &log));
    scene.draw(&FrameRenderInfo::new(0), &mut CommandLog::new()).unwrap();
    assert!(host.live_buffers() > 0);

    scene.cleanup(false);
    scene.cleanup(false);

    assert_eq!(take(&log), ["recorder:cleanup"]);
    assert_eq!(scene.state(), SceneState::Cleaned);
    assert_eq!(scene.node_count(), 0);
    assert!(scene.globals().is_empty());
    assert_eq!(host.live_buffers(), 0);
    assert_eq!(scene.context().tracker().live_count(), 0);

    drop(scene);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_cleanup_with_reinitialize_restores_default_globals() {
    let (_host, mut scene) = host_scene(HostAllocator::new());
    assert_eq!(scene.state(), SceneState::Uninitialized);

    scene.make_node(None);
    scene.make_global(DrawDirector::new());
    assert_eq!(scene.state(), SceneState::Loaded);

    scene.cleanup(true);
    assert_eq!(scene.state(), SceneState::Loaded);
    assert_eq!(scene.node_count(), 0);
    assert_eq!(scene.globals().len(), 3);
    assert!(scene.global::<MaterialBuffer>().is_some());
    assert!(scene.global::<GeometryStore>().is_some());
    assert!(scene.global::<TextureStore>().is_some());
    assert!(scene.global::<DrawDirector>().is_none());
}

/// Spawns a child of its node on the first update
struct Spawner {
    spawned: bool,
}

impl OnUpdate for Spawner {
    fn on_update(&mut self, _info: &FrameUpdateInfo, ctx: &HookContext<'_>) -> SceneResult<()> {
        if !self.spawned {
            self.spawned = true;
            let parent = ctx.owner_node();
            ctx.defer(move |scene: &mut Scene| {
                scene.make_node(parent);
            });
        }
        Ok(())
    }
}

impl Component for Spawner {
    fn as_update(&mut self) -> Option<&mut dyn OnUpdate> {
        Some(self)
    }
}

#[test]
fn test_deferred_changes_apply_at_next_update() {
    let (_host, mut scene) = host_scene(HostAllocator::new());
    let root = scene.make_node(None);
    scene.make_component(root, Spawner { spawned: false });

    scene.update(&FrameUpdateInfo::fixed(0, 0.016)).unwrap();
    assert_eq!(scene.node_count(), 1);

    scene.update(&FrameUpdateInfo::fixed(1, 0.016)).unwrap();
    assert_eq!(scene.node_count(), 2);
    assert_eq!(scene.node(root).unwrap().children().len(), 1);
    assert!(scene.draw_plan_dirty());
}

#[test]
fn test_deferred_changes_apply_when_only_drawing() {
    let (_host, mut scene) = host_scene(HostAllocator::new());
    let root = scene.make_node(None);
    scene.make_component(root, Spawner { spawned: false });

    scene.update(&FrameUpdateInfo::fixed(0, 0.016)).unwrap();
    assert_eq!(scene.node_count(), 1);

    // Paused simulation: frames keep drawing without updates
    scene.draw(&FrameRenderInfo::new(0), &mut CommandLog::new()).unwrap();
    assert_eq!(scene.node_count(), 2);
    assert_eq!(scene.node(root).unwrap().children().len(), 1);
    assert!(!scene.draw_plan_dirty());
}

#[test]
fn test_resize_event_reaches_camera() {
    let (_host, mut scene) = host_scene(HostAllocator::new());
    let node = scene.make_node(None);
    scene.make_component(node, Camera::default());

    scene.handle_event(&Event::resized(800, 400, 0.0));
    let camera = scene.get_component::<Camera>(node).unwrap();
    approx::assert_relative_eq!(camera.aspect().unwrap(), 2.0);
}

fn triangle() -> Vec<Vertex> {
    vec![
        Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
        Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
    ]
}

const GEOMETRY_BYTES: u64 = std::mem::size_of::<Vertex>() as u64 * 3 + 4 * 3;
const TRANSFORM_BYTES: u64 = 64;

#[test]
fn test_failed_transform_allocation_releases_every_slot() {
    // Room for the geometry and one transform slot, not the second
    let (host, mut scene) = host_scene(HostAllocator::with_budget(GEOMETRY_BYTES + TRANSFORM_BYTES));

    let mesh = scene
        .with_global_mut::<GeometryStore, _>(|store, context| -> SceneResult<_> {
            let set = store.create_buffer_set(context, "tri", triangle(), vec![0, 1, 2])?;
            Ok(store.create_mesh(
                "tri",
                set,
                vec![Primitive {
                    first_index: 0,
                    index_count: 3,
                    vertex_count: 3,
                    material_index: -1,
                }],
            ))
        })
        .unwrap()
        .unwrap();
    scene.make_global(DrawDirector::new());
    let node = scene.make_node(None);
    scene.make_component(node, MeshInstance::new(mesh));

    let result = scene.draw(&FrameRenderInfo::new(0), &mut CommandLog::new());
    assert!(matches!(result, Err(SceneError::AllocationFailed { .. })));
    assert_eq!(host.live_buffers(), 2);
    assert_eq!(host.used_bytes(), GEOMETRY_BYTES);

    scene.cleanup(false);
    assert_eq!(host.live_buffers(), 0);
    assert_eq!(scene.context().tracker().live_count(), 0);
}

#[test]
fn test_failed_geometry_upload_leaves_nothing_behind() {
    let (host, mut scene) = host_scene(HostAllocator::with_budget(GEOMETRY_BYTES - 1));

    let result = scene
        .with_global_mut::<GeometryStore, _>(|store, context| {
            store.create_buffer_set(context, "tri", triangle(), vec![0, 1, 2])
        })
        .unwrap();
    assert!(matches!(result, Err(SceneError::AllocationFailed { .. })));
    assert_eq!(host.live_buffers(), 0);
    assert_eq!(scene.global::<GeometryStore>().unwrap().buffer_set_count(), 0);
}
