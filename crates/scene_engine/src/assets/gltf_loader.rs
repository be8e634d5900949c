//! glTF to scene conversion
//!
//! Parsing is delegated to the `gltf` crate. This module turns the parsed
//! document into scene content: textures, materials, one geometry buffer set
//! holding every mesh, node hierarchy with mesh instances and cameras.
//!
//! Problems with single elements (an image in a format we cannot upload, a
//! primitive that is not a triangle list, a node reached twice) are logged,
//! recorded in the [`LoadReport`] and the element is skipped. Failing to parse
//! the file at all, or running out of GPU memory, aborts the load; in the
//! latter case the scene is cleaned before the error is returned.

use std::path::Path;

use ash::vk;
use gltf::image::Format;

use super::Vertex;
use crate::core::{CameraConfig, LoaderConfig};
use crate::ecs::components::{Camera, MeshInstance};
use crate::ecs::globals::{
    AlphaMode, DrawDirector, GeometryStore, Material, MaterialBuffer, Primitive, SamplerDesc, TextureStore,
    DEFAULT_ALPHA_CUTOFF,
};
use crate::error::{SceneError, SceneResult};
use crate::foundation::collections::{MeshKey, NodeKey};
use crate::foundation::math::{Mat4, Point3, Transform, Vec3};
use crate::scene::Scene;

/// Outcome of a successful load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Textures uploaded
    pub textures: usize,
    /// Materials converted
    pub materials: usize,
    /// Meshes created
    pub meshes: usize,
    /// Primitives converted across all meshes
    pub primitives: usize,
    /// Nodes created
    pub nodes: usize,
    /// Camera components created
    pub cameras: usize,
    /// One entry per skipped element
    pub warnings: Vec<String>,
}

impl LoadReport {
    /// Whether anything was skipped
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// One line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} nodes, {} meshes ({} primitives), {} materials, {} textures, {} cameras, {} warnings",
            self.nodes,
            self.meshes,
            self.primitives,
            self.materials,
            self.textures,
            self.cameras,
            self.warnings.len()
        )
    }
}

/// Load a `.gltf` or `.glb` file into `scene`, replacing its content
pub fn load_gltf(scene: &mut Scene, path: impl AsRef<Path>) -> SceneResult<LoadReport> {
    let path = path.as_ref();
    log::debug!("Loading glTF from {}", path.display());
    let imported = gltf::import(path).map_err(|err| import_error(&path.display().to_string(), &err))?;
    convert(scene, imported, &path.display().to_string())
}

/// Load glTF or GLB bytes into `scene`, replacing its content
///
/// External buffer and image URIs cannot be resolved; embedded data URIs can.
pub fn load_gltf_slice(scene: &mut Scene, bytes: &[u8]) -> SceneResult<LoadReport> {
    let imported = gltf::import_slice(bytes).map_err(|err| import_error("<memory>", &err))?;
    convert(scene, imported, "<memory>")
}

type Imported = (gltf::Document, Vec<gltf::buffer::Data>, Vec<gltf::image::Data>);

fn import_error(source: &str, err: &gltf::Error) -> SceneError {
    log::error!("glTF import of {source} failed: {err}");
    SceneError::AssetLoad {
        path: source.to_string(),
        message: err.to_string(),
    }
}

fn convert(scene: &mut Scene, (document, buffers, images): Imported, source: &str) -> SceneResult<LoadReport> {
    scene.cleanup(true);

    let mut converter = ModelConverter {
        loader: scene.config().loader.clone(),
        camera: scene.config().camera,
        document: &document,
        buffers: &buffers,
        images: &images,
        texture_map: Vec::new(),
        mesh_map: Vec::new(),
        node_map: vec![None; document.nodes().len()],
        report: LoadReport::default(),
    };

    match converter.run(scene) {
        Ok(()) => {
            scene.mark_loaded();
            log::info!("Loaded {source}: {}", converter.report.summary());
            Ok(converter.report)
        }
        Err(err) => {
            log::error!("Loading {source} failed, scene cleaned: {err}");
            scene.cleanup(true);
            Err(err)
        }
    }
}

struct ModelConverter<'a> {
    loader: LoaderConfig,
    camera: CameraConfig,
    document: &'a gltf::Document,
    buffers: &'a [gltf::buffer::Data],
    images: &'a [gltf::image::Data],
    texture_map: Vec<i32>,
    mesh_map: Vec<Option<MeshKey>>,
    node_map: Vec<Option<NodeKey>>,
    report: LoadReport,
}

impl<'a> ModelConverter<'a> {
    fn warn(&mut self, message: String) {
        log::warn!("{message}");
        self.report.warnings.push(message);
    }

    fn run(&mut self, scene: &mut Scene) -> SceneResult<()> {
        self.load_textures(scene)?;
        self.load_materials(scene)?;
        self.load_meshes(scene)?;

        let cameras = self.load_nodes(scene);
        if self.loader.create_cameras {
            self.load_cameras(scene, &cameras);
        }

        if self.loader.create_draw_director && scene.global::<DrawDirector>().is_none() {
            scene.make_global(DrawDirector::new());
        }
        scene.refresh_draw_plan()
    }

    fn load_textures(&mut self, scene: &mut Scene) -> SceneResult<()> {
        let (document, images) = (self.document, self.images);
        for texture in document.textures() {
            let image_index = texture.source().index();
            let name = texture
                .name()
                .map_or_else(|| format!("Texture #{}", texture.index()), str::to_string);

            let Some(rgba) = images.get(image_index).and_then(to_rgba8) else {
                let format = images.get(image_index).map(|image| image.format);
                self.warn(format!("Texture '{name}': image {image_index} has unsupported format {format:?}, skipped"));
                self.texture_map.push(-1);
                continue;
            };
            let image = &images[image_index];
            let extent = vk::Extent2D {
                width: image.width,
                height: image.height,
            };
            let sampler = sampler_desc(&texture.sampler());

            let index = scene
                .with_global_mut::<TextureStore, _>(|store, context| {
                    store.create_texture(context, name, extent, &rgba, sampler)
                })
                .ok_or_else(|| SceneError::ResourceMissing("TextureStore".to_string()))??;
            self.texture_map.push(index as i32);
            self.report.textures += 1;
        }
        Ok(())
    }

    fn texture_ref(&mut self, material: &str, slot: &str, texture: Option<usize>) -> i32 {
        let Some(texture) = texture else {
            return -1;
        };
        match self.texture_map.get(texture).copied() {
            Some(index) if index >= 0 => index,
            _ => {
                self.warn(format!("Material '{material}': {slot} texture {texture} is unavailable, ignored"));
                -1
            }
        }
    }

    fn load_materials(&mut self, scene: &mut Scene) -> SceneResult<()> {
        let mut materials = Vec::new();
        let document = self.document;
        for source in document.materials() {
            let name = source
                .name()
                .map_or_else(|| format!("Material #{}", materials.len()), str::to_string);
            let pbr = source.pbr_metallic_roughness();

            let base_color_texture = pbr.base_color_texture().map(|info| info.texture().index());
            let metallic_roughness_texture = pbr.metallic_roughness_texture().map(|info| info.texture().index());
            let normal_texture = source.normal_texture().map(|info| info.texture().index());
            let emissive_texture = source.emissive_texture().map(|info| info.texture().index());

            materials.push(Material {
                base_color_factor: pbr.base_color_factor(),
                emissive_factor: source.emissive_factor(),
                metallic_factor: pbr.metallic_factor(),
                roughness_factor: pbr.roughness_factor(),
                alpha_mode: match source.alpha_mode() {
                    gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
                    gltf::material::AlphaMode::Mask => AlphaMode::Mask,
                    gltf::material::AlphaMode::Blend => AlphaMode::Blend,
                },
                alpha_cutoff: source.alpha_cutoff().unwrap_or(DEFAULT_ALPHA_CUTOFF),
                double_sided: source.double_sided(),
                base_color_texture: self.texture_ref(&name, "base color", base_color_texture),
                metallic_roughness_texture: self.texture_ref(&name, "metallic roughness", metallic_roughness_texture),
                normal_texture: self.texture_ref(&name, "normal", normal_texture),
                emissive_texture: self.texture_ref(&name, "emissive", emissive_texture),
                name,
            });
        }

        self.report.materials = materials.len();
        scene
            .with_global_mut::<MaterialBuffer, _>(|buffer, context| {
                *buffer.materials_mut() = materials;
                buffer.update_buffer(context)
            })
            .ok_or_else(|| SceneError::ResourceMissing("MaterialBuffer".to_string()))?
    }

    fn load_meshes(&mut self, scene: &mut Scene) -> SceneResult<()> {
        let mut vertices: Vec<Vertex> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut meshes: Vec<(String, Vec<Primitive>)> = Vec::new();
        let buffers = self.buffers;

        let document = self.document;
        for mesh in document.meshes() {
            let name = mesh
                .name()
                .map_or_else(|| format!("Mesh #{}", mesh.index()), str::to_string);
            let mut primitives = Vec::new();

            for (primitive_index, primitive) in mesh.primitives().enumerate() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    self.warn(format!(
                        "Mesh '{name}' primitive {primitive_index}: mode {:?} is not a triangle list, skipped",
                        primitive.mode()
                    ));
                    continue;
                }
                let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
                let Some(positions) = reader.read_positions() else {
                    self.warn(format!("Mesh '{name}' primitive {primitive_index}: no positions, skipped"));
                    continue;
                };

                let base_vertex = vertices.len() as u32;
                let first_index = indices.len() as u32;
                let first_new = vertices.len();
                vertices.extend(positions.map(|position| Vertex::new(position, [0.0, 0.0, 1.0], [0.0, 0.0])));
                let vertex_count = (vertices.len() - first_new) as u32;

                if let Some(normals) = reader.read_normals() {
                    for (vertex, normal) in vertices[first_new..].iter_mut().zip(normals) {
                        vertex.normal = normal;
                    }
                }
                if let Some(uvs) = reader.read_tex_coords(0) {
                    for (vertex, uv) in vertices[first_new..].iter_mut().zip(uvs.into_f32()) {
                        vertex.uv = uv;
                    }
                }
                if let Some(tangents) = reader.read_tangents() {
                    for (vertex, tangent) in vertices[first_new..].iter_mut().zip(tangents) {
                        vertex.tangent = tangent;
                    }
                }

                match reader.read_indices() {
                    Some(read) => indices.extend(read.into_u32().map(|index| index + base_vertex)),
                    None => indices.extend(base_vertex..base_vertex + vertex_count),
                }

                primitives.push(Primitive {
                    first_index,
                    index_count: indices.len() as u32 - first_index,
                    vertex_count,
                    material_index: primitive.material().index().map_or(-1, |index| index as i32),
                });
            }
            meshes.push((name, primitives));
        }

        if meshes.is_empty() {
            return Ok(());
        }

        let mut keys = Vec::with_capacity(meshes.len());
        let mut primitive_total = 0;
        scene
            .with_global_mut::<GeometryStore, _>(|store, context| -> SceneResult<()> {
                let buffer_set = store.create_buffer_set(context, "Scene geometry", vertices, indices)?;
                for (name, primitives) in meshes {
                    primitive_total += primitives.len();
                    keys.push(Some(store.create_mesh(name, buffer_set, primitives)));
                }
                Ok(())
            })
            .ok_or_else(|| SceneError::ResourceMissing("GeometryStore".to_string()))??;

        self.report.meshes = keys.len();
        self.report.primitives = primitive_total;
        self.mesh_map = keys;
        Ok(())
    }

    fn select_scene(&mut self) -> Option<gltf::Scene<'a>> {
        let document = self.document;
        if let Some(index) = self.loader.scene_index {
            match document.scenes().nth(index) {
                Some(selected) => return Some(selected),
                None => self.warn(format!(
                    "Scene index {index} out of range ({} scenes), using the default scene",
                    document.scenes().len()
                )),
            }
        }
        document.default_scene().or_else(|| document.scenes().next())
    }

    /// Build the node hierarchy; returns nodes that carry a glTF camera
    fn load_nodes(&mut self, scene: &mut Scene) -> Vec<(NodeKey, gltf::Camera<'a>)> {
        let document = self.document;
        let Some(selected) = self.select_scene() else {
            self.warn("Document contains no scenes, no nodes created".to_string());
            return Vec::new();
        };
        let roots: Vec<usize> = selected.nodes().map(|node| node.index()).collect();

        let mut cameras = Vec::new();
        let mut stack: Vec<(usize, Option<NodeKey>)> = roots.into_iter().rev().map(|index| (index, None)).collect();
        while let Some((index, parent)) = stack.pop() {
            let Some(source) = document.nodes().nth(index) else {
                continue;
            };
            if self.node_map[index].is_some() {
                self.warn(format!("Node {index} is reachable more than once, later occurrence skipped"));
                continue;
            }

            let key = scene.make_node(parent);
            self.node_map[index] = Some(key);
            self.report.nodes += 1;
            if let Some(node) = scene.node_mut(key) {
                node.transform = match source.transform() {
                    gltf::scene::Transform::Matrix { matrix } => Transform::from_matrix(&Mat4::from(matrix)),
                    gltf::scene::Transform::Decomposed {
                        translation,
                        rotation,
                        scale,
                    } => Transform::from_trs(translation, rotation, scale),
                };
                node.name = source.name().map(str::to_string);
            }

            if let Some(mesh) = source.mesh() {
                match self.mesh_map.get(mesh.index()).copied().flatten() {
                    Some(mesh_key) => {
                        scene.make_component(key, MeshInstance::new(mesh_key));
                    }
                    None => self.warn(format!("Node {index}: mesh {} was not converted", mesh.index())),
                }
            }
            if let Some(camera) = source.camera() {
                cameras.push((key, camera));
            }

            let children: Vec<usize> = source.children().map(|child| child.index()).collect();
            stack.extend(children.into_iter().rev().map(|child| (child, Some(key))));
        }
        cameras
    }

    fn load_cameras(&mut self, scene: &mut Scene, cameras: &[(NodeKey, gltf::Camera<'a>)]) {
        for (node, source) in cameras {
            let gltf::camera::Projection::Perspective(perspective) = source.projection() else {
                self.warn(format!("Camera {}: orthographic projection not supported, skipped", source.index()));
                continue;
            };
            let Some(world) = scene.tree().world_matrix(*node) else {
                continue;
            };

            let eye = world.transform_point(&Point3::origin());
            let forward = world.transform_vector(&-Vec3::z());
            let up = world.transform_vector(&Vec3::y());

            let mut camera = Camera::new(&self.camera);
            camera.set_perspective(
                perspective.yfov(),
                perspective.aspect_ratio(),
                perspective.znear(),
                perspective.zfar().unwrap_or(self.camera.far_plane),
            );
            camera.set_view(eye.coords, eye.coords + forward, up);
            scene.make_component(*node, camera);
            self.report.cameras += 1;
        }
    }
}

fn to_rgba8(image: &gltf::image::Data) -> Option<Vec<u8>> {
    let (width, height) = (image.width, image.height);
    let pixels = image.pixels.clone();
    let dynamic = match image.format {
        Format::R8G8B8A8 => return Some(pixels),
        Format::R8G8B8 => image::DynamicImage::ImageRgb8(image::RgbImage::from_raw(width, height, pixels)?),
        Format::R8G8 => image::DynamicImage::ImageLumaA8(image::GrayAlphaImage::from_raw(width, height, pixels)?),
        Format::R8 => image::DynamicImage::ImageLuma8(image::GrayImage::from_raw(width, height, pixels)?),
        _ => return None,
    };
    Some(dynamic.into_rgba8().into_raw())
}

fn sampler_desc(sampler: &gltf::texture::Sampler<'_>) -> SamplerDesc {
    use gltf::texture::{MagFilter, MinFilter, WrappingMode};

    let address = |mode: WrappingMode| match mode {
        WrappingMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        WrappingMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        WrappingMode::Repeat => vk::SamplerAddressMode::REPEAT,
    };
    let (min_filter, mipmap_mode) = match sampler.min_filter() {
        Some(MinFilter::Nearest | MinFilter::NearestMipmapNearest) => {
            (vk::Filter::NEAREST, vk::SamplerMipmapMode::NEAREST)
        }
        Some(MinFilter::NearestMipmapLinear) => (vk::Filter::NEAREST, vk::SamplerMipmapMode::LINEAR),
        Some(MinFilter::LinearMipmapNearest) => (vk::Filter::LINEAR, vk::SamplerMipmapMode::NEAREST),
        Some(MinFilter::Linear | MinFilter::LinearMipmapLinear) | None => {
            (vk::Filter::LINEAR, vk::SamplerMipmapMode::LINEAR)
        }
    };

    SamplerDesc {
        mag_filter: match sampler.mag_filter() {
            Some(MagFilter::Nearest) => vk::Filter::NEAREST,
            Some(MagFilter::Linear) | None => vk::Filter::LINEAR,
        },
        min_filter,
        mipmap_mode,
        address_mode_u: address(sampler.wrap_s()),
        address_mode_v: address(sampler.wrap_t()),
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;

    use super::*;
    use crate::core::SceneConfig;
    use crate::scene::SceneState;

    /// Three vertices and u16 indices, embedded as a data URI
    fn triangle_gltf(extra_primitive: &str) -> Vec<u8> {
        let mut bytes = Vec::new();
        for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        for index in [0u16, 1, 2] {
            bytes.extend_from_slice(&index.to_le_bytes());
        }
        let uri = format!(
            "data:application/octet-stream;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        );

        format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [ {{ "nodes": [0, 2] }} ],
  "nodes": [
    {{ "name": "parent", "mesh": 0, "translation": [1.0, 0.0, 0.0], "children": [1] }},
    {{ "name": "child", "mesh": 0 }},
    {{ "name": "eye", "camera": 0, "translation": [0.0, 0.0, 5.0] }}
  ],
  "cameras": [ {{ "type": "perspective", "perspective": {{ "yfov": 0.8, "znear": 0.1, "zfar": 100.0 }} }} ],
  "materials": [ {{ "name": "red", "pbrMetallicRoughness": {{ "baseColorFactor": [1.0, 0.0, 0.0, 1.0] }} }} ],
  "meshes": [ {{ "name": "triangle", "primitives": [
    {{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "material": 0 }}{extra_primitive}
  ] }} ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
  ],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }}
  ],
  "buffers": [ {{ "byteLength": 42, "uri": "{uri}" }} ]
}}"#
        )
        .into_bytes()
    }

    fn headless(config: SceneConfig) -> Scene {
        Scene::headless(vk::Extent2D { width: 640, height: 480 }, config)
    }

    #[test]
    fn test_loads_hierarchy_meshes_and_camera() {
        let mut scene = headless(SceneConfig::default());
        let report = load_gltf_slice(&mut scene, &triangle_gltf("")).unwrap();

        assert_eq!(report.nodes, 3);
        assert_eq!(report.meshes, 1);
        assert_eq!(report.primitives, 1);
        assert_eq!(report.materials, 1);
        assert_eq!(report.cameras, 1);
        assert!(!report.has_warnings());
        assert_eq!(scene.state(), SceneState::Loaded);
        assert!(!scene.draw_plan_dirty());

        let parent = scene.node_by_index(0).unwrap();
        let child = scene.node_by_index(1).unwrap();
        let eye = scene.node_by_index(2).unwrap();
        assert_eq!(scene.node(child).unwrap().parent(), Some(parent));
        assert_eq!(scene.root_nodes(), &[parent, eye]);
        assert_eq!(scene.node(parent).unwrap().name.as_deref(), Some("parent"));

        let geometry = scene.global::<GeometryStore>().unwrap();
        let (_, mesh) = geometry.meshes().next().unwrap();
        assert_eq!(mesh.primitives[0].index_count, 3);
        assert_eq!(mesh.primitives[0].material_index, 0);
        assert_eq!(geometry.buffer_set(mesh.buffer_set).unwrap().indices(), &[0, 1, 2]);

        let materials = scene.global::<MaterialBuffer>().unwrap();
        assert_eq!(materials.materials()[0].base_color_factor, [1.0, 0.0, 0.0, 1.0]);

        let director = scene.global::<DrawDirector>().unwrap();
        assert_eq!(director.draw_ops().len(), 1);
        assert_eq!(director.draw_ops()[0].instances, vec![parent, child]);

        let camera = scene.get_component::<Camera>(eye).unwrap();
        approx::assert_relative_eq!(camera.eye(), Vec3::new(0.0, 0.0, 5.0), epsilon = 1e-5);
        approx::assert_relative_eq!(camera.vertical_fov(), 0.8);
    }

    #[test]
    fn test_non_triangle_primitive_is_skipped_with_warning() {
        let mut scene = headless(SceneConfig::default());
        let points = r#", { "attributes": { "POSITION": 0 }, "mode": 0 }"#;
        let report = load_gltf_slice(&mut scene, &triangle_gltf(points)).unwrap();

        assert_eq!(report.primitives, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("not a triangle list"));
    }

    #[test]
    fn test_out_of_range_scene_index_falls_back_to_default() {
        let mut config = SceneConfig::default();
        config.loader.scene_index = Some(4);
        let mut scene = headless(config);

        let report = load_gltf_slice(&mut scene, &triangle_gltf("")).unwrap();
        assert_eq!(report.nodes, 3);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("out of range"));
    }

    #[test]
    fn test_loader_options_disable_director_and_cameras() {
        let mut config = SceneConfig::default();
        config.loader.create_draw_director = false;
        config.loader.create_cameras = false;
        let mut scene = headless(config);

        let report = load_gltf_slice(&mut scene, &triangle_gltf("")).unwrap();
        assert_eq!(report.cameras, 0);
        assert!(scene.global::<DrawDirector>().is_none());
        assert!(scene.find_nodes_with_component::<Camera>().is_empty());
        assert_eq!(scene.find_nodes_with_component::<MeshInstance>().len(), 2);
    }

    #[test]
    fn test_reload_replaces_previous_content() {
        let mut scene = headless(SceneConfig::default());
        load_gltf_slice(&mut scene, &triangle_gltf("")).unwrap();
        load_gltf_slice(&mut scene, &triangle_gltf("")).unwrap();

        assert_eq!(scene.node_count(), 3);
        assert_eq!(scene.global::<GeometryStore>().unwrap().mesh_count(), 1);
        assert_eq!(scene.global::<GeometryStore>().unwrap().buffer_set_count(), 1);
    }

    #[test]
    fn test_unparseable_input_leaves_scene_untouched() {
        let mut scene = headless(SceneConfig::default());
        let node = scene.make_node(None);

        let result = load_gltf_slice(&mut scene, b"{ not gltf");
        assert!(matches!(result, Err(SceneError::AssetLoad { .. })));
        assert!(scene.node(node).is_some());
        assert_eq!(scene.node_count(), 1);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.gltf");
        let mut scene = headless(SceneConfig::default());

        match load_gltf(&mut scene, &path) {
            Err(SceneError::AssetLoad { path: reported, .. }) => assert!(reported.ends_with("absent.gltf")),
            other => panic!("expected AssetLoad, got {other:?}"),
        }
    }

    #[test]
    fn test_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triangle.gltf");
        std::fs::write(&path, triangle_gltf("")).unwrap();

        let mut scene = headless(SceneConfig::default());
        let report = load_gltf(&mut scene, &path).unwrap();
        assert_eq!(report.nodes, 3);
        assert!(report.summary().starts_with("3 nodes, 1 meshes"));
    }
}
