//! glTF 2.0 source adapter.
//!
//! Converts a `.gltf`/`.glb` document into a [`SourceScene`]. Each glTF
//! primitive becomes one source mesh; a node referencing a glTF mesh with
//! several primitives therefore references several source meshes and the
//! importer splits it into `<name>-<index>` children.
//!
//! Buffers must be embedded (GLB blob or data URIs). Images stored in the
//! file become embedded textures (`*N`); external image URIs are passed
//! through as file references for the texture resolver.

use std::collections::{HashMap, HashSet};

use base64::Engine;
use gltf_dep::animation::util::ReadOutputs;
use gltf_dep::khr_lights_punctual::Kind;

use crate::math::{Mat4, Vec4, mat4_from_cols_array};
use crate::scene::{AnimationBehavior, Key};
use crate::texture::{FilterMode, SamplerSettings, WrapMode};

use super::ImportError;
use super::registry::SceneLoader;
use super::source::{
    EmbeddedTexture, IDENTITY, ShadingWorkflow, SourceAnimation, SourceBone, SourceCamera,
    SourceChannel, SourceLight, SourceLightKind, SourceMaterial, SourceMesh, SourceMorphTarget,
    SourceNode, SourceScene, SourceTexture, TextureKind, VertexWeight,
};

/// Loader for `.gltf` and `.glb` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfSceneLoader;

impl SceneLoader for GltfSceneLoader {
    fn name(&self) -> &str {
        "glTF"
    }

    fn load(&self, bytes: &[u8], name: &str) -> Result<SourceScene, ImportError> {
        crate::profile_function!();
        let parse_error = |message: String| ImportError::Parse {
            name: name.to_string(),
            message,
        };
        let gltf = gltf_dep::Gltf::from_slice(bytes).map_err(|e| parse_error(e.to_string()))?;
        let buffers = resolve_buffers(&gltf.document, gltf.blob.clone()).map_err(parse_error)?;
        let mut ctx = LoadContext::new(&gltf.document, buffers);
        ctx.load_materials();
        ctx.load_meshes();
        let root = ctx.load_scene(name)?;
        let animations = ctx.load_animations();
        Ok(SourceScene {
            root,
            meshes: ctx.meshes,
            materials: ctx.materials,
            lights: ctx.lights,
            cameras: ctx.cameras,
            animations,
            textures: ctx.textures,
        })
    }
}

struct LoadContext<'d> {
    document: &'d gltf_dep::Document,
    buffers: Vec<Vec<u8>>,
    /// Name used for each glTF node; unnamed nodes that are referenced by
    /// name (joints, animation targets, lights) get a synthetic one.
    node_names: Vec<Option<String>>,
    /// glTF mesh index → source mesh indices (one per primitive).
    mesh_map: Vec<Vec<usize>>,
    /// glTF image index → embedded texture index.
    embedded: HashMap<usize, usize>,
    meshes: Vec<SourceMesh>,
    materials: Vec<SourceMaterial>,
    lights: Vec<SourceLight>,
    cameras: Vec<SourceCamera>,
    textures: Vec<EmbeddedTexture>,
}

impl<'d> LoadContext<'d> {
    fn new(document: &'d gltf_dep::Document, buffers: Vec<Vec<u8>>) -> Self {
        let mut referenced = HashSet::new();
        for skin in document.skins() {
            referenced.extend(skin.joints().map(|j| j.index()));
        }
        for animation in document.animations() {
            referenced.extend(animation.channels().map(|c| c.target().node().index()));
        }
        for node in document.nodes() {
            if node.light().is_some() {
                referenced.insert(node.index());
            }
        }
        let node_names = document
            .nodes()
            .map(|node| match node.name() {
                Some(name) if !name.is_empty() => Some(name.to_string()),
                _ if referenced.contains(&node.index()) => Some(format!("node{}", node.index())),
                _ => None,
            })
            .collect();
        Self {
            document,
            buffers,
            node_names,
            mesh_map: Vec::new(),
            embedded: HashMap::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
            lights: Vec::new(),
            cameras: Vec::new(),
            textures: Vec::new(),
        }
    }

    fn node_name(&self, index: usize) -> Option<String> {
        self.node_names.get(index).cloned().flatten()
    }

    fn buffer(&self, buffer: gltf_dep::Buffer<'_>) -> Option<&[u8]> {
        self.buffers.get(buffer.index()).map(Vec::as_slice)
    }

    fn load_materials(&mut self) {
        let document = self.document;
        for material in document.materials() {
            let pbr = material.pbr_metallic_roughness();
            let mut textures = Vec::new();
            if let Some(info) = pbr.base_color_texture() {
                textures.push(self.texture(TextureKind::Diffuse, &info.texture(), info.tex_coord()));
            }
            if let Some(info) = pbr.metallic_roughness_texture() {
                textures.push(self.texture(
                    TextureKind::MetallicRoughness,
                    &info.texture(),
                    info.tex_coord(),
                ));
            }
            if let Some(normal) = material.normal_texture() {
                textures.push(self.texture(TextureKind::Normal, &normal.texture(), normal.tex_coord()));
            }
            if let Some(occlusion) = material.occlusion_texture() {
                textures.push(self.texture(
                    TextureKind::Occlusion,
                    &occlusion.texture(),
                    occlusion.tex_coord(),
                ));
            }
            if let Some(info) = material.emissive_texture() {
                textures.push(self.texture(TextureKind::Emissive, &info.texture(), info.tex_coord()));
            }
            let [er, eg, eb] = material.emissive_factor();
            let base = pbr.base_color_factor();
            let opacity = (material.alpha_mode() == gltf_dep::material::AlphaMode::Blend)
                .then_some(base[3]);
            self.materials.push(SourceMaterial {
                name: material.name().map(String::from),
                textures,
                diffuse: Some(base),
                specular: None,
                ambient: None,
                emissive: Some([er, eg, eb, 1.0]),
                opacity,
                shininess: None,
                workflow: ShadingWorkflow::MetallicRoughness {
                    metallic: pbr.metallic_factor(),
                    roughness: pbr.roughness_factor(),
                },
            });
        }
    }

    fn texture(
        &mut self,
        kind: TextureKind,
        texture: &gltf_dep::Texture<'_>,
        tex_coord: u32,
    ) -> SourceTexture {
        let image = texture.source();
        let path = match image.source() {
            gltf_dep::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => uri.to_string(),
            source => {
                let slot = match self.embedded.get(&image.index()).copied() {
                    Some(slot) => slot,
                    None => {
                        let (bytes, hint) = match source {
                            gltf_dep::image::Source::View { view, mime_type } => {
                                let bytes = self
                                    .buffer(view.buffer())
                                    .and_then(|b| b.get(view.offset()..view.offset() + view.length()))
                                    .map(<[u8]>::to_vec)
                                    .unwrap_or_default();
                                (bytes, Some(mime_type))
                            }
                            gltf_dep::image::Source::Uri { uri, mime_type } => {
                                (parse_data_uri(uri).unwrap_or_default(), mime_type)
                            }
                        };
                        self.textures.push(EmbeddedTexture {
                            bytes,
                            format_hint: hint.map(|m| m.trim_start_matches("image/").to_string()),
                        });
                        let slot = self.textures.len() - 1;
                        self.embedded.insert(image.index(), slot);
                        slot
                    }
                };
                format!("*{slot}")
            }
        };
        let sampler = texture.sampler();
        SourceTexture {
            kind,
            path,
            uv_index: tex_coord as usize,
            sampler: SamplerSettings {
                min_filter: sampler.min_filter().map_or(FilterMode::Linear, map_min_filter),
                mag_filter: sampler.mag_filter().map_or(FilterMode::Linear, map_mag_filter),
                wrap_s: map_wrapping(sampler.wrap_s()),
                wrap_t: map_wrapping(sampler.wrap_t()),
            },
        }
    }

    fn load_meshes(&mut self) {
        let document = self.document;
        // Skin used by each glTF mesh: the skin of the first node drawing it.
        let mut mesh_skins: HashMap<usize, gltf_dep::Skin<'_>> = HashMap::new();
        for node in document.nodes() {
            if let (Some(mesh), Some(skin)) = (node.mesh(), node.skin()) {
                mesh_skins.entry(mesh.index()).or_insert(skin);
            }
        }

        for mesh in document.meshes() {
            let mut indices = Vec::new();
            let bones = mesh_skins.get(&mesh.index()).map(|skin| self.skin_bones(skin));
            for (p, primitive) in mesh.primitives().enumerate() {
                if primitive.mode() != gltf_dep::mesh::Mode::Triangles {
                    log::warn!(
                        "mesh {} primitive {p}: {:?} topology imported as triangles",
                        mesh.index(),
                        primitive.mode()
                    );
                }
                let reader = primitive.reader(|b| self.buffer(b));
                let positions: Vec<[f32; 3]> =
                    reader.read_positions().map(Iterator::collect).unwrap_or_default();
                let normals = reader.read_normals().map(Iterator::collect).unwrap_or_default();
                let tangents = reader
                    .read_tangents()
                    .map(|it| it.map(|[x, y, z, _]| [x, y, z]).collect())
                    .unwrap_or_default();
                let texcoords = (0..)
                    .map_while(|set| reader.read_tex_coords(set))
                    .map(|uv| uv.into_f32().collect())
                    .collect();
                let colors = (0..)
                    .map_while(|set| reader.read_colors(set))
                    .map(|c| c.into_rgba_f32().collect())
                    .collect();
                let mesh_indices = reader
                    .read_indices()
                    .map(|i| i.into_u32().collect())
                    .unwrap_or_default();

                let mut source_bones = Vec::new();
                if let Some(bones) = &bones
                    && let (Some(joints), Some(weights)) = (reader.read_joints(0), reader.read_weights(0))
                {
                    source_bones = bones.clone();
                    for (vertex, (joint, weight)) in joints.into_u16().zip(weights.into_f32()).enumerate() {
                        for (j, w) in joint.iter().zip(weight) {
                            if w <= 0.0 {
                                continue;
                            }
                            if let Some(bone) = source_bones.get_mut(*j as usize) {
                                bone.weights.push(VertexWeight {
                                    vertex: vertex as u32,
                                    weight: w,
                                });
                            }
                        }
                    }
                    source_bones.retain(|b| !b.weights.is_empty());
                }

                let morph_weights = mesh.weights().unwrap_or(&[]);
                let morph_targets = reader
                    .read_morph_targets()
                    .enumerate()
                    .map(|(t, (positions, normals, _))| SourceMorphTarget {
                        name: None,
                        positions: positions.map(Iterator::collect).unwrap_or_default(),
                        normals: normals.map(Iterator::collect).unwrap_or_default(),
                        weight: morph_weights.get(t).copied().unwrap_or(0.0),
                    })
                    .collect();

                self.meshes.push(SourceMesh {
                    name: mesh.name().map(String::from),
                    material: primitive.material().index(),
                    positions,
                    normals,
                    tangents,
                    bitangents: Vec::new(),
                    texcoords,
                    colors,
                    indices: mesh_indices,
                    bones: source_bones,
                    morph_targets,
                });
                indices.push(self.meshes.len() - 1);
            }
            self.mesh_map.push(indices);
        }
    }

    /// One weightless bone per joint, carrying its inverse bind matrix.
    fn skin_bones(&self, skin: &gltf_dep::Skin<'_>) -> Vec<SourceBone> {
        let reader = skin.reader(|b| self.buffer(b));
        let inverse_binds: Vec<[[f32; 4]; 4]> = reader
            .read_inverse_bind_matrices()
            .map(Iterator::collect)
            .unwrap_or_default();
        skin.joints()
            .enumerate()
            .map(|(j, joint)| SourceBone {
                name: self
                    .node_name(joint.index())
                    .unwrap_or_else(|| format!("node{}", joint.index())),
                offset: inverse_binds.get(j).map(flatten_matrix),
                weights: Vec::new(),
            })
            .collect()
    }

    fn load_scene(&mut self, file: &str) -> Result<SourceNode, ImportError> {
        let document = self.document;
        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| ImportError::EmptyScene(file.to_string()))?;
        let mut root = SourceNode::new();
        root.name = scene.name().map(String::from);
        for node in scene.nodes() {
            root.children.push(self.load_node(&node, &Mat4::identity()));
        }
        Ok(root)
    }

    fn load_node(&mut self, node: &gltf_dep::Node<'_>, parent_world: &Mat4) -> SourceNode {
        let transform = flatten_matrix(&node.transform().matrix());
        let world = parent_world * mat4_from_cols_array(&transform);
        let name = self.node_name(node.index());

        if let Some(camera) = node.camera() {
            self.cameras.push(camera_from_node(&camera, &world, name.clone()));
        }
        if let Some(light) = node.light()
            && let Some(name) = &name
        {
            self.lights.push(light_from_node(&light, name));
        }

        SourceNode {
            name,
            transform,
            meshes: node
                .mesh()
                .and_then(|m| self.mesh_map.get(m.index()).cloned())
                .unwrap_or_default(),
            children: node
                .children()
                .map(|child| self.load_node(&child, &world))
                .collect(),
        }
    }

    fn load_animations(&self) -> Vec<SourceAnimation> {
        let mut animations = Vec::new();
        for animation in self.document.animations() {
            let mut channels: Vec<SourceChannel> = Vec::new();
            for channel in animation.channels() {
                let target = channel.target().node().index();
                let Some(node) = self.node_name(target) else {
                    continue;
                };
                let reader = channel.reader(|b| self.buffer(b));
                let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs())
                else {
                    continue;
                };
                let times: Vec<f32> = inputs.collect();
                let cubic = channel.sampler().interpolation()
                    == gltf_dep::animation::Interpolation::CubicSpline;
                let entry = match channels.iter().position(|c| c.node == node) {
                    Some(i) => &mut channels[i],
                    None => {
                        channels.push(SourceChannel {
                            node,
                            pre_behavior: AnimationBehavior::Constant,
                            post_behavior: AnimationBehavior::Constant,
                            ..SourceChannel::default()
                        });
                        let last = channels.len() - 1;
                        &mut channels[last]
                    }
                };
                match outputs {
                    ReadOutputs::Translations(values) => {
                        entry.positions = keys(&times, values.collect(), cubic);
                    }
                    ReadOutputs::Rotations(values) => {
                        entry.rotations = keys(&times, values.into_f32().collect(), cubic);
                    }
                    ReadOutputs::Scales(values) => {
                        entry.scales = keys(&times, values.collect(), cubic);
                    }
                    ReadOutputs::MorphTargetWeights(_) => {
                        log::debug!("morph weight animation on '{}' not imported", entry.node);
                    }
                }
            }
            animations.push(SourceAnimation {
                name: animation.name().map(String::from),
                ticks_per_second: 1.0,
                channels,
            });
        }
        animations
    }
}

/// Pair key times with values; cubic-spline outputs carry (in-tangent,
/// value, out-tangent) triples and only the value is kept.
fn keys<T: Copy>(times: &[f32], values: Vec<T>, cubic: bool) -> Vec<Key<T>> {
    let values: Vec<T> = if cubic {
        values.chunks(3).filter_map(|c| c.get(1).copied()).collect()
    } else {
        values
    };
    times
        .iter()
        .zip(values)
        .map(|(&t, v)| Key::new(t, v))
        .collect()
}

fn flatten_matrix(m: &[[f32; 4]; 4]) -> [f32; 16] {
    let mut out = IDENTITY;
    for (c, column) in m.iter().enumerate() {
        out[c * 4..c * 4 + 4].copy_from_slice(column);
    }
    out
}

fn camera_from_node(camera: &gltf_dep::Camera<'_>, world: &Mat4, name: Option<String>) -> SourceCamera {
    let eye = world * Vec4::new(0.0, 0.0, 0.0, 1.0);
    let look = world * Vec4::new(0.0, 0.0, -1.0, 0.0);
    let up = world * Vec4::new(0.0, 1.0, 0.0, 0.0);
    let to3 = |v: Vec4| -> [f32; 3] { [v.x, v.y, v.z] };
    let mut source = SourceCamera {
        name: name.or_else(|| camera.name().map(String::from)),
        position: to3(eye),
        look_at: to3(look),
        up: to3(up),
        ..SourceCamera::default()
    };
    match camera.projection() {
        gltf_dep::camera::Projection::Perspective(p) => {
            source.near = p.znear();
            source.far = p.zfar().unwrap_or(source.far);
            source.fov_y = Some(p.yfov());
            source.aspect = p.aspect_ratio();
        }
        gltf_dep::camera::Projection::Orthographic(o) => {
            source.near = o.znear();
            source.far = o.zfar();
        }
    }
    source
}

fn light_from_node(light: &gltf_dep::khr_lights_punctual::Light<'_>, name: &str) -> SourceLight {
    let kind = match light.kind() {
        Kind::Directional => SourceLightKind::Directional,
        Kind::Point => SourceLightKind::Point,
        Kind::Spot {
            inner_cone_angle,
            outer_cone_angle,
        } => SourceLightKind::Spot {
            inner_angle: Some(inner_cone_angle),
            outer_angle: outer_cone_angle,
        },
    };
    let intensity = light.intensity();
    let [r, g, b] = light.color();
    let color = [r * intensity, g * intensity, b * intensity];
    SourceLight {
        diffuse: color,
        specular: color,
        attenuation: [1.0, 0.0, 1.0],
        ..SourceLight::new(name, kind)
    }
}

fn map_mag_filter(filter: gltf_dep::texture::MagFilter) -> FilterMode {
    match filter {
        gltf_dep::texture::MagFilter::Nearest => FilterMode::Nearest,
        gltf_dep::texture::MagFilter::Linear => FilterMode::Linear,
    }
}

fn map_min_filter(filter: gltf_dep::texture::MinFilter) -> FilterMode {
    match filter {
        gltf_dep::texture::MinFilter::Nearest
        | gltf_dep::texture::MinFilter::NearestMipmapNearest
        | gltf_dep::texture::MinFilter::NearestMipmapLinear => FilterMode::Nearest,
        gltf_dep::texture::MinFilter::Linear
        | gltf_dep::texture::MinFilter::LinearMipmapNearest
        | gltf_dep::texture::MinFilter::LinearMipmapLinear => FilterMode::Linear,
    }
}

fn map_wrapping(wrap: gltf_dep::texture::WrappingMode) -> WrapMode {
    match wrap {
        gltf_dep::texture::WrappingMode::ClampToEdge => WrapMode::ClampToEdge,
        gltf_dep::texture::WrappingMode::MirroredRepeat => WrapMode::MirrorRepeat,
        gltf_dep::texture::WrappingMode::Repeat => WrapMode::Repeat,
    }
}

/// Decode a `data:...;base64,` URI.
fn parse_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let (_, encoded) = rest.split_once(";base64,")?;
    base64::engine::general_purpose::STANDARD.decode(encoded).ok()
}

/// Buffer contents in document order. External files are not supported.
fn resolve_buffers(
    document: &gltf_dep::Document,
    blob: Option<Vec<u8>>,
) -> Result<Vec<Vec<u8>>, String> {
    let mut buffers = Vec::new();
    for buffer in document.buffers() {
        match buffer.source() {
            gltf_dep::buffer::Source::Bin => {
                let data = blob
                    .as_ref()
                    .ok_or("binary buffer referenced but no blob present")?;
                buffers.push(data.clone());
            }
            gltf_dep::buffer::Source::Uri(uri) => match parse_data_uri(uri) {
                Some(data) => buffers.push(data),
                None => return Err(format!("external buffer URIs not supported: {uri}")),
            },
        }
    }
    Ok(buffers)
}
