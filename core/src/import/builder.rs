//! Node tree construction: cameras, lights and graph traversal.
//!
//! [`import_scene`] drives the whole import. Stages run in a fixed order
//! because later stages read tables filled by earlier ones: traversal
//! records which node gets which mesh and which bones meshes reference,
//! the skeleton must exist before meshes are skinned, and animations are
//! routed to bones or nodes by name.

use crate::light::{self, Light};
use crate::material::UniformValue;
use crate::math::{Vec3, inverse_look_at, mat4_from_cols_array};
use crate::scene::{CameraRig, NodeId, SceneGraph};

use super::context::ImportContext;
use super::settings::ImportSettings;
use super::source::{SourceLight, SourceLightKind, SourceNode, SourceScene};
use super::textures::TextureProvider;
use super::{animation, bones, meshes};

/// Name of the node synthesized for the scene's first camera.
pub const MAIN_CAMERA: &str = "MainCamera";

/// Result of [`import_scene`].
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    /// Target root the scene was imported under.
    pub root: NodeId,
    /// Node carrying the skeleton, if any mesh was skinned.
    pub skeleton: Option<NodeId>,
    /// Recoverable errors in the order they occurred.
    pub errors: Vec<String>,
}

/// Build `scene` under `root` in `graph`.
///
/// Never aborts: every recoverable problem is logged and listed in
/// [`ImportOutcome::errors`], and whatever could be built stays attached.
pub fn import_scene(
    graph: &mut SceneGraph,
    scene: &SourceScene,
    root: NodeId,
    settings: ImportSettings,
    textures: &dyn TextureProvider,
) -> ImportOutcome {
    crate::profile_function!();
    let mut ctx = ImportContext::new(scene, settings, textures, root);
    if !graph.contains(root) {
        ctx.error(format!("target root {root} does not exist"));
        return ImportOutcome {
            root,
            skeleton: None,
            errors: ctx.errors,
        };
    }

    import_camera(graph, &ctx);
    if settings.lighting() {
        import_lights(&mut ctx);
    }
    ctx.lighting = settings.lighting() && !ctx.lights.is_empty();

    {
        crate::profile_scope!("traverse_graph");
        traverse_graph(graph, &mut ctx, &scene.root, root);
    }
    {
        crate::profile_scope!("build_skeleton");
        let bone_nodes = bones::collect_bones(graph, &mut ctx);
        if !bone_nodes.is_empty() {
            bones::build_skeleton(graph, &mut ctx, bone_nodes);
        }
    }
    {
        crate::profile_scope!("materialize_meshes");
        meshes::materialize(graph, &mut ctx);
    }
    if !settings.contains(ImportSettings::NO_ANIMATION) {
        crate::profile_scope!("import_animations");
        animation::import_animations(graph, &mut ctx);
    }

    for name in ctx.lights.keys() {
        log::debug!("light '{name}' matched no node");
    }
    log::debug!(
        "imported {} nodes, {} meshes, {} materials, {} bones, {} errors",
        ctx.node_meshes.len(),
        ctx.meshes.len(),
        ctx.materials.len(),
        ctx.bone_names.len(),
        ctx.errors.len()
    );
    ImportOutcome {
        root,
        skeleton: ctx.skeleton,
        errors: ctx.errors,
    }
}

/// Synthesize `MainCamera` from the first declared camera.
fn import_camera(graph: &mut SceneGraph, ctx: &ImportContext<'_>) {
    let Some(camera) = ctx.scene.cameras.first() else {
        return;
    };
    if ctx.scene.cameras.len() > 1 {
        log::debug!(
            "scene declares {} cameras; using the first",
            ctx.scene.cameras.len()
        );
    }
    let node = graph.create_child(ctx.root, Some(MAIN_CAMERA));
    let matrix = inverse_look_at(
        &Vec3::from(camera.position),
        &Vec3::from(camera.look_at),
        &Vec3::from(camera.up),
    );
    graph.set_local_matrix(node, matrix);
    if let Some(components) = graph.components_mut(node) {
        components.camera = Some(CameraRig {
            near: camera.near,
            far: camera.far,
            fov_y: camera.fov_y,
            aspect: camera.aspect,
        });
    }
}

/// Build the light table. Lights are attached by name during traversal.
fn import_lights(ctx: &mut ImportContext<'_>) {
    let scene = ctx.scene;
    for source in &scene.lights {
        let Some(light) = convert_light(source) else {
            log::debug!("skipping unsupported light '{}'", source.name);
            continue;
        };
        if ctx.lights.contains_key(&source.name) {
            log::warn!("duplicate light name '{}'; keeping the first", source.name);
            continue;
        }
        ctx.lights.insert(source.name.clone(), light);
    }
}

fn rgb1(c: [f32; 3]) -> UniformValue {
    UniformValue::Vec4([c[0], c[1], c[2], 1.0])
}

/// Engine light for a source light of a known kind.
pub(crate) fn convert_light(source: &SourceLight) -> Option<Light> {
    let light = match source.kind {
        SourceLightKind::Directional => Light::directional(),
        SourceLightKind::Point => Light::point(),
        SourceLightKind::Spot {
            inner_angle,
            outer_angle,
        } => Light::spot(outer_angle, inner_angle),
        SourceLightKind::Ambient | SourceLightKind::Area => return None,
    };
    let [x, y, z] = source.position;
    let [dx, dy, dz] = source.direction;
    let [constant, linear, quadratic] = source.attenuation;
    let mut light = light
        .with_name(source.name.clone())
        .with_uniform(light::DIFFUSE_INTENSITY, rgb1(source.diffuse))
        .with_uniform(light::SPECULAR_INTENSITY, rgb1(source.specular))
        .with_uniform(light::AMBIENT_INTENSITY, rgb1(source.ambient));
    if light.kind() != light::LightKind::Directional {
        light.set_uniform(light::WORLD_POSITION, UniformValue::Vec4([x, y, z, 1.0]));
        light.set_uniform(light::ATTENUATION_CONSTANT, UniformValue::Float(constant));
        light.set_uniform(light::ATTENUATION_LINEAR, UniformValue::Float(linear));
        light.set_uniform(light::ATTENUATION_QUADRATIC, UniformValue::Float(quadratic));
    }
    if light.kind() != light::LightKind::Point {
        light.set_uniform(light::WORLD_DIRECTION, UniformValue::Vec4([dx, dy, dz, 0.0]));
    }
    Some(light)
}

/// The single child an unnamed node can absorb, if any.
///
/// The child must be the only child, carry a name that is not a light
/// name, and reference no meshes.
fn mergeable_child<'s>(ctx: &ImportContext<'_>, node: &'s SourceNode) -> Option<&'s SourceNode> {
    if node.name().is_some() || node.meshes.len() > 1 {
        return None;
    }
    let [child] = node.children.as_slice() else {
        return None;
    };
    let name = child.name()?;
    if !child.meshes.is_empty() || ctx.lights.contains_key(name) {
        return None;
    }
    Some(child)
}

/// Depth-first, pre-order copy of the source hierarchy under `parent`.
fn traverse_graph(
    graph: &mut SceneGraph,
    ctx: &mut ImportContext<'_>,
    source: &SourceNode,
    parent: NodeId,
) {
    let mut name = source.name();
    let mut local = mat4_from_cols_array(&source.transform);
    let mut children = source.children.as_slice();
    if let Some(child) = mergeable_child(ctx, source) {
        log::trace!("merging unnamed node into child '{}'", child.name().unwrap_or_default());
        name = child.name();
        local *= mat4_from_cols_array(&child.transform);
        children = child.children.as_slice();
    }

    let node = graph.create_child(parent, name);
    graph.set_local_matrix(node, local);

    if let Some(name) = name
        && let Some(light) = ctx.lights.remove(name)
        && let Some(components) = graph.components_mut(node)
    {
        components.light = Some(light);
    }

    match source.meshes.as_slice() {
        [] => ctx.node_meshes.push((node, None)),
        [mesh] => record_mesh(ctx, node, *mesh),
        many => {
            ctx.node_meshes.push((node, None));
            let base = name.unwrap_or_default();
            for &mesh in many {
                let child = graph.create_child(node, Some(&format!("{base}-{mesh}")));
                record_mesh(ctx, child, mesh);
            }
        }
    }

    for child in children {
        traverse_graph(graph, ctx, child, node);
    }
}

fn record_mesh(ctx: &mut ImportContext<'_>, node: NodeId, mesh: usize) {
    ctx.node_meshes.push((node, Some(mesh)));
    bones::register_mesh_bones(ctx, mesh);
}
