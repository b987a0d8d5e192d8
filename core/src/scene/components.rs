//! Components attached to scene nodes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::light::Light;
use crate::material::SharedMaterial;
use crate::mesh::Mesh;

use super::animation::AnimationSet;
use super::graph::NodeId;
use super::skeleton::Skeleton;

/// Opaque handle to a compiled shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

/// A mesh paired with a material and render-state flags.
///
/// The bound shader is set by the shader variant compiler and cleared
/// whenever the mesh or material is swapped.
#[derive(Debug, Clone)]
pub struct RenderData {
    mesh: Arc<Mesh>,
    material: SharedMaterial,
    /// Whether scene lights affect this object.
    pub lighting_enabled: bool,
    /// Whether this object is drawn into shadow maps.
    pub cast_shadows: bool,
    shader: Option<ShaderHandle>,
}

impl RenderData {
    /// Pair `mesh` with `material`. Lighting is enabled by default.
    pub fn new(mesh: Arc<Mesh>, material: SharedMaterial) -> Self {
        Self {
            mesh,
            material,
            lighting_enabled: true,
            cast_shadows: true,
            shader: None,
        }
    }

    /// Set the lighting flag.
    #[must_use]
    pub fn with_lighting(mut self, enabled: bool) -> Self {
        self.lighting_enabled = enabled;
        self
    }

    /// Mesh drawn.
    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    /// Replace the mesh. Unbinds the shader.
    pub fn set_mesh(&mut self, mesh: Arc<Mesh>) {
        self.mesh = mesh;
        self.shader = None;
    }

    /// Material drawn with.
    pub fn material(&self) -> &SharedMaterial {
        &self.material
    }

    /// Replace the material. Unbinds the shader.
    pub fn set_material(&mut self, material: SharedMaterial) {
        self.material = material;
        self.shader = None;
    }

    /// Shader bound for the next draw.
    pub fn shader(&self) -> Option<ShaderHandle> {
        self.shader
    }

    /// Bind a compiled shader.
    pub fn bind_shader(&mut self, handle: ShaderHandle) {
        self.shader = Some(handle);
    }
}

/// Camera parameters; the view transform is the owning node's transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
    /// Vertical field of view in radians, if known.
    pub fov_y: Option<f32>,
    /// Width over height, if known.
    pub aspect: Option<f32>,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 1000.0,
            fov_y: None,
            aspect: None,
        }
    }
}

/// Binds a mesh to a skeleton.
///
/// Per-vertex bone indices and weights live in the mesh's
/// `a_bone_indices` / `a_bone_weights` channels and index the skeleton's
/// bone list directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Skin {
    /// Node carrying the [`Skeleton`] component.
    pub skeleton: NodeId,
    /// Skeleton bone indices that influence at least one vertex, ascending.
    pub bones: Vec<usize>,
}

/// One blend shape.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphTarget {
    /// Target name, if any.
    pub name: Option<String>,
    /// Position deltas, three floats per vertex.
    pub positions: Vec<f32>,
    /// Normal deltas, three floats per vertex.
    pub normals: Vec<f32>,
}

/// Blend shapes of a mesh with their current weights.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MorphTargets {
    /// Targets in source order.
    pub targets: Vec<MorphTarget>,
    /// Current weight per target.
    pub weights: Vec<f32>,
}

/// Everything that can hang off a node.
#[derive(Debug, Default)]
pub struct NodeComponents {
    /// Mesh renderer.
    pub render_data: Option<RenderData>,
    /// Camera.
    pub camera: Option<CameraRig>,
    /// Light.
    pub light: Option<Light>,
    /// Skin binding the render data's mesh to a skeleton.
    pub skin: Option<Skin>,
    /// Morph targets.
    pub morph: Option<MorphTargets>,
    /// Skeleton rooted at this node.
    pub skeleton: Option<Skeleton>,
    /// Animations owned by this node.
    pub animations: Option<AnimationSet>,
}

impl NodeComponents {
    /// Rewrite node ids after the owning subtree moved between graphs.
    pub(crate) fn remapped(mut self, mapping: &HashMap<NodeId, NodeId>) -> Self {
        if let Some(skin) = &mut self.skin
            && let Some(&skeleton) = mapping.get(&skin.skeleton)
        {
            skin.skeleton = skeleton;
        }
        if let Some(skeleton) = &mut self.skeleton {
            skeleton.remap(mapping);
        }
        if let Some(animations) = &mut self.animations {
            animations.remap(mapping);
        }
        self
    }
}
