//! Format-neutral description of an externally parsed scene.
//!
//! Loaders produce a [`SourceScene`]; the importer only reads it. Node
//! transforms are column-major 4x4 matrices and all references between
//! parts of the scene are indices into the scene's arrays.

use crate::scene::{AnimationBehavior, Key};
use crate::texture::SamplerSettings;

/// Identity matrix in column-major order.
pub const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// A node in the source hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceNode {
    /// Node name. `None` and the empty string both mean unnamed.
    pub name: Option<String>,
    /// Local transform, column-major.
    pub transform: [f32; 16],
    /// Indices into [`SourceScene::meshes`].
    pub meshes: Vec<usize>,
    /// Child nodes.
    pub children: Vec<SourceNode>,
}

impl SourceNode {
    /// Unnamed node with identity transform.
    pub fn new() -> Self {
        Self {
            name: None,
            transform: IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the local transform.
    #[must_use]
    pub fn with_transform(mut self, transform: [f32; 16]) -> Self {
        self.transform = transform;
        self
    }

    /// Set the mesh indices.
    #[must_use]
    pub fn with_meshes(mut self, meshes: Vec<usize>) -> Self {
        self.meshes = meshes;
        self
    }

    /// Append a child.
    #[must_use]
    pub fn with_child(mut self, child: SourceNode) -> Self {
        self.children.push(child);
        self
    }

    /// Name, treating the empty string as no name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// Number of nodes in this subtree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(SourceNode::count).sum::<usize>()
    }
}

impl Default for SourceNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Influence of one bone on one vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    /// Vertex index within the mesh.
    pub vertex: u32,
    /// Weight.
    pub weight: f32,
}

/// A bone referenced by a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBone {
    /// Name of the node driving this bone.
    pub name: String,
    /// Mesh-space to bone-space matrix (inverse bind), if the format
    /// supplies one.
    pub offset: Option<[f32; 16]>,
    /// Vertex weights.
    pub weights: Vec<VertexWeight>,
}

/// Vertex deltas of one morph target.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceMorphTarget {
    /// Target name.
    pub name: Option<String>,
    /// Position deltas.
    pub positions: Vec<[f32; 3]>,
    /// Normal deltas.
    pub normals: Vec<[f32; 3]>,
    /// Default weight.
    pub weight: f32,
}

/// A source mesh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceMesh {
    /// Mesh name.
    pub name: Option<String>,
    /// Index into [`SourceScene::materials`].
    pub material: Option<usize>,
    /// Positions.
    pub positions: Vec<[f32; 3]>,
    /// Normals (empty if absent).
    pub normals: Vec<[f32; 3]>,
    /// Tangents (empty if absent).
    pub tangents: Vec<[f32; 3]>,
    /// Bitangents (empty if absent).
    pub bitangents: Vec<[f32; 3]>,
    /// Texture coordinate sets.
    pub texcoords: Vec<Vec<[f32; 2]>>,
    /// Vertex color sets.
    pub colors: Vec<Vec<[f32; 4]>>,
    /// Triangle list indices.
    pub indices: Vec<u32>,
    /// Bones skinning this mesh.
    pub bones: Vec<SourceBone>,
    /// Morph targets.
    pub morph_targets: Vec<SourceMorphTarget>,
}

impl SourceMesh {
    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Whether any bone carries weights.
    pub fn has_bone_weights(&self) -> bool {
        self.bones.iter().any(|b| !b.weights.is_empty())
    }
}

/// Role of a texture within a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// Diffuse or base color.
    Diffuse,
    /// Specular.
    Specular,
    /// Ambient.
    Ambient,
    /// Emissive.
    Emissive,
    /// Normal map.
    Normal,
    /// Opacity.
    Opacity,
    /// Light map.
    Lightmap,
    /// Metallic-roughness.
    MetallicRoughness,
    /// Ambient occlusion.
    Occlusion,
}

/// A texture reference in a material.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTexture {
    /// Role.
    pub kind: TextureKind,
    /// File path relative to the model, or `*N` for embedded texture `N`.
    pub path: String,
    /// Texture coordinate set.
    pub uv_index: usize,
    /// Filtering and wrapping.
    pub sampler: SamplerSettings,
}

/// Lighting workflow declared by a material.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ShadingWorkflow {
    /// Classic ambient/diffuse/specular.
    #[default]
    Classic,
    /// Metallic-roughness PBR.
    MetallicRoughness {
        /// Metallic factor.
        metallic: f32,
        /// Roughness factor.
        roughness: f32,
    },
    /// Specular-glossiness PBR.
    SpecularGlossiness {
        /// Glossiness factor.
        glossiness: f32,
    },
}

/// A source material.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceMaterial {
    /// Material name.
    pub name: Option<String>,
    /// Textures in declaration order.
    pub textures: Vec<SourceTexture>,
    /// Diffuse / base color.
    pub diffuse: Option<[f32; 4]>,
    /// Specular color.
    pub specular: Option<[f32; 4]>,
    /// Ambient color.
    pub ambient: Option<[f32; 4]>,
    /// Emissive color.
    pub emissive: Option<[f32; 4]>,
    /// Opacity.
    pub opacity: Option<f32>,
    /// Specular exponent.
    pub shininess: Option<f32>,
    /// Lighting workflow.
    pub workflow: ShadingWorkflow,
}

/// Source light type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceLightKind {
    /// Directional.
    Directional,
    /// Point.
    Point,
    /// Spot with cone half-angles in radians.
    Spot {
        /// Inner angle, if declared.
        inner_angle: Option<f32>,
        /// Outer angle.
        outer_angle: f32,
    },
    /// Ambient-only light; not imported.
    Ambient,
    /// Area light; not imported.
    Area,
}

/// A source light. Attached to the node with the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLight {
    /// Name of the node this light belongs to.
    pub name: String,
    /// Type.
    pub kind: SourceLightKind,
    /// Diffuse color.
    pub diffuse: [f32; 3],
    /// Specular color.
    pub specular: [f32; 3],
    /// Ambient color.
    pub ambient: [f32; 3],
    /// Direction in node space.
    pub direction: [f32; 3],
    /// Position in node space.
    pub position: [f32; 3],
    /// Constant, linear and quadratic attenuation.
    pub attenuation: [f32; 3],
}

impl SourceLight {
    /// A white light of `kind`.
    pub fn new(name: impl Into<String>, kind: SourceLightKind) -> Self {
        Self {
            name: name.into(),
            kind,
            diffuse: [1.0; 3],
            specular: [1.0; 3],
            ambient: [0.0; 3],
            direction: [0.0, 0.0, -1.0],
            position: [0.0; 3],
            attenuation: [1.0, 0.0, 0.0],
        }
    }
}

/// A source camera.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCamera {
    /// Camera name.
    pub name: Option<String>,
    /// Eye position.
    pub position: [f32; 3],
    /// Viewing direction.
    pub look_at: [f32; 3],
    /// Up vector.
    pub up: [f32; 3],
    /// Near clip.
    pub near: f32,
    /// Far clip.
    pub far: f32,
    /// Vertical field of view in radians.
    pub fov_y: Option<f32>,
    /// Aspect ratio.
    pub aspect: Option<f32>,
}

impl Default for SourceCamera {
    fn default() -> Self {
        Self {
            name: None,
            position: [0.0; 3],
            look_at: [0.0, 0.0, -1.0],
            up: [0.0, 1.0, 0.0],
            near: 0.1,
            far: 1000.0,
            fov_y: None,
            aspect: None,
        }
    }
}

/// Keyframe tracks for one node. Key times are in ticks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceChannel {
    /// Animated node name.
    pub node: String,
    /// Position keys.
    pub positions: Vec<Key<[f32; 3]>>,
    /// Rotation keys, `[x, y, z, w]`.
    pub rotations: Vec<Key<[f32; 4]>>,
    /// Scale keys.
    pub scales: Vec<Key<[f32; 3]>>,
    /// Behavior before the first key.
    pub pre_behavior: AnimationBehavior,
    /// Behavior after the last key.
    pub post_behavior: AnimationBehavior,
}

/// A source animation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceAnimation {
    /// Animation name.
    pub name: Option<String>,
    /// Ticks per second; `0` means unspecified.
    pub ticks_per_second: f32,
    /// Channels.
    pub channels: Vec<SourceChannel>,
}

/// Ticks per second assumed when an animation does not declare a rate.
pub const DEFAULT_TICKS_PER_SECOND: f32 = 25.0;

impl SourceAnimation {
    /// Effective tick rate.
    pub fn tick_rate(&self) -> f32 {
        if self.ticks_per_second > 0.0 {
            self.ticks_per_second
        } else {
            DEFAULT_TICKS_PER_SECOND
        }
    }
}

/// Encoded image data carried inside the model file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmbeddedTexture {
    /// Encoded bytes (PNG, JPEG).
    pub bytes: Vec<u8>,
    /// Format hint such as `png`.
    pub format_hint: Option<String>,
}

/// An externally parsed scene.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceScene {
    /// Root of the node hierarchy.
    pub root: SourceNode,
    /// Meshes.
    pub meshes: Vec<SourceMesh>,
    /// Materials.
    pub materials: Vec<SourceMaterial>,
    /// Lights.
    pub lights: Vec<SourceLight>,
    /// Cameras.
    pub cameras: Vec<SourceCamera>,
    /// Animations.
    pub animations: Vec<SourceAnimation>,
    /// Embedded textures referenced as `*N`.
    pub textures: Vec<EmbeddedTexture>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_counts_as_unnamed() {
        let node = SourceNode::new().with_name("");
        assert_eq!(node.name(), None);
        assert_eq!(SourceNode::new().with_name("a").name(), Some("a"));
    }

    #[test]
    fn count_includes_descendants() {
        let root = SourceNode::new()
            .with_child(SourceNode::new().with_child(SourceNode::new()))
            .with_child(SourceNode::new());
        assert_eq!(root.count(), 4);
    }

    #[test]
    fn tick_rate_defaults() {
        let anim = SourceAnimation::default();
        assert_eq!(anim.tick_rate(), DEFAULT_TICKS_PER_SECOND);
    }
}
