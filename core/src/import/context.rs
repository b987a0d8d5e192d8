//! Shared tables threaded through one import.

use std::collections::HashMap;
use std::sync::Arc;

use crate::light::Light;
use crate::material::SharedMaterial;
use crate::math::Mat4;
use crate::mesh::Mesh;
use crate::scene::{MorphTargets, NodeId, Skin};

use super::settings::ImportSettings;
use super::source::SourceScene;
use super::textures::TextureProvider;

/// What the importer knows about one bone name.
#[derive(Debug, Clone, Default)]
pub(crate) struct BoneDescriptor {
    /// Inverse bind matrix from the first mesh that declared it.
    pub offset: Option<Mat4>,
    /// Source meshes weighted by this bone.
    pub meshes: Vec<usize>,
}

/// A built mesh with the per-mesh components every node using it gets.
#[derive(Debug, Clone)]
pub(crate) struct BuiltMesh {
    pub mesh: Arc<Mesh>,
    pub skin: Option<Skin>,
    pub morph: Option<MorphTargets>,
}

/// Mutable state of one `import_scene` call.
pub(crate) struct ImportContext<'a> {
    pub scene: &'a SourceScene,
    pub settings: ImportSettings,
    pub textures: &'a dyn TextureProvider,
    /// Target root the imported subtree hangs from.
    pub root: NodeId,
    /// Whether imported materials are lit.
    pub lighting: bool,
    /// Lights not yet attached, by node name.
    pub lights: HashMap<String, Light>,
    /// Every created node with the source mesh it should receive, in
    /// creation order.
    pub node_meshes: Vec<(NodeId, Option<usize>)>,
    /// Bones referenced by mesh weights.
    pub bones: HashMap<String, BoneDescriptor>,
    /// Final bone list, root first.
    pub bone_names: Vec<String>,
    /// Node carrying the skeleton, once built.
    pub skeleton: Option<NodeId>,
    pub meshes: HashMap<usize, BuiltMesh>,
    pub materials: HashMap<usize, SharedMaterial>,
    pub embedded: HashMap<usize, Arc<crate::texture::Texture>>,
    pub errors: Vec<String>,
}

impl<'a> ImportContext<'a> {
    pub fn new(
        scene: &'a SourceScene,
        settings: ImportSettings,
        textures: &'a dyn TextureProvider,
        root: NodeId,
    ) -> Self {
        Self {
            scene,
            settings,
            textures,
            root,
            lighting: settings.lighting(),
            lights: HashMap::new(),
            node_meshes: Vec::new(),
            bones: HashMap::new(),
            bone_names: Vec::new(),
            skeleton: None,
            meshes: HashMap::new(),
            materials: HashMap::new(),
            embedded: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Record a recoverable error.
    pub fn error(&mut self, error: impl std::fmt::Display) {
        let message = error.to_string();
        log::error!("import: {message}");
        self.errors.push(message);
    }
}
