use std::sync::Arc;

use parking_lot::Mutex;

use crate::import::{
    ImportOutcome, ImportSettings, SourceBone, SourceMaterial, SourceMesh, SourceNode,
    SourceScene, SourceTexture, TextureKind, TextureProvider, VertexWeight, import_scene,
};
use crate::scene::{NodeId, SceneGraph};
use crate::texture::{SamplerSettings, Texture};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Hands out pending textures and remembers what was asked for.
#[derive(Default)]
pub struct RecordingTextures {
    pub requests: Mutex<Vec<String>>,
}

impl TextureProvider for RecordingTextures {
    fn request(&self, reference: &str, sampler: SamplerSettings) -> Arc<Texture> {
        self.requests.lock().push(reference.to_string());
        Arc::new(Texture::new(reference, sampler))
    }
}

/// A unit quad in the XY plane: four vertices, two triangles.
pub fn quad() -> SourceMesh {
    SourceMesh {
        name: Some("quad".to_string()),
        material: Some(0),
        positions: vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ],
        normals: vec![[0.0, 0.0, 1.0]; 4],
        texcoords: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]],
        indices: vec![0, 1, 2, 0, 2, 3],
        ..SourceMesh::default()
    }
}

/// A quad whose vertices are weighted by `bones`, each bone weighting
/// every vertex with `weight`.
pub fn skinned_quad(bones: &[&str], weight: f32) -> SourceMesh {
    let mut mesh = quad();
    mesh.bones = bones
        .iter()
        .map(|name| SourceBone {
            name: name.to_string(),
            offset: None,
            weights: (0..4).map(|vertex| VertexWeight { vertex, weight }).collect(),
        })
        .collect();
    mesh
}

/// Classic material with one diffuse texture.
pub fn textured_material(path: &str) -> SourceMaterial {
    SourceMaterial {
        name: Some("painted".to_string()),
        diffuse: Some([1.0, 0.5, 0.25, 1.0]),
        textures: vec![SourceTexture {
            kind: TextureKind::Diffuse,
            path: path.to_string(),
            uv_index: 0,
            sampler: SamplerSettings::default(),
        }],
        ..SourceMaterial::default()
    }
}

/// Named scene root holding `children`.
pub fn scene_root(children: Vec<SourceNode>) -> SourceNode {
    children
        .into_iter()
        .fold(SourceNode::new().with_name("Scene"), SourceNode::with_child)
}

/// Single quad node "quad" with a textured material.
pub fn quad_scene() -> SourceScene {
    SourceScene {
        root: scene_root(vec![SourceNode::new().with_name("quad").with_meshes(vec![0])]),
        meshes: vec![quad()],
        materials: vec![textured_material("albedo.png")],
        ..SourceScene::default()
    }
}

pub struct Imported {
    pub graph: SceneGraph,
    pub root: NodeId,
    pub outcome: ImportOutcome,
    pub textures: RecordingTextures,
}

impl Imported {
    pub fn node(&self, name: &str) -> NodeId {
        self.graph
            .find_by_name(self.root, name)
            .unwrap_or_else(|| panic!("no node named '{name}'"))
    }
}

/// Import `scene` under a fresh root named "model".
pub fn import(scene: &SourceScene, settings: ImportSettings) -> Imported {
    init_logger();
    let mut graph = SceneGraph::new();
    let root = graph.create_node(Some("model"));
    let textures = RecordingTextures::default();
    let outcome = import_scene(&mut graph, scene, root, settings, &textures);
    Imported {
        graph,
        root,
        outcome,
        textures,
    }
}
