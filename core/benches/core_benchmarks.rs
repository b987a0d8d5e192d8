use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use vrscene_core::import::{
    ImportSettings, SourceBone, SourceChannel, SourceMesh, SourceNode, SourceScene,
    TextureProvider, VertexWeight, convert_channel, import_scene,
};
use vrscene_core::scene::{Key, SceneGraph, simplify_keys};
use vrscene_core::texture::{SamplerSettings, Texture};

struct PendingTextures;

impl TextureProvider for PendingTextures {
    fn request(&self, reference: &str, sampler: SamplerSettings) -> Arc<Texture> {
        Arc::new(Texture::new(reference, sampler))
    }
}

/// A grid mesh with `side * side` vertices, skinned to `bones`.
fn skinned_grid(side: usize, bones: &[String]) -> SourceMesh {
    let count = side * side;
    let positions = (0..count)
        .map(|i| [(i % side) as f32, (i / side) as f32, 0.0])
        .collect();
    let bones = bones
        .iter()
        .enumerate()
        .map(|(b, name)| SourceBone {
            name: name.clone(),
            offset: None,
            weights: (0..count)
                .filter(|v| v % bones.len() == b)
                .map(|vertex| VertexWeight {
                    vertex: vertex as u32,
                    weight: 1.0,
                })
                .collect(),
        })
        .collect();
    SourceMesh {
        positions,
        normals: vec![[0.0, 0.0, 1.0]; count],
        bones,
        ..SourceMesh::default()
    }
}

/// A chain of `depth` bones with one skinned mesh at the end.
fn bone_chain_scene(depth: usize) -> SourceScene {
    let names: Vec<String> = (0..depth).map(|i| format!("bone{i}")).collect();
    let mut node = SourceNode::new().with_name("skin").with_meshes(vec![0]);
    for name in names.iter().rev() {
        node = SourceNode::new().with_name(name.clone()).with_child(node);
    }
    SourceScene {
        root: SourceNode::new().with_name("Scene").with_child(node),
        meshes: vec![skinned_grid(32, &names)],
        ..SourceScene::default()
    }
}

// ---------------------------------------------------------------------------
// Graph building
// ---------------------------------------------------------------------------

fn bench_import_bone_chain(c: &mut Criterion) {
    let scene = bone_chain_scene(24);
    c.bench_function("import_bone_chain_24", |b| {
        b.iter(|| {
            let mut graph = SceneGraph::new();
            let root = graph.create_node(Some("model"));
            black_box(import_scene(
                &mut graph,
                black_box(&scene),
                root,
                ImportSettings::empty(),
                &PendingTextures,
            ));
        });
    });
}

// ---------------------------------------------------------------------------
// Key simplification
// ---------------------------------------------------------------------------

fn bench_simplify_constant(c: &mut Criterion) {
    let keys: Vec<Key<[f32; 3]>> = (0..4096).map(|i| Key::new(i as f32, [1.0, 2.0, 3.0])).collect();
    c.bench_function("simplify_keys_constant_4096", |b| {
        b.iter(|| simplify_keys(black_box(&keys), 1e-5));
    });
}

fn bench_convert_channel(c: &mut Criterion) {
    let channel = SourceChannel {
        node: "bone0".to_string(),
        positions: (0..1024)
            .map(|i| Key::new(i as f32, [(i as f32).sin(), 0.0, 0.0]))
            .collect(),
        rotations: (0..1024).map(|i| Key::new(i as f32, [0.0, 0.0, 0.0, 1.0])).collect(),
        scales: vec![Key::new(0.0, [1.0; 3])],
        ..SourceChannel::default()
    };
    c.bench_function("convert_channel_1024", |b| {
        b.iter(|| convert_channel(black_box(&channel), 30.0));
    });
}

criterion_group!(
    benches,
    bench_import_bone_chain,
    bench_simplify_constant,
    bench_convert_channel
);
criterion_main!(benches);
