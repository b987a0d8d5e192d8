//! Deferred mesh materialization and skinning.

use std::sync::Arc;

use crate::math::{EPSILON, Vec3};
use crate::mesh::{Mesh, MeshError, attr};
use crate::scene::{MorphTarget, MorphTargets, NodeId, RenderData, SceneGraph, Skeleton, Skin};

use super::ImportError;
use super::context::{BuiltMesh, ImportContext};
use super::materials;
use super::settings::ImportSettings;
use super::source::SourceMesh;

/// Texture coordinate sets copied per mesh.
pub const MAX_TEXCOORD_SETS: usize = 4;
/// Vertex color sets copied per mesh.
pub const MAX_COLOR_SETS: usize = 2;
/// Bone influences kept per vertex.
pub const MAX_BONE_INFLUENCES: usize = 4;

/// Give every recorded node its mesh, material, skin and morph targets.
pub(crate) fn materialize(graph: &mut SceneGraph, ctx: &mut ImportContext<'_>) {
    let records = ctx.node_meshes.clone();
    for (node, index) in records {
        let Some(index) = index else {
            continue;
        };
        let built = match built_mesh(graph, ctx, index) {
            Ok(built) => built,
            Err(err) => {
                ctx.error(err);
                continue;
            }
        };
        let material_index = ctx.scene.meshes.get(index).and_then(|m| m.material);
        let material = materials::material_for(ctx, material_index);
        let render_data = RenderData::new(built.mesh, material).with_lighting(ctx.lighting);
        if let Some(components) = graph.components_mut(node) {
            components.render_data = Some(render_data);
            components.skin = built.skin;
            components.morph = built.morph;
        }
    }
}

/// The mesh built for source index `index`, built on first use.
fn built_mesh(
    graph: &SceneGraph,
    ctx: &mut ImportContext<'_>,
    index: usize,
) -> Result<BuiltMesh, ImportError> {
    if let Some(built) = ctx.meshes.get(&index) {
        return Ok(built.clone());
    }
    let scene = ctx.scene;
    let source = scene.meshes.get(index).ok_or_else(|| ImportError::MissingMesh {
        index,
        reason: format!("scene has {} meshes", scene.meshes.len()),
    })?;
    let skeleton = ctx
        .skeleton
        .and_then(|node| Some((node, graph.components(node)?.skeleton.as_ref()?)));
    let built = build_mesh(source, index, ctx.settings, skeleton)?;
    ctx.meshes.insert(index, built.clone());
    Ok(built)
}

fn flatten<const N: usize>(values: &[[f32; N]]) -> Vec<f32> {
    values.iter().flatten().copied().collect()
}

/// Convert one source mesh.
pub(crate) fn build_mesh(
    source: &SourceMesh,
    index: usize,
    settings: ImportSettings,
    skeleton: Option<(NodeId, &Skeleton)>,
) -> Result<BuiltMesh, ImportError> {
    let vertex_count = source.vertex_count();
    if vertex_count == 0 {
        return Err(ImportError::MissingMesh {
            index,
            reason: "no positions".to_string(),
        });
    }
    let wrap = |source: MeshError| ImportError::Mesh { index, source };
    let mut mesh = Mesh::new(vertex_count as u32);
    if let Some(name) = &source.name {
        mesh = mesh.with_name(name.clone());
    }

    mesh.set_float_channel(attr::POSITION, 3, flatten(&source.positions))
        .map_err(wrap)?;

    let normals = (source.normals.len() == vertex_count).then_some(&source.normals);
    if let Some(normals) = normals {
        mesh.set_float_channel(attr::NORMAL, 3, flatten(normals))
            .map_err(wrap)?;
    }

    let mut tangents = (source.tangents.len() == vertex_count).then(|| source.tangents.clone());
    let mut bitangents =
        (source.bitangents.len() == vertex_count).then(|| source.bitangents.clone());
    if tangents.is_none()
        && settings.contains(ImportSettings::CALCULATE_TANGENTS)
        && let Some(normals) = normals
        && let Some(uvs) = source.texcoords.first().filter(|uv| uv.len() == vertex_count)
    {
        let (t, b) = generate_tangents(&source.positions, normals, uvs, &source.indices);
        tangents = Some(t);
        bitangents = Some(b);
    }
    if let Some(tangents) = &tangents {
        if bitangents.is_none()
            && let Some(normals) = normals
        {
            bitangents = Some(
                normals
                    .iter()
                    .zip(tangents)
                    .map(|(n, t)| Vec3::from(*n).cross(&Vec3::from(*t)).into())
                    .collect(),
            );
        }
        mesh.set_float_channel(attr::TANGENT, 3, flatten(tangents))
            .map_err(wrap)?;
    }
    if let Some(bitangents) = &bitangents {
        mesh.set_float_channel(attr::BITANGENT, 3, flatten(bitangents))
            .map_err(wrap)?;
    }

    for (set, uvs) in source.texcoords.iter().take(MAX_TEXCOORD_SETS).enumerate() {
        if uvs.len() != vertex_count {
            log::warn!("mesh {index}: texcoord set {set} has {} entries", uvs.len());
            continue;
        }
        mesh.set_float_channel(&attr::texcoord(set), 2, flatten(uvs))
            .map_err(wrap)?;
    }
    for (set, colors) in source.colors.iter().take(MAX_COLOR_SETS).enumerate() {
        if colors.len() != vertex_count {
            log::warn!("mesh {index}: color set {set} has {} entries", colors.len());
            continue;
        }
        mesh.set_float_channel(&attr::color(set), 4, flatten(colors))
            .map_err(wrap)?;
    }
    if !source.indices.is_empty() {
        mesh.set_indices(source.indices.clone()).map_err(wrap)?;
    }

    let skin = match skeleton {
        Some((node, skeleton)) if source.has_bone_weights() => {
            let (skin, indices, weights) = build_skin(source, index, node, skeleton);
            mesh.set_int_channel(attr::BONE_INDICES, 4, indices)
                .map_err(wrap)?;
            mesh.set_float_channel(attr::BONE_WEIGHTS, 4, weights)
                .map_err(wrap)?;
            Some(skin)
        }
        _ => None,
    };

    let morph = if settings.contains(ImportSettings::NO_MORPH) || source.morph_targets.is_empty() {
        None
    } else {
        Some(MorphTargets {
            targets: source
                .morph_targets
                .iter()
                .map(|t| MorphTarget {
                    name: t.name.clone(),
                    positions: flatten(&t.positions),
                    normals: flatten(&t.normals),
                })
                .collect(),
            weights: source.morph_targets.iter().map(|t| t.weight).collect(),
        })
    };

    Ok(BuiltMesh {
        mesh: Arc::new(mesh),
        skin,
        morph,
    })
}

/// Per-vertex bone slots: up to four (skeleton bone index, weight) pairs.
#[derive(Clone, Copy, Default)]
struct Influences {
    bones: [i32; MAX_BONE_INFLUENCES],
    weights: [f32; MAX_BONE_INFLUENCES],
    count: usize,
}

impl Influences {
    /// Add an influence, displacing the weakest one when full.
    fn add(&mut self, bone: i32, weight: f32) {
        if self.count < MAX_BONE_INFLUENCES {
            self.bones[self.count] = bone;
            self.weights[self.count] = weight;
            self.count += 1;
            return;
        }
        let (weakest, &min) = self
            .weights
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .unwrap_or((0, &0.0));
        if weight > min {
            self.bones[weakest] = bone;
            self.weights[weakest] = weight;
        }
    }

    fn normalize(&mut self) {
        let sum: f32 = self.weights.iter().sum();
        if sum.abs() > EPSILON {
            for w in &mut self.weights {
                *w /= sum;
            }
        }
    }
}

/// Skin component plus flattened bone index / weight channels.
fn build_skin(
    source: &SourceMesh,
    index: usize,
    skeleton_node: NodeId,
    skeleton: &Skeleton,
) -> (Skin, Vec<i32>, Vec<f32>) {
    let vertex_count = source.vertex_count();
    let mut influences = vec![Influences::default(); vertex_count];
    for bone in &source.bones {
        let Some(bone_index) = skeleton.bone_index(&bone.name) else {
            log::warn!("mesh {index}: bone '{}' is not in the skeleton", bone.name);
            continue;
        };
        for w in &bone.weights {
            match influences.get_mut(w.vertex as usize) {
                Some(slot) => slot.add(bone_index as i32, w.weight),
                None => log::warn!(
                    "mesh {index}: bone '{}' weights vertex {} of {vertex_count}",
                    bone.name,
                    w.vertex
                ),
            }
        }
    }
    let mut indices = Vec::with_capacity(vertex_count * MAX_BONE_INFLUENCES);
    let mut weights = Vec::with_capacity(vertex_count * MAX_BONE_INFLUENCES);
    let mut used: Vec<usize> = Vec::new();
    for slot in &mut influences {
        slot.normalize();
        indices.extend_from_slice(&slot.bones);
        weights.extend_from_slice(&slot.weights);
        for &bone in &slot.bones[..slot.count] {
            if let Ok(bone) = usize::try_from(bone)
                && !used.contains(&bone)
            {
                used.push(bone);
            }
        }
    }
    // Bones displaced from every vertex are not part of the skin.
    used.sort_unstable();
    let skin = Skin {
        skeleton: skeleton_node,
        bones: used,
    };
    (skin, indices, weights)
}

/// Per-vertex tangents and bitangents from triangle UV gradients.
///
/// Non-indexed meshes are treated as triangle lists.
fn generate_tangents(
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    uvs: &[[f32; 2]],
    indices: &[u32],
) -> (Vec<[f32; 3]>, Vec<[f32; 3]>) {
    let n = positions.len();
    let mut tan = vec![Vec3::zeros(); n];
    let triangles: Vec<[usize; 3]> = if indices.is_empty() {
        (0..n / 3).map(|t| [3 * t, 3 * t + 1, 3 * t + 2]).collect()
    } else {
        indices
            .chunks_exact(3)
            .map(|c| [c[0] as usize, c[1] as usize, c[2] as usize])
            .collect()
    };
    for [a, b, c] in triangles {
        if a >= n || b >= n || c >= n {
            continue;
        }
        let e1 = Vec3::from(positions[b]) - Vec3::from(positions[a]);
        let e2 = Vec3::from(positions[c]) - Vec3::from(positions[a]);
        let (du1, dv1) = (uvs[b][0] - uvs[a][0], uvs[b][1] - uvs[a][1]);
        let (du2, dv2) = (uvs[c][0] - uvs[a][0], uvs[c][1] - uvs[a][1]);
        let det = du1 * dv2 - du2 * dv1;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let t = (e1 * dv2 - e2 * dv1) / det;
        for v in [a, b, c] {
            tan[v] += t;
        }
    }
    let mut tangents = Vec::with_capacity(n);
    let mut bitangents = Vec::with_capacity(n);
    for (t, normal) in tan.iter().zip(normals) {
        let normal = Vec3::from(*normal);
        let ortho = t - normal * normal.dot(t);
        let t = if ortho.norm() > EPSILON {
            ortho.normalize()
        } else {
            Vec3::x()
        };
        tangents.push(t.into());
        bitangents.push(normal.cross(&t).into());
    }
    (tangents, bitangents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::source::{SourceBone, VertexWeight};
    use crate::scene::SceneGraph;

    fn quad() -> SourceMesh {
        SourceMesh {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            texcoords: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]],
            indices: vec![0, 1, 2, 0, 2, 3],
            ..SourceMesh::default()
        }
    }

    #[test]
    fn tangents_generated_along_u() {
        let built = build_mesh(&quad(), 0, ImportSettings::recommended(), None).unwrap();
        let tangents = built.mesh.float_channel(attr::TANGENT).unwrap();
        assert!((tangents[0] - 1.0).abs() < 1e-5);
        let bitangents = built.mesh.float_channel(attr::BITANGENT).unwrap();
        assert!((bitangents[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn bitangent_from_supplied_tangent() {
        let mut source = quad();
        source.tangents = vec![[1.0, 0.0, 0.0]; 4];
        let built = build_mesh(&source, 0, ImportSettings::empty(), None).unwrap();
        let bitangents = built.mesh.float_channel(attr::BITANGENT).unwrap();
        assert_eq!(&bitangents[..3], &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn empty_mesh_is_missing() {
        let err = build_mesh(&SourceMesh::default(), 3, ImportSettings::empty(), None).unwrap_err();
        assert!(matches!(err, ImportError::MissingMesh { index: 3, .. }));
    }

    #[test]
    fn strongest_four_influences_kept_and_normalized() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node(None);
        let bones: Vec<_> = (0..5)
            .map(|i| {
                let name = format!("b{i}");
                let node = graph.create_child(root, Some(&name));
                (name, node)
            })
            .collect();
        let skeleton = Skeleton::new(&graph, bones);

        let mut source = quad();
        source.bones = (0..5)
            .map(|i| SourceBone {
                name: format!("b{i}"),
                offset: None,
                weights: vec![VertexWeight {
                    vertex: 0,
                    weight: (i + 1) as f32,
                }],
            })
            .collect();
        let built =
            build_mesh(&source, 0, ImportSettings::empty(), Some((root, &skeleton))).unwrap();
        let indices = built.mesh.int_channel(attr::BONE_INDICES).unwrap();
        let weights = built.mesh.float_channel(attr::BONE_WEIGHTS).unwrap();
        let mut kept: Vec<i32> = indices[..4].to_vec();
        kept.sort_unstable();
        assert_eq!(kept, [1, 2, 3, 4]);
        let sum: f32 = weights[..4].iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        // Unweighted vertices stay all zero.
        assert_eq!(&weights[4..8], &[0.0; 4]);
        // b0 lost its only slot to the stronger four.
        assert_eq!(built.skin.unwrap().bones, [1, 2, 3, 4]);
    }
}
