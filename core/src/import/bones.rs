//! Bone collection, skeleton and bind pose.

use std::collections::{HashMap, HashSet};

use crate::math::{inverse_or_identity, mat4_from_cols_array};
use crate::scene::{NodeId, SceneGraph, Skeleton};

use super::context::{BoneDescriptor, ImportContext};

/// Add the bones of source mesh `mesh` to the bone table (once per mesh).
pub(crate) fn register_mesh_bones(ctx: &mut ImportContext<'_>, mesh: usize) {
    let scene = ctx.scene;
    let Some(source) = scene.meshes.get(mesh) else {
        return;
    };
    if !source.has_bone_weights() {
        return;
    }
    for bone in &source.bones {
        let entry = ctx
            .bones
            .entry(bone.name.clone())
            .or_insert_with(BoneDescriptor::default);
        if entry.meshes.contains(&mesh) {
            continue;
        }
        entry.meshes.push(mesh);
        if entry.offset.is_none() {
            entry.offset = bone.offset.as_ref().map(mat4_from_cols_array);
        }
    }
}

/// Pick the nodes that become bones, ordered parents first.
///
/// Every named node whose name appears in the bone table is a bone, leaf
/// or not; the first node with a given name wins. Named nodes lying between two bones are
/// added to keep chains connected. When the chains still have more than
/// one top, their nearest named common ancestor becomes the root bone.
pub(crate) fn collect_bones(
    graph: &SceneGraph,
    ctx: &mut ImportContext<'_>,
) -> Vec<(String, NodeId)> {
    if ctx.bones.is_empty() {
        return Vec::new();
    }
    let order: Vec<NodeId> = graph.depth_first(ctx.root).skip(1).collect();
    let position: HashMap<NodeId, usize> =
        order.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut selected: HashMap<NodeId, String> = HashMap::new();
    let mut names: HashSet<String> = HashSet::new();
    for &id in &order {
        let Some(name) = graph.name(id) else {
            continue;
        };
        if !ctx.bones.contains_key(name) {
            continue;
        }
        if !names.insert(name.to_string()) {
            log::warn!("duplicate bone name '{name}'; keeping the first occurrence");
            continue;
        }
        selected.insert(id, name.to_string());
    }
    for name in ctx.bones.keys() {
        if !names.contains(name) {
            log::warn!("bone '{name}' does not match any node");
        }
    }
    if selected.is_empty() {
        return Vec::new();
    }

    // Connect each bone to its nearest bone ancestor through named nodes.
    let mut tops = Vec::new();
    let referenced: Vec<NodeId> = order
        .iter()
        .copied()
        .filter(|id| selected.contains_key(id))
        .collect();
    for &bone in &referenced {
        let mut path = Vec::new();
        let mut cursor = graph.parent(bone);
        let mut connected = false;
        while let Some(ancestor) = cursor {
            if ancestor == ctx.root {
                break;
            }
            if selected.contains_key(&ancestor) {
                connected = true;
                break;
            }
            path.push(ancestor);
            cursor = graph.parent(ancestor);
        }
        if connected {
            for node in path {
                admit(graph, &mut selected, &mut names, node);
            }
        } else {
            tops.push(bone);
        }
    }

    if tops.len() > 1 {
        match common_root(graph, ctx.root, &tops) {
            Some(root) => {
                log::debug!(
                    "inferred root bone '{}' for {} bone chains",
                    graph.name(root).unwrap_or_default(),
                    tops.len()
                );
                for &top in &tops {
                    let mut cursor = graph.parent(top);
                    while let Some(ancestor) = cursor {
                        if ancestor == root {
                            break;
                        }
                        admit(graph, &mut selected, &mut names, ancestor);
                        cursor = graph.parent(ancestor);
                    }
                }
                admit(graph, &mut selected, &mut names, root);
            }
            None => log::warn!("{} bone chains share no named ancestor", tops.len()),
        }
    }

    let mut bones: Vec<(String, NodeId)> =
        selected.into_iter().map(|(id, name)| (name, id)).collect();
    bones.sort_by_key(|(_, id)| position.get(id).copied().unwrap_or(usize::MAX));
    ctx.bone_names = bones.iter().map(|(name, _)| name.clone()).collect();
    bones
}

/// Add `node` as a bone if it is named and its name is not taken.
fn admit(
    graph: &SceneGraph,
    selected: &mut HashMap<NodeId, String>,
    names: &mut HashSet<String>,
    node: NodeId,
) {
    if selected.contains_key(&node) {
        return;
    }
    let Some(name) = graph.name(node) else {
        return;
    };
    if !names.insert(name.to_string()) {
        log::warn!("duplicate bone name '{name}'; keeping the first occurrence");
        return;
    }
    selected.insert(node, name.to_string());
}

/// Nearest named common ancestor of `nodes` strictly below `limit`.
fn common_root(graph: &SceneGraph, limit: NodeId, nodes: &[NodeId]) -> Option<NodeId> {
    let ancestors = |id: NodeId| -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = graph.parent(id);
        while let Some(a) = cursor {
            if a == limit {
                break;
            }
            chain.push(a);
            cursor = graph.parent(a);
        }
        chain
    };
    let (first, rest) = nodes.split_first()?;
    let rest: Vec<HashSet<NodeId>> = rest
        .iter()
        .map(|&n| ancestors(n).into_iter().collect())
        .collect();
    ancestors(*first)
        .into_iter()
        .filter(|a| rest.iter().all(|set| set.contains(a)))
        .find(|&a| graph.name(a).is_some())
}

/// Build the skeleton over `bones`, compute the bind pose and attach it to
/// the import root.
pub(crate) fn build_skeleton(
    graph: &mut SceneGraph,
    ctx: &mut ImportContext<'_>,
    bones: Vec<(String, NodeId)>,
) {
    let mut skeleton = Skeleton::new(graph, bones);
    let root_inverse = graph.inverse_world_matrix(ctx.root);
    for index in 0..skeleton.bone_count() {
        let (Some(name), Some(node)) = (skeleton.bone_name(index), skeleton.bone_node(index))
        else {
            continue;
        };
        let bind = match ctx.bones.get(name).and_then(|b| b.offset.as_ref()) {
            Some(offset) => inverse_or_identity(offset),
            None => {
                log::warn!("bone '{name}' has no bind pose; using its current transform");
                root_inverse * graph.world_matrix(node)
            }
        };
        skeleton.set_bind_pose(index, bind);
    }
    log::debug!("built skeleton with {} bones", skeleton.bone_count());

    if let Some(components) = graph.components_mut(ctx.root) {
        if components.skeleton.is_some() {
            log::warn!("replacing existing skeleton on import root");
        }
        components.skeleton = Some(skeleton);
        ctx.skeleton = Some(ctx.root);
    }
}
