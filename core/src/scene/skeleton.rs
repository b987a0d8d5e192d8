//! Skeletons: ordered bones bound to scene nodes, plus a bind pose.

use std::collections::HashMap;

use crate::math::{Mat4, inverse_or_identity};

use super::graph::{NodeId, SceneGraph};

/// An ordered set of bones.
///
/// Bone `0` is the root. Every other bone's parent is the nearest ancestor
/// node that is also a bone; parents always precede their children.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    names: Vec<String>,
    nodes: Vec<NodeId>,
    parents: Vec<Option<usize>>,
    bind_pose: Vec<Mat4>,
}

impl Skeleton {
    /// Build a skeleton over `bones` (name, node) in order. Bind poses start
    /// as identity.
    pub fn new(graph: &SceneGraph, bones: Vec<(String, NodeId)>) -> Self {
        let index_of: HashMap<NodeId, usize> = bones
            .iter()
            .enumerate()
            .map(|(i, (_, node))| (*node, i))
            .collect();

        let mut parents = Vec::with_capacity(bones.len());
        for (i, (name, node)) in bones.iter().enumerate() {
            let mut cursor = graph.parent(*node);
            let mut parent = None;
            while let Some(ancestor) = cursor {
                if let Some(&p) = index_of.get(&ancestor) {
                    parent = Some(p);
                    break;
                }
                cursor = graph.parent(ancestor);
            }
            if parent.is_none() && i > 0 {
                log::warn!("bone '{name}' has no parent bone");
            }
            parents.push(parent);
        }

        let (names, nodes) = bones.into_iter().unzip();
        Self {
            bind_pose: vec![Mat4::identity(); parents.len()],
            names,
            nodes,
            parents,
        }
    }

    /// Number of bones.
    pub fn bone_count(&self) -> usize {
        self.names.len()
    }

    /// Bone names in index order.
    pub fn bone_names(&self) -> &[String] {
        &self.names
    }

    /// Name of bone `index`.
    pub fn bone_name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Index of the bone named `name`.
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Scene node driving bone `index`.
    pub fn bone_node(&self, index: usize) -> Option<NodeId> {
        self.nodes.get(index).copied()
    }

    /// Parent bone of bone `index`.
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    /// Rest matrix of bone `index` in skeleton-root space.
    pub fn bind_pose(&self, index: usize) -> Option<&Mat4> {
        self.bind_pose.get(index)
    }

    /// Inverse rest matrix of bone `index`, as used for skinning.
    pub fn inverse_bind_pose(&self, index: usize) -> Option<Mat4> {
        self.bind_pose.get(index).map(inverse_or_identity)
    }

    /// Set the rest matrix of bone `index`.
    pub fn set_bind_pose(&mut self, index: usize, matrix: Mat4) {
        if let Some(slot) = self.bind_pose.get_mut(index) {
            *slot = matrix;
        }
    }

    pub(crate) fn remap(&mut self, mapping: &HashMap<NodeId, NodeId>) {
        for node in &mut self.nodes {
            if let Some(&new) = mapping.get(node) {
                *node = new;
            }
        }
    }
}
