//! Arena-backed scene hierarchy.
//!
//! Nodes live in a generational arena. A [`NodeId`] stays valid until its
//! node is despawned; a stale id never aliases a node created later in the
//! same slot.
//!
//! Parent links are exclusive: a node has at most one parent, and
//! [`SceneGraph::despawn_recursive`] destroys the whole subtree.

use std::collections::HashMap;
use std::fmt;

use crate::math::{Mat4, inverse_or_identity};

use super::components::NodeComponents;

/// Handle to a node in a [`SceneGraph`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Slot index.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this id was issued.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// One scene node.
#[derive(Debug)]
pub struct Node {
    name: Option<String>,
    local: Mat4,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Attached components.
    pub components: NodeComponents,
}

impl Node {
    fn new(name: Option<String>) -> Self {
        Self {
            name,
            local: Mat4::identity(),
            parent: None,
            children: Vec::new(),
            components: NodeComponents::default(),
        }
    }

    /// Node name. Names are not unique.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Local transform.
    pub fn local_matrix(&self) -> &Mat4 {
        &self.local
    }

    /// Parent, if attached.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A forest of nodes.
#[derive(Debug, Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl SceneGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Create a detached node.
    pub fn create_node(&mut self, name: Option<&str>) -> NodeId {
        let node = Node::new(name.map(str::to_string));
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Create a node and attach it under `parent`.
    pub fn create_child(&mut self, parent: NodeId, name: Option<&str>) -> NodeId {
        let id = self.create_node(name);
        self.set_parent(id, parent);
        id
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Borrow a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    /// Mutably borrow a node.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
    }

    /// Components of a node.
    pub fn components(&self, id: NodeId) -> Option<&NodeComponents> {
        self.get(id).map(|n| &n.components)
    }

    /// Mutable components of a node.
    pub fn components_mut(&mut self, id: NodeId) -> Option<&mut NodeComponents> {
        self.get_mut(id).map(|n| &mut n.components)
    }

    /// Node name.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(Node::name)
    }

    /// Rename a node.
    pub fn set_name(&mut self, id: NodeId, name: Option<&str>) {
        if let Some(node) = self.get_mut(id) {
            node.name = name.map(str::to_string);
        }
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Children of a node; empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_of(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Attach `child` under `parent`, detaching it from any previous parent.
    ///
    /// Returns `false` (and changes nothing) when either id is stale or the
    /// link would create a cycle.
    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) -> bool {
        if !self.contains(child) || !self.contains(parent) {
            return false;
        }
        if self.is_ancestor_of(child, parent) {
            log::warn!("refusing to parent {child} under its own descendant {parent}");
            return false;
        }
        if self.parent(child) == Some(parent) {
            return true;
        }
        self.remove_parent(child);
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
        true
    }

    /// Detach `child` from its parent. No-op for roots.
    pub fn remove_parent(&mut self, child: NodeId) {
        let Some(parent) = self.get_mut(child).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(node) = self.get_mut(parent) {
            node.children.retain(|&c| c != child);
        }
    }

    /// Destroy a node and every descendant.
    pub fn despawn_recursive(&mut self, id: NodeId) {
        self.remove_parent(id);
        self.despawn_subtree(id);
    }

    fn despawn_subtree(&mut self, id: NodeId) {
        let Some(slot) = self
            .slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
        else {
            return;
        };
        let Some(node) = slot.node.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        for child in node.children {
            self.despawn_subtree(child);
        }
    }

    /// Local transform; identity for unknown ids.
    pub fn local_matrix(&self, id: NodeId) -> Mat4 {
        self.get(id).map(|n| n.local).unwrap_or_else(Mat4::identity)
    }

    /// Replace the local transform.
    pub fn set_local_matrix(&mut self, id: NodeId, matrix: Mat4) {
        if let Some(node) = self.get_mut(id) {
            node.local = matrix;
        }
    }

    /// Transform composed through every ancestor.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut world = self.local_matrix(id);
        let mut cursor = self.parent(id);
        while let Some(parent) = cursor {
            world = self.local_matrix(parent) * world;
            cursor = self.parent(parent);
        }
        world
    }

    /// Inverse of [`world_matrix`](Self::world_matrix).
    pub fn inverse_world_matrix(&self, id: NodeId) -> Mat4 {
        inverse_or_identity(&self.world_matrix(id))
    }

    /// Pre-order walk of the subtree rooted at `root`.
    pub fn depth_first(&self, root: NodeId) -> DepthFirst<'_> {
        let stack = if self.contains(root) {
            vec![root]
        } else {
            Vec::new()
        };
        DepthFirst { graph: self, stack }
    }

    /// First node named `name` in a pre-order walk from `root`.
    pub fn find_by_name(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.depth_first(root).find(|&id| self.name(id) == Some(name))
    }

    /// Move the subtree rooted at `root` out of `other` and attach it under
    /// `parent` (or as a new top-level node). Node ids held by components
    /// are remapped.
    ///
    /// Returns the new id of `root`, or `None` if either id is stale.
    pub fn graft(
        &mut self,
        mut other: SceneGraph,
        root: NodeId,
        parent: Option<NodeId>,
    ) -> Option<NodeId> {
        if !other.contains(root) || parent.is_some_and(|p| !self.contains(p)) {
            return None;
        }
        let order: Vec<NodeId> = other.depth_first(root).collect();
        let mut mapping = HashMap::with_capacity(order.len());
        for &old in &order {
            let name = other.name(old).map(str::to_string);
            let new = self.create_node(name.as_deref());
            mapping.insert(old, new);
        }
        for &old in &order {
            let Some(node) = other.get_mut(old) else {
                continue;
            };
            let components = std::mem::take(&mut node.components);
            let local = node.local;
            let old_parent = node.parent;
            let new = mapping[&old];
            let target_parent = match old_parent.and_then(|p| mapping.get(&p)) {
                Some(&p) if old != root => Some(p),
                _ => parent,
            };
            if let Some(target_parent) = target_parent {
                self.set_parent(new, target_parent);
            }
            if let Some(target) = self.get_mut(new) {
                target.local = local;
                target.components = components.remapped(&mapping);
            }
        }
        mapping.get(&root).copied()
    }
}

/// Pre-order iterator returned by [`SceneGraph::depth_first`].
pub struct DepthFirst<'a> {
    graph: &'a SceneGraph,
    stack: Vec<NodeId>,
}

impl Iterator for DepthFirst<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.graph.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn translation(x: f32, y: f32, z: f32) -> Mat4 {
        Mat4::new_translation(&Vec3::new(x, y, z))
    }

    #[test]
    fn set_parent_moves_between_parents() {
        let mut graph = SceneGraph::new();
        let a = graph.create_node(Some("a"));
        let b = graph.create_node(Some("b"));
        let c = graph.create_node(Some("c"));
        assert!(graph.set_parent(c, a));
        assert!(graph.set_parent(c, b));
        assert!(graph.children(a).is_empty());
        assert_eq!(graph.children(b), &[c]);
        assert_eq!(graph.parent(c), Some(b));
    }

    #[test]
    fn cycles_are_refused() {
        let mut graph = SceneGraph::new();
        let a = graph.create_node(None);
        let b = graph.create_child(a, None);
        assert!(!graph.set_parent(a, b));
        assert!(!graph.set_parent(a, a));
        assert_eq!(graph.parent(a), None);
    }

    #[test]
    fn despawn_recursive_destroys_descendants() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node(Some("root"));
        let child = graph.create_child(root, Some("child"));
        let grandchild = graph.create_child(child, Some("grandchild"));
        let sibling = graph.create_child(root, Some("sibling"));

        graph.despawn_recursive(child);
        assert!(!graph.contains(child));
        assert!(!graph.contains(grandchild));
        assert_eq!(graph.children(root), &[sibling]);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn stale_ids_do_not_alias_reused_slots() {
        let mut graph = SceneGraph::new();
        let old = graph.create_node(Some("old"));
        graph.despawn_recursive(old);
        let new = graph.create_node(Some("new"));
        assert_eq!(old.index(), new.index());
        assert!(!graph.contains(old));
        assert_eq!(graph.name(new), Some("new"));
    }

    #[test]
    fn world_matrix_composes_parents() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node(None);
        let child = graph.create_child(root, None);
        graph.set_local_matrix(root, translation(1.0, 0.0, 0.0));
        graph.set_local_matrix(child, translation(0.0, 2.0, 0.0));
        let world = graph.world_matrix(child);
        assert_eq!(world, translation(1.0, 2.0, 0.0));
    }

    #[test]
    fn depth_first_is_pre_order() {
        let mut graph = SceneGraph::new();
        let r = graph.create_node(Some("r"));
        let a = graph.create_child(r, Some("a"));
        graph.create_child(a, Some("a1"));
        graph.create_child(r, Some("b"));
        let names: Vec<_> = graph
            .depth_first(r)
            .map(|id| graph.name(id).unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, ["r", "a", "a1", "b"]);
        assert_eq!(graph.find_by_name(r, "b").map(|id| graph.name(id)), Some(Some("b")));
    }

    #[test]
    fn graft_moves_subtree() {
        let mut detached = SceneGraph::new();
        let root = detached.create_node(Some("model"));
        let leaf = detached.create_child(root, Some("leaf"));
        detached.set_local_matrix(leaf, translation(0.0, 0.0, 3.0));

        let mut live = SceneGraph::new();
        let scene = live.create_node(Some("scene"));
        let grafted = live.graft(detached, root, Some(scene)).unwrap();

        assert_eq!(live.parent(grafted), Some(scene));
        let new_leaf = live.find_by_name(scene, "leaf").unwrap();
        assert_eq!(live.parent(new_leaf), Some(grafted));
        assert_eq!(live.local_matrix(new_leaf), translation(0.0, 0.0, 3.0));
    }
}
