//! Scene graph nodes
//!
//! Nodes live in a [`NodeTree`] arena and refer to each other by [`NodeKey`].
//! A node owns its local transform and the keys of the components attached
//! to it; the components themselves live in the scene's local registry.

use crate::foundation::collections::{ComponentKey, NodeKey, SlotMap};
use crate::foundation::math::{Mat4, Transform};

/// One element of the scene hierarchy
#[derive(Debug, Clone, Default)]
pub struct Node {
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
    components: Vec<ComponentKey>,
    index: usize,
    /// Transform relative to the parent
    pub transform: Transform,
    /// Optional display name
    pub name: Option<String>,
}

impl Node {
    /// Parent node, `None` for roots
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Direct children in insertion order
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Attached components in attach order
    pub fn components(&self) -> &[ComponentKey] {
        &self.components
    }

    /// Position in the tree's creation order
    pub fn index(&self) -> usize {
        self.index
    }

    /// Local transform as a matrix
    pub fn local_matrix(&self) -> Mat4 {
        self.transform.to_matrix()
    }
}

/// Arena owning every node of a scene
#[derive(Debug, Default)]
pub struct NodeTree {
    nodes: SlotMap<NodeKey, Node>,
    roots: Vec<NodeKey>,
    linear: Vec<NodeKey>,
}

impl NodeTree {
    /// Empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node under `parent`, or a root when `parent` is `None`
    ///
    /// # Panics
    /// If `parent` is not a node of this tree.
    pub fn insert(&mut self, parent: Option<NodeKey>) -> NodeKey {
        if let Some(parent) = parent {
            assert!(self.nodes.contains_key(parent), "parent {parent:?} is not a node of this tree");
        }

        let key = self.nodes.insert(Node {
            parent,
            index: self.linear.len(),
            ..Default::default()
        });
        self.linear.push(key);
        match parent.and_then(|parent| self.nodes.get_mut(parent)) {
            Some(parent) => parent.children.push(key),
            None => self.roots.push(key),
        }
        key
    }

    /// Remove `key` and its whole subtree
    ///
    /// Returns the keys of every component attached to a removed node,
    /// children before parents.
    pub fn remove(&mut self, key: NodeKey) -> Vec<ComponentKey> {
        let Some(node) = self.nodes.get(key) else {
            return Vec::new();
        };
        match node.parent.and_then(|parent| self.nodes.get_mut(parent)) {
            Some(parent) => parent.children.retain(|&child| child != key),
            None => self.roots.retain(|&root| root != key),
        }

        let mut components = Vec::new();
        self.remove_subtree(key, &mut components);

        self.linear.retain(|&node| self.nodes.contains_key(node));
        for (index, &node) in self.linear.iter().enumerate() {
            if let Some(node) = self.nodes.get_mut(node) {
                node.index = index;
            }
        }
        components
    }

    fn remove_subtree(&mut self, key: NodeKey, components: &mut Vec<ComponentKey>) {
        if let Some(node) = self.nodes.remove(key) {
            for child in node.children {
                self.remove_subtree(child, components);
            }
            components.extend(node.components.into_iter().rev());
        }
    }

    /// Node by key
    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Mutable node by key
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// Whether `key` is a live node
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Node key at `index` in creation order
    pub fn node_by_index(&self, index: usize) -> Option<NodeKey> {
        self.linear.get(index).copied()
    }

    /// Root nodes in creation order
    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in creation order
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.linear
            .iter()
            .filter_map(|&key| self.nodes.get(key).map(|node| (key, node)))
    }

    /// Transform from node space to scene space
    pub fn world_matrix(&self, key: NodeKey) -> Option<Mat4> {
        let mut node = self.nodes.get(key)?;
        let mut matrix = node.local_matrix();
        while let Some(parent) = node.parent.and_then(|parent| self.nodes.get(parent)) {
            matrix = parent.local_matrix() * matrix;
            node = parent;
        }
        Some(matrix)
    }

    /// Drop every node; returns all attached component keys
    pub fn clear(&mut self) -> Vec<ComponentKey> {
        let components = self
            .linear
            .iter()
            .rev()
            .filter_map(|&key| self.nodes.get(key))
            .flat_map(|node| node.components.iter().rev().copied())
            .collect();
        self.nodes.clear();
        self.roots.clear();
        self.linear.clear();
        components
    }

    pub(crate) fn attach_component(&mut self, node: NodeKey, component: ComponentKey) -> bool {
        match self.nodes.get_mut(node) {
            Some(node) => {
                node.components.push(component);
                true
            }
            None => false,
        }
    }

    pub(crate) fn detach_component(&mut self, node: NodeKey, component: ComponentKey) {
        if let Some(node) = self.nodes.get_mut(node) {
            node.components.retain(|&key| key != component);
        }
    }
}
