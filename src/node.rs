use std::collections::BTreeMap;

use crate::{Age, NodeId};

/// A single node of a [`TimeTree`](crate::TimeTree): an age, an optional
/// label, free-form annotations, and links to parent and children.
///
/// Nodes live in their tree's arena and are addressed through [`NodeId`].
/// The fields are private and mutation goes through the tree, which is what
/// keeps the age invariant (`parent.age() >= child.age()`) enforceable at
/// every step. The parent link is a plain back-reference; children are the
/// owning direction.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    age: Age,
    label: Option<String>,
    annotations: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(id: NodeId, age: Age, label: Option<String>) -> Self {
        Self {
            id,
            age,
            label,
            annotations: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Id of this node within its tree.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Age in time units before the tree's reference point.
    pub fn age(&self) -> Age {
        self.age
    }

    /// Display label, if any. Anonymous nodes are permitted.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Id of the parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child ids in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// A node is a leaf iff it has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Annotation value stored under `key`, if any.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// All annotations, ordered by key.
    pub fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }

    pub(crate) fn set_age(&mut self, age: Age) {
        self.age = age;
    }

    pub(crate) fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    pub(crate) fn push_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    /// Removes `child` from the children list, reporting whether it was
    /// present.
    pub(crate) fn remove_child(&mut self, child: NodeId) -> bool {
        match self.children.iter().position(|&c| c == child) {
            Some(position) => {
                self.children.remove(position);
                true
            }
            None => false,
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeId> {
        &mut self.children
    }

    pub(crate) fn set_annotation(&mut self, key: String, value: String) {
        self.annotations.insert(key, value);
    }
}
