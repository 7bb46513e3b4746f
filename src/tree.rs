use std::collections::HashSet;

use generational_arena::Arena;
use tracing::debug;

use crate::{
    error::{TreeError, TreeResult},
    iterator::{leaf::Leaves, Ancestors, Descendants},
    newick::NewickParser,
    node::Node,
    Age, NodeId,
};

/// Tolerance used when ages are compared for equality.
pub(crate) const EPSILON: f64 = 1e-7;

/// A rooted, time-calibrated tree.
///
/// Every node carries an absolute age and ages never increase from root to
/// leaves: `parent.age() >= child.age()` along every edge, with equality
/// meaning a zero-length branch. Leaves need not share an age; the tree does
/// not have to be ultrametric.
///
/// All structural operations are all-or-nothing. They either complete with
/// the invariant holding or fail with a [`TreeError`] and leave the tree
/// exactly as it was. A tree owns its node arena outright, so cloning yields
/// an independent snapshot that can be mutated freely.
#[derive(Debug, Clone)]
pub struct TimeTree {
    arena: Arena<Node>,
    root: NodeId,
}

impl TimeTree {
    /// Builds a tree holding a single root node.
    ///
    /// Fails with [`TreeError::InvalidAge`] when `age` is not finite.
    pub fn create_root(age: Age, label: Option<&str>) -> TreeResult<Self> {
        if !age.is_finite() {
            return Err(TreeError::invalid_age(format!(
                "root age {age} is not finite"
            )));
        }
        let mut arena = Arena::new();
        let root = NodeId::new(arena.insert_with(|index| {
            Node::new(NodeId::new(index), age, label.map(str::to_owned))
        }));
        debug!(%root, age, "created root");
        Ok(Self { arena, root })
    }

    /// Parses bracketed Newick text with the root anchored at age 0.
    ///
    /// See [`NewickParser`] for the grammar and the other anchoring modes.
    pub fn from_newick(text: &str) -> TreeResult<Self> {
        NewickParser::new().parse(text)
    }

    /// Parses bracketed Newick text with the root anchored at `age`.
    pub fn from_newick_with_root_age(text: &str, age: Age) -> TreeResult<Self> {
        NewickParser::new().with_root_age(age).parse(text)
    }

    /// Id of the root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Immutable access to a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id.index())
    }

    pub(crate) fn get_checked(&self, id: NodeId) -> TreeResult<&Node> {
        self.get(id).ok_or(TreeError::UnknownNode { id })
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.arena.get_mut(id.index())
    }

    /// Whether `id` refers to a node of this tree.
    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id.index())
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Number of leaf nodes.
    pub fn num_leaves(&self) -> usize {
        self.arena.iter().filter(|(_, node)| node.is_leaf()).count()
    }

    /// Age of the node `id`.
    pub fn age(&self, id: NodeId) -> TreeResult<Age> {
        Ok(self.get_checked(id)?.age())
    }

    /// Label of the node `id`.
    pub fn label(&self, id: NodeId) -> TreeResult<Option<&str>> {
        Ok(self.get_checked(id)?.label())
    }

    /// Whether the node `id` is a leaf.
    pub fn is_leaf(&self, id: NodeId) -> TreeResult<bool> {
        Ok(self.get_checked(id)?.is_leaf())
    }

    /// Branch length from `id` up to its parent, `None` for the root.
    pub fn branch_length(&self, id: NodeId) -> TreeResult<Option<Age>> {
        let node = self.get_checked(id)?;
        match node.parent() {
            Some(parent) => Ok(Some(self.get_checked(parent)?.age() - node.age())),
            None => Ok(None),
        }
    }

    /// Replaces the label of `id`.
    pub fn set_label(&mut self, id: NodeId, label: Option<&str>) -> TreeResult<()> {
        match self.node_mut(id) {
            Some(node) => {
                node.set_label(label.map(str::to_owned));
                Ok(())
            }
            None => Err(TreeError::UnknownNode { id }),
        }
    }

    /// Stores annotation `key` = `value` on `id`, replacing any previous
    /// value for the key.
    pub fn annotate(&mut self, id: NodeId, key: &str, value: &str) -> TreeResult<()> {
        match self.node_mut(id) {
            Some(node) => {
                node.set_annotation(key.to_owned(), value.to_owned());
                Ok(())
            }
            None => Err(TreeError::UnknownNode { id }),
        }
    }

    /// Adds a child under `parent` and returns its id.
    ///
    /// The child is appended, so sibling order is insertion order and stays
    /// that way. Fails with [`TreeError::InvalidAge`] when `age` exceeds the
    /// parent's age or is not finite.
    pub fn add_child(&mut self, parent: NodeId, age: Age, label: Option<&str>) -> TreeResult<NodeId> {
        let parent_age = self.get_checked(parent)?.age();
        if !age.is_finite() {
            return Err(TreeError::invalid_age(format!("age {age} is not finite")));
        }
        if age > parent_age {
            return Err(TreeError::invalid_age(format!(
                "child age {age} exceeds parent age {parent_age}"
            )));
        }
        let child = NodeId::new(self.arena.insert_with(|index| {
            let mut node = Node::new(NodeId::new(index), age, label.map(str::to_owned));
            node.set_parent(Some(parent));
            node
        }));
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.push_child(child);
        }
        debug!(%parent, %child, age, "added child");
        Ok(child)
    }

    /// Detaches `id` from its parent and frees the whole subtree.
    ///
    /// The freed ids are never reissued by this tree. Fails with
    /// [`TreeError::RootRemoval`] when `id` is the root; use
    /// [`prune`](TimeTree::prune) to keep the detached piece instead.
    pub fn remove_subtree(&mut self, id: NodeId) -> TreeResult<()> {
        let parent = match self.get_checked(id)?.parent() {
            Some(parent) => parent,
            None => return Err(TreeError::RootRemoval),
        };
        let doomed: Vec<NodeId> = self.descendants(id)?.map(|node| node.id()).collect();
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.remove_child(id);
        }
        for dead in &doomed {
            let _ = self.arena.remove(dead.index());
        }
        debug!(%id, %parent, freed = doomed.len(), "removed subtree");
        Ok(())
    }

    /// Walks from the parent of `id` up to and including the root.
    pub fn ancestors(&self, id: NodeId) -> TreeResult<Ancestors<'_>> {
        self.get_checked(id)?;
        Ok(Ancestors::new(self, id))
    }

    /// Depth-first pre-order traversal of the subtree rooted at `id`,
    /// starting with `id` itself.
    ///
    /// The iterator is lazy and finite; call again for a fresh traversal.
    pub fn descendants(&self, id: NodeId) -> TreeResult<Descendants<'_>> {
        self.get_checked(id)?;
        Ok(Descendants::new(self, id))
    }

    /// Leaves of the subtree rooted at `id`, in discovery order.
    pub fn leaves(&self, id: NodeId) -> TreeResult<Leaves<'_>> {
        Ok(Leaves::new(self.descendants(id)?))
    }

    /// Pre-order traversal of the whole tree.
    pub fn iter(&self) -> Descendants<'_> {
        Descendants::new(self, self.root)
    }

    /// Checks every invariant on every node.
    ///
    /// Verified: ages are finite and never increase from parent to child,
    /// every node is reachable from the root exactly once, child lists and
    /// parent back-references agree, and the root has no parent. Fails with
    /// [`TreeError::InconsistentTree`] naming the offending node.
    pub fn validate(&self) -> TreeResult<()> {
        if self.arena.is_empty() {
            return Err(TreeError::EmptyTree);
        }
        let root = self
            .get(self.root)
            .ok_or_else(|| TreeError::inconsistent("root id is not present"))?;
        if root.parent().is_some() {
            return Err(TreeError::inconsistent("root has a parent"));
        }

        let mut visited: HashSet<NodeId> = HashSet::with_capacity(self.arena.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return Err(TreeError::inconsistent(format!(
                    "node {id} is reached more than once"
                )));
            }
            let node = self
                .get(id)
                .ok_or_else(|| TreeError::inconsistent(format!("dangling node id {id}")))?;
            if !node.age().is_finite() {
                return Err(TreeError::inconsistent(format!(
                    "node {id} has non-finite age {}",
                    node.age()
                )));
            }
            for &child in node.children() {
                let child_node = self
                    .get(child)
                    .ok_or_else(|| TreeError::inconsistent(format!("dangling child id {child}")))?;
                if child_node.parent() != Some(id) {
                    return Err(TreeError::inconsistent(format!(
                        "node {child} does not point back at its parent {id}"
                    )));
                }
                if child_node.age() > node.age() {
                    return Err(TreeError::inconsistent(format!(
                        "node {child} (age {}) is older than its parent {id} (age {})",
                        child_node.age(),
                        node.age()
                    )));
                }
                stack.push(child);
            }
        }
        if visited.len() != self.arena.len() {
            return Err(TreeError::inconsistent(format!(
                "{} of {} nodes reachable from the root",
                visited.len(),
                self.arena.len()
            )));
        }
        Ok(())
    }

    /// [`validate`](TimeTree::validate) as a predicate.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Whether all leaves share the same age within [`EPSILON`] tolerance.
    ///
    /// Ultrametricity is never required; this is a query, not an invariant.
    pub fn is_ultrametric(&self) -> bool {
        let mut ages = self.iter().filter(|node| node.is_leaf()).map(|node| node.age());
        match ages.next() {
            Some(first) => ages.all(|age| (age - first).abs() < EPSILON),
            None => true,
        }
    }

    pub(crate) fn set_root_id(&mut self, id: NodeId) {
        self.root = id;
    }

    /// Removes `child` from `parent`'s child list, leaving the back
    /// reference for the caller to rewrite.
    pub(crate) fn detach_edge(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        match self.node_mut(parent) {
            Some(node) => {
                if node.remove_child(child) {
                    Ok(())
                } else {
                    Err(TreeError::inconsistent(format!(
                        "node {child} is not a child of {parent}"
                    )))
                }
            }
            None => Err(TreeError::UnknownNode { id: parent }),
        }
    }

    /// Appends `child` under `parent` and points the back reference at it.
    pub(crate) fn attach_edge(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        self.get_checked(child)?;
        match self.node_mut(parent) {
            Some(node) => node.push_child(child),
            None => return Err(TreeError::UnknownNode { id: parent }),
        }
        if let Some(node) = self.node_mut(child) {
            node.set_parent(Some(parent));
        }
        Ok(())
    }

    pub(crate) fn clear_parent(&mut self, id: NodeId) -> TreeResult<()> {
        match self.node_mut(id) {
            Some(node) => {
                node.set_parent(None);
                Ok(())
            }
            None => Err(TreeError::UnknownNode { id }),
        }
    }

    pub(crate) fn map_ages(&mut self, f: impl Fn(Age) -> Age) {
        for (_, node) in self.arena.iter_mut() {
            let age = f(node.age());
            node.set_age(age);
        }
    }

    /// Largest age magnitude in the tree, used for overflow pre-checks.
    pub(crate) fn max_abs_age(&self) -> Age {
        self.arena
            .iter()
            .map(|(_, node)| node.age().abs())
            .fold(0.0, f64::max)
    }
}
