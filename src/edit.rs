//! Structural surgery: prune, reroot, rescale, shift, ladderize.
//!
//! Every operation here is all-or-nothing. Preconditions are checked before
//! anything is touched, or the transform is built on a copy, validated, and
//! only then handed back; a failing call leaves the tree exactly as it was.

use std::cmp::Reverse;
use std::collections::HashMap;

use tracing::debug;

use crate::{
    error::{TreeError, TreeResult},
    Age, NodeId, TimeTree,
};

impl TimeTree {
    /// Detaches the subtree rooted at `id` and returns it as a standalone
    /// tree.
    ///
    /// The detached node becomes the new tree's root and its parent link is
    /// cleared; ages, labels, and annotations carry over. The detached
    /// nodes are re-keyed into a fresh arena, so ids taken from `self` do
    /// not address the returned tree. The remainder keeps its ids. Fails
    /// with [`TreeError::RootRemoval`] when `id` is the root.
    pub fn prune(&mut self, id: NodeId) -> TreeResult<TimeTree> {
        let node = self.get_checked(id)?;
        if node.parent().is_none() {
            return Err(TreeError::RootRemoval);
        }

        let mut detached = TimeTree::create_root(node.age(), node.label())?;
        for (key, value) in node.annotations() {
            detached.annotate(detached.root(), key, value)?;
        }

        let mut stack: Vec<(NodeId, NodeId)> = node
            .children()
            .iter()
            .rev()
            .map(|&child| (child, detached.root()))
            .collect();
        while let Some((old_id, new_parent)) = stack.pop() {
            let old = self.get_checked(old_id)?;
            let new_id = detached.add_child(new_parent, old.age(), old.label())?;
            for (key, value) in old.annotations() {
                detached.annotate(new_id, key, value)?;
            }
            for &child in old.children().iter().rev() {
                stack.push((child, new_id));
            }
        }

        detached.validate()?;
        self.remove_subtree(id)?;
        debug!(%id, detached = detached.len(), remaining = self.len(), "pruned subtree");
        Ok(detached)
    }

    /// Re-anchors the tree so `new_root` becomes the root, returning the
    /// rerooted tree and leaving `self` untouched.
    ///
    /// Ages are absolute and stay as they are; what changes is the
    /// direction of every edge on the path from the old root to
    /// `new_root`: each former ancestor is appended as the last child of
    /// the node that used to be its child. That reversal is only
    /// age-compatible when the nodes along the path share their age
    /// (zero-length branches); otherwise some reversed edge would point
    /// from a younger parent to an older child and the call fails with
    /// [`TreeError::InconsistentTree`]. Ages are never flipped or
    /// recomputed to force the move.
    ///
    /// Node ids carry over unchanged. Rerooting at the current root
    /// returns a plain copy.
    pub fn reroot(&self, new_root: NodeId) -> TreeResult<TimeTree> {
        self.get_checked(new_root)?;
        if new_root == self.root() {
            return Ok(self.clone());
        }

        // path from the old root down to new_root
        let mut path: Vec<NodeId> = self.ancestors(new_root)?.map(|node| node.id()).collect();
        path.reverse();
        path.push(new_root);

        let mut tree = self.clone();
        for pair in path.windows(2) {
            let (parent, child) = (pair[0], pair[1]);
            tree.detach_edge(parent, child)?;
            tree.attach_edge(child, parent)?;
        }
        tree.clear_parent(new_root)?;
        tree.set_root_id(new_root);

        tree.validate()?;
        debug!(%new_root, path = path.len(), "rerooted tree");
        Ok(tree)
    }

    /// Multiplies every age by `factor`.
    ///
    /// Monotonicity is scale-invariant for positive factors, so the tree
    /// stays valid. Fails with [`TreeError::InvalidScale`] when the factor
    /// is zero, negative, or not finite, and with
    /// [`TreeError::InvalidAge`] when the product would overflow.
    pub fn rescale(&mut self, factor: Age) -> TreeResult<()> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(TreeError::InvalidScale { factor });
        }
        self.validate()?;
        if !(self.max_abs_age() * factor).is_finite() {
            return Err(TreeError::invalid_age(format!(
                "rescaling by {factor} would make ages non-finite"
            )));
        }
        // scaling by a positive factor is monotone, so the age invariant
        // survives without a second validation pass
        self.map_ages(|age| age * factor);
        debug!(factor, "rescaled ages");
        Ok(())
    }

    /// Adds `offset` to every age; any sign is allowed.
    ///
    /// A uniform shift never reorders parents and children. Ages may go
    /// negative, which simply reads as timestamps on the far side of the
    /// reference point.
    pub fn shift(&mut self, offset: Age) -> TreeResult<()> {
        if !offset.is_finite() {
            return Err(TreeError::invalid_age(format!(
                "shift offset {offset} is not finite"
            )));
        }
        self.validate()?;
        if !(self.max_abs_age() + offset.abs()).is_finite() {
            return Err(TreeError::invalid_age(format!(
                "shifting by {offset} would make ages non-finite"
            )));
        }
        self.map_ages(|age| age + offset);
        debug!(offset, "shifted ages");
        Ok(())
    }

    /// Reorders every node's children by subtree size (number of nodes in
    /// the clade, the clade root included).
    ///
    /// `increasing` puts smaller clades first. Ties keep their current
    /// order. Ages and topology are untouched; only sibling order changes,
    /// which is exactly what the layout reads for leaf placement.
    pub fn ladderize(&mut self, increasing: bool) {
        let order: Vec<NodeId> = self.iter().map(|node| node.id()).collect();

        // reversed pre-order visits children before parents
        let mut sizes: HashMap<NodeId, usize> = HashMap::with_capacity(order.len());
        for &id in order.iter().rev() {
            let children_total: usize = match self.get(id) {
                Some(node) => node
                    .children()
                    .iter()
                    .map(|child| sizes.get(child).copied().unwrap_or(0))
                    .sum(),
                None => 0,
            };
            sizes.insert(id, 1 + children_total);
        }

        for &id in &order {
            if let Some(node) = self.node_mut(id) {
                if increasing {
                    node.children_mut()
                        .sort_by_key(|child| sizes.get(child).copied().unwrap_or(0));
                } else {
                    node.children_mut()
                        .sort_by_key(|child| Reverse(sizes.get(child).copied().unwrap_or(0)));
                }
            }
        }
        debug!(increasing, "ladderized children");
    }
}
