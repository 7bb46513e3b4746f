//! Plotting coordinates for a tree.
//!
//! The layout is a derived, disposable artifact: node positions on a
//! left-to-right timeline plus one orthogonal connector per edge, which is
//! the whole payload a renderer needs. Nothing here is stored back on the
//! tree, and the same tree always yields bit-identical coordinates.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    error::TreeResult,
    node::Node,
    Age, NodeId, TimeTree,
};

/// How leaves are assigned their vertical slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeafOrder {
    /// Depth-first discovery order, which follows sibling order.
    #[default]
    Insertion,
    /// Sorted by label; unlabeled leaves come last in discovery order.
    Alphabetical,
}

/// A point in plot space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
}

/// Where one node lands, along with what a renderer labels it with.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PlottedNode {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub age: Age,
    pub label: Option<String>,
}

/// Orthogonal connector from a node to its parent.
///
/// Three points: a horizontal run at the child's level from the child over
/// to the parent's x, then a vertical run up or down to the parent.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EdgePath {
    pub node: NodeId,
    pub parent: NodeId,
    pub points: [PlotPoint; 3],
}

/// The full renderer payload.
///
/// `nodes` is in pre-order, `edges` holds one connector per non-root node
/// in the same order. `time_span` is the distance from the root to the
/// youngest node along x; `leaf_count` is the number of vertical slots.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TreeLayout {
    pub nodes: Vec<PlottedNode>,
    pub edges: Vec<EdgePath>,
    pub time_span: f64,
    pub leaf_count: usize,
}

impl TreeLayout {
    /// Position of `id`, if it was part of the laid-out tree.
    pub fn position(&self, id: NodeId) -> Option<PlotPoint> {
        self.nodes
            .iter()
            .find(|plotted| plotted.id == id)
            .map(|plotted| PlotPoint {
                x: plotted.x,
                y: plotted.y,
            })
    }
}

/// Computes [`TreeLayout`]s.
///
/// x is age mapped onto a timeline, `root.age - node.age`, so the root
/// sits at x = 0 and younger nodes are strictly to the right of their
/// ancestors. y is the standard dendrogram rule: each leaf takes the next
/// free slot 0, 1, 2, … and every internal node sits at the arithmetic
/// mean of its children.
///
/// ```
/// use timetree::{LayoutEngine, TimeTree};
///
/// # fn main() -> Result<(), timetree::TreeError> {
/// let tree = TimeTree::from_newick_with_root_age("(A:1,(B:1,C:2):1);", 3.0)?;
/// let layout = LayoutEngine::new().layout(&tree)?;
/// assert_eq!(layout.time_span, 3.0);
/// assert_eq!(layout.leaf_count, 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutEngine {
    leaf_order: LeafOrder,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects how leaves are ordered along the vertical axis.
    pub fn with_leaf_order(mut self, order: LeafOrder) -> Self {
        self.leaf_order = order;
        self
    }

    /// Lays out `tree`.
    ///
    /// The tree is validated first; layout refuses to place an
    /// inconsistent or empty tree. Given equal trees (ages, topology,
    /// sibling order) the result is bit-identical between calls.
    pub fn layout(&self, tree: &TimeTree) -> TreeResult<TreeLayout> {
        tree.validate()?;
        let root_age = tree.age(tree.root())?;

        let order: Vec<NodeId> = tree.iter().map(|node| node.id()).collect();

        let mut leaf_ids: Vec<NodeId> = Vec::new();
        for &id in &order {
            if tree.get_checked(id)?.is_leaf() {
                leaf_ids.push(id);
            }
        }
        if self.leaf_order == LeafOrder::Alphabetical {
            // stable, so unlabeled leaves keep their discovery order
            leaf_ids.sort_by_key(|&id| {
                let label = tree.get(id).and_then(Node::label);
                (label.is_none(), label)
            });
        }
        let slots: HashMap<NodeId, f64> = leaf_ids
            .iter()
            .enumerate()
            .map(|(slot, &id)| (id, slot as f64))
            .collect();

        // reversed pre-order reaches every child before its parent
        let mut ys: HashMap<NodeId, f64> = HashMap::with_capacity(order.len());
        for &id in order.iter().rev() {
            let node = tree.get_checked(id)?;
            let y = if node.is_leaf() {
                slots.get(&id).copied().unwrap_or(0.0)
            } else {
                let sum: f64 = node
                    .children()
                    .iter()
                    .map(|child| ys.get(child).copied().unwrap_or(0.0))
                    .sum();
                sum / node.num_children() as f64
            };
            ys.insert(id, y);
        }

        let mut nodes = Vec::with_capacity(order.len());
        let mut edges = Vec::with_capacity(order.len().saturating_sub(1));
        let mut time_span = 0.0f64;
        for &id in &order {
            let node = tree.get_checked(id)?;
            let x = root_age - node.age();
            let y = ys.get(&id).copied().unwrap_or(0.0);
            time_span = time_span.max(x);
            nodes.push(PlottedNode {
                id,
                x,
                y,
                age: node.age(),
                label: node.label().map(str::to_owned),
            });
            if let Some(parent) = node.parent() {
                let parent_x = root_age - tree.get_checked(parent)?.age();
                let parent_y = ys.get(&parent).copied().unwrap_or(0.0);
                edges.push(EdgePath {
                    node: id,
                    parent,
                    points: [
                        PlotPoint { x, y },
                        PlotPoint { x: parent_x, y },
                        PlotPoint {
                            x: parent_x,
                            y: parent_y,
                        },
                    ],
                });
            }
        }

        debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            time_span,
            "computed layout"
        );
        Ok(TreeLayout {
            nodes,
            edges,
            time_span,
            leaf_count: leaf_ids.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test::{find, sample_tree};
    use crate::{TimeTree, TreeError};

    use super::*;

    #[test]
    fn test_sample_coordinates() {
        let tree = sample_tree();
        let layout = LayoutEngine::new().layout(&tree).unwrap();

        let a = find(&tree, "A");
        let b = find(&tree, "B");
        let c = find(&tree, "C");
        let inner = tree.get(b).unwrap().parent().unwrap();

        assert_eq!(
            layout.position(tree.root()),
            Some(PlotPoint { x: 0.0, y: 0.75 })
        );
        assert_eq!(layout.position(a), Some(PlotPoint { x: 1.0, y: 0.0 }));
        assert_eq!(layout.position(inner), Some(PlotPoint { x: 1.0, y: 1.5 }));
        assert_eq!(layout.position(b), Some(PlotPoint { x: 2.0, y: 1.0 }));
        assert_eq!(layout.position(c), Some(PlotPoint { x: 3.0, y: 2.0 }));

        assert_eq!(layout.time_span, 3.0);
        assert_eq!(layout.leaf_count, 3);
    }

    #[test]
    fn test_nodes_in_preorder_with_payload() {
        let tree = sample_tree();
        let layout = LayoutEngine::new().layout(&tree).unwrap();

        let labels: Vec<Option<&str>> = layout
            .nodes
            .iter()
            .map(|plotted| plotted.label.as_deref())
            .collect();
        assert_eq!(labels, vec![None, Some("A"), None, Some("B"), Some("C")]);

        let ages: Vec<f64> = layout.nodes.iter().map(|plotted| plotted.age).collect();
        assert_eq!(ages, vec![3.0, 2.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_edge_paths_are_orthogonal() {
        let tree = sample_tree();
        let layout = LayoutEngine::new().layout(&tree).unwrap();
        assert_eq!(layout.edges.len(), tree.len() - 1);

        let c = find(&tree, "C");
        let edge = layout.edges.iter().find(|edge| edge.node == c).unwrap();
        assert_eq!(
            edge.points,
            [
                PlotPoint { x: 3.0, y: 2.0 },
                PlotPoint { x: 1.0, y: 2.0 },
                PlotPoint { x: 1.0, y: 1.5 },
            ]
        );

        // no edge ever leads out of the root
        assert!(layout.edges.iter().all(|edge| edge.node != tree.root()));
    }

    #[test]
    fn test_layout_is_deterministic() {
        let tree = sample_tree();
        let engine = LayoutEngine::new();
        assert_eq!(engine.layout(&tree).unwrap(), engine.layout(&tree).unwrap());
    }

    #[test]
    fn test_alphabetical_leaf_order() {
        let mut tree = TimeTree::create_root(2.0, None).unwrap();
        tree.add_child(tree.root(), 0.0, Some("Z")).unwrap();
        tree.add_child(tree.root(), 0.0, None).unwrap();
        tree.add_child(tree.root(), 0.0, Some("B")).unwrap();

        let by_insertion = LayoutEngine::new().layout(&tree).unwrap();
        let by_label = LayoutEngine::new()
            .with_leaf_order(LeafOrder::Alphabetical)
            .layout(&tree)
            .unwrap();

        let z = find(&tree, "Z");
        let b = find(&tree, "B");
        assert_eq!(by_insertion.position(z).unwrap().y, 0.0);
        assert_eq!(by_insertion.position(b).unwrap().y, 2.0);
        // labeled leaves sorted, the unlabeled one takes the last slot
        assert_eq!(by_label.position(b).unwrap().y, 0.0);
        assert_eq!(by_label.position(z).unwrap().y, 1.0);
    }

    #[test]
    fn test_layout_follows_sibling_order() {
        let mut tree = sample_tree();
        let c = find(&tree, "C");
        let before = LayoutEngine::new().layout(&tree).unwrap();
        assert_eq!(before.position(c).unwrap().y, 2.0);

        tree.ladderize(true);
        let after = LayoutEngine::new().layout(&tree).unwrap();
        assert_eq!(after.position(c).unwrap().y, 2.0);

        tree.ladderize(false);
        let flipped = LayoutEngine::new().layout(&tree).unwrap();
        assert_eq!(flipped.position(c).unwrap().y, 1.0);
    }

    #[test]
    fn test_single_node_layout() {
        let tree = TimeTree::create_root(5.0, Some("only")).unwrap();
        let layout = LayoutEngine::new().layout(&tree).unwrap();

        assert_eq!(layout.nodes.len(), 1);
        assert!(layout.edges.is_empty());
        assert_eq!(layout.position(tree.root()), Some(PlotPoint { x: 0.0, y: 0.0 }));
        assert_eq!(layout.time_span, 0.0);
        assert_eq!(layout.leaf_count, 1);
    }

    #[test]
    fn test_layout_refuses_inconsistent_tree() {
        let mut tree = sample_tree();
        let b = find(&tree, "B");
        tree.node_mut(b).unwrap().set_age(99.0);
        assert!(matches!(
            LayoutEngine::new().layout(&tree),
            Err(TreeError::InconsistentTree { .. })
        ));
    }
}
