use std::{collections::VecDeque, ops::Deref};

use crate::{node::Node, NodeDepth, NodeId, TimeTree};

pub mod leaf;

/// A node yielded during traversal, carrying its depth below the traversal
/// origin. Dereferences to the [`Node`] itself.
pub struct IterNode<'iter> {
    depth: NodeDepth,
    node: &'iter Node,
}

impl<'iter> IterNode<'iter> {
    /// Depth below the traversal origin. The origin itself is depth 0.
    pub fn depth(&self) -> NodeDepth {
        self.depth
    }

    pub fn node(&self) -> &'iter Node {
        self.node
    }
}

impl Deref for IterNode<'_> {
    type Target = Node;

    fn deref(&self) -> &Self::Target {
        self.node
    }
}

/// Depth-first pre-order traversal over a subtree.
///
/// Pull-based over an explicit stack: children are pushed in reverse so
/// siblings come out left to right, and the depth rides along with every
/// entry. No recursion, so traversal depth never touches the call stack.
pub struct Descendants<'iter> {
    tree: &'iter TimeTree,
    stack: VecDeque<(NodeDepth, NodeId)>,
}

impl<'iter> Descendants<'iter> {
    pub(crate) fn new(tree: &'iter TimeTree, start: NodeId) -> Self {
        Self {
            tree,
            stack: VecDeque::from([(0, start)]),
        }
    }
}

impl<'iter> Iterator for Descendants<'iter> {
    type Item = IterNode<'iter>;

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, id) = self.stack.pop_front()?;
        let node = self.tree.get(id)?;
        node.children()
            .iter()
            .rev()
            .for_each(|child| self.stack.push_front((depth + 1, *child)));
        Some(IterNode { depth, node })
    }
}

/// Walks from a node's parent up to and including the root.
pub struct Ancestors<'iter> {
    tree: &'iter TimeTree,
    next: Option<NodeId>,
}

impl<'iter> Ancestors<'iter> {
    pub(crate) fn new(tree: &'iter TimeTree, start: NodeId) -> Self {
        let next = tree.get(start).and_then(Node::parent);
        Self { tree, next }
    }
}

impl<'iter> Iterator for Ancestors<'iter> {
    type Item = &'iter Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.tree.get(self.next?)?;
        self.next = node.parent();
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use crate::test::{find, sample_tree};

    #[test]
    fn test_preorder_with_depths() {
        let tree = sample_tree();
        let visited: Vec<(Option<String>, usize)> = tree
            .iter()
            .map(|node| (node.label().map(str::to_owned), node.depth()))
            .collect();

        assert_eq!(
            visited,
            vec![
                (None, 0),
                (Some("A".into()), 1),
                (None, 1),
                (Some("B".into()), 2),
                (Some("C".into()), 2),
            ]
        );
    }

    #[test]
    fn test_descendants_restartable() {
        let tree = sample_tree();
        let inner = tree.get(find(&tree, "B")).unwrap().parent().unwrap();

        let first: Vec<_> = tree.descendants(inner).unwrap().map(|n| n.id()).collect();
        let second: Vec<_> = tree.descendants(inner).unwrap().map(|n| n.id()).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0], inner);
    }

    #[test]
    fn test_ancestors_excludes_start_includes_root() {
        let tree = sample_tree();
        let b = find(&tree, "B");
        let chain: Vec<_> = tree.ancestors(b).unwrap().map(|node| node.id()).collect();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.last().copied(), Some(tree.root()));
        assert!(!chain.contains(&b));

        let from_root: Vec<_> = tree.ancestors(tree.root()).unwrap().collect();
        assert!(from_root.is_empty());
    }

    #[test]
    fn test_leaves_in_discovery_order() {
        let tree = sample_tree();
        let labels: Vec<_> = tree
            .leaves(tree.root())
            .unwrap()
            .map(|leaf| leaf.label().map(str::to_owned))
            .collect();
        assert_eq!(
            labels,
            vec![Some("A".into()), Some("B".into()), Some("C".into())]
        );
    }

    #[test]
    fn test_leaves_of_a_leaf_is_itself() {
        let tree = sample_tree();
        let a = find(&tree, "A");
        let ids: Vec<_> = tree.leaves(a).unwrap().map(|leaf| leaf.id()).collect();
        assert_eq!(ids, vec![a]);
    }
}
