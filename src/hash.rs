//! Content fingerprints.
//!
//! A fingerprint digests labels, ages, and annotations over the whole
//! topology, so two trees built through different call sequences still
//! compare equal when they describe the same tree. Node ids never enter
//! the digest; they are arena bookkeeping, not content.

use std::collections::HashMap;
use std::hash::Hasher;

use xxhash_rust::xxh64::Xxh64;

use crate::{
    error::TreeResult,
    iterator::Descendants,
    node::Node,
    NodeId, TimeTree,
};

fn hash_node(node: &Node, hasher: &mut Xxh64) {
    match node.label() {
        Some(label) => {
            hasher.write_u8(1);
            hasher.write(label.as_bytes());
        }
        None => hasher.write_u8(0),
    }
    hasher.write_u64(node.age().to_bits());
    for (key, value) in node.annotations() {
        hasher.write(key.as_bytes());
        hasher.write_u8(b'=');
        hasher.write(value.as_bytes());
        hasher.write_u8(b';');
    }
}

impl TimeTree {
    fn subtree_hash(&self, start: NodeId, canonical: bool) -> u64 {
        let order: Vec<NodeId> = Descendants::new(self, start).map(|node| node.id()).collect();

        // reversed pre-order, so every child digest exists before its parent
        let mut digests: HashMap<NodeId, u64> = HashMap::with_capacity(order.len());
        for &id in order.iter().rev() {
            let Some(node) = self.get(id) else { continue };
            let mut hasher = Xxh64::new(0);
            hash_node(node, &mut hasher);

            let mut children: Vec<u64> = node
                .children()
                .iter()
                .map(|child| digests.get(child).copied().unwrap_or(0))
                .collect();
            if canonical {
                children.sort_unstable();
            }
            for digest in children {
                hasher.write_u64(digest);
            }
            digests.insert(id, hasher.finish());
        }
        digests.get(&start).copied().unwrap_or(0)
    }

    /// Digest of the whole tree, sensitive to sibling order.
    pub fn fingerprint(&self) -> u64 {
        self.subtree_hash(self.root(), false)
    }

    /// Digest of the whole tree with child digests sorted at every node,
    /// so trees that differ only in sibling order compare equal. Rerooting
    /// back and forth lands on the same canonical fingerprint.
    pub fn canonical_fingerprint(&self) -> u64 {
        self.subtree_hash(self.root(), true)
    }

    /// Digest of the subtree rooted at `id`, sensitive to sibling order.
    ///
    /// Detaching the subtree with [`prune`](TimeTree::prune) yields a tree
    /// whose [`fingerprint`](TimeTree::fingerprint) equals this digest.
    pub fn subtree_digest(&self, id: NodeId) -> TreeResult<u64> {
        self.get_checked(id)?;
        Ok(self.subtree_hash(id, false))
    }
}

/// Equality is fingerprint equality: same topology, sibling order,
/// labels, ages, and annotations, regardless of node ids.
impl PartialEq for TimeTree {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint() == other.fingerprint()
    }
}

#[cfg(test)]
mod tests {
    use crate::test::{find, sample_tree};
    use crate::{TimeTree, TreeError};

    #[test]
    fn test_equal_content_equal_fingerprint() {
        let one = sample_tree();
        let two = sample_tree();
        assert_eq!(one.fingerprint(), two.fingerprint());
        assert_eq!(one, two);
    }

    #[test]
    fn test_label_changes_fingerprint() {
        let one = sample_tree();
        let mut two = sample_tree();
        two.set_label(find(&two, "C"), Some("Z")).unwrap();
        assert_ne!(one.fingerprint(), two.fingerprint());
        assert_ne!(one, two);
    }

    #[test]
    fn test_age_changes_fingerprint() {
        let one = sample_tree();
        let mut two = sample_tree();
        two.rescale(2.0).unwrap();
        assert_ne!(one.fingerprint(), two.fingerprint());
    }

    #[test]
    fn test_annotation_changes_fingerprint() {
        let one = sample_tree();
        let mut two = sample_tree();
        two.annotate(find(&two, "B"), "rate", "0.3").unwrap();
        assert_ne!(one.fingerprint(), two.fingerprint());
    }

    #[test]
    fn test_canonical_ignores_sibling_order() {
        let mut forward = TimeTree::create_root(1.0, None).unwrap();
        forward.add_child(forward.root(), 0.0, Some("X")).unwrap();
        forward.add_child(forward.root(), 0.5, Some("Y")).unwrap();

        let mut reversed = TimeTree::create_root(1.0, None).unwrap();
        reversed.add_child(reversed.root(), 0.5, Some("Y")).unwrap();
        reversed.add_child(reversed.root(), 0.0, Some("X")).unwrap();

        assert_ne!(forward.fingerprint(), reversed.fingerprint());
        assert_eq!(
            forward.canonical_fingerprint(),
            reversed.canonical_fingerprint()
        );
    }

    #[test]
    fn test_subtree_digest_matches_pruned_tree() {
        let mut tree = sample_tree();
        let inner = tree.get(find(&tree, "B")).unwrap().parent().unwrap();
        let digest = tree.subtree_digest(inner).unwrap();

        let detached = tree.prune(inner).unwrap();
        assert_eq!(detached.fingerprint(), digest);
    }

    #[test]
    fn test_subtree_digest_unknown_node() {
        let mut tree = sample_tree();
        let c = find(&tree, "C");
        tree.remove_subtree(c).unwrap();
        assert!(matches!(
            tree.subtree_digest(c),
            Err(TreeError::UnknownNode { .. })
        ));
    }
}
