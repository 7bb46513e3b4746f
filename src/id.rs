use std::cmp::Ordering;

use generational_arena::Index;

/// Opaque identifier of a node within a [`TimeTree`](crate::TimeTree).
///
/// Ids are generational arena indices: stable for as long as the node lives
/// in its tree, and never handed out again for a different node even after
/// the slot is freed by pruning. An id is only meaningful to the tree that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Index);

impl NodeId {
    pub(crate) fn new(index: Index) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> Index {
        self.0
    }
}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.into_raw_parts().cmp(&other.0.into_raw_parts())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (index, generation) = self.0.into_raw_parts();
        if generation == 0 {
            write!(f, "{}", index)
        } else {
            write!(f, "{}v{}", index, generation)
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for NodeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.into_raw_parts().serialize(serializer)
    }
}
