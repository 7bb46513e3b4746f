use crate::iterator::{Descendants, IterNode};

/// Leaves of a subtree, yielded in depth-first discovery order.
///
/// A filtering view over [`Descendants`]; a leaf is any node without
/// children, so a subtree consisting of a single node yields that node.
pub struct Leaves<'iter> {
    inner: Descendants<'iter>,
}

impl<'iter> Leaves<'iter> {
    pub(crate) fn new(inner: Descendants<'iter>) -> Self {
        Self { inner }
    }
}

impl<'iter> Iterator for Leaves<'iter> {
    type Item = IterNode<'iter>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.find(|node| node.is_leaf())
    }
}
