//! A module providing builders for constructing trees programmatically.
//!
//! The `TreeBuilder` and `NodeBuilder` types let the code shape mirror the
//! tree shape: `root` adds the root and hands a `NodeBuilder` to a closure,
//! and each `child` call does the same one level down. Closures return
//! `Result<(), E>` for any `E: From<TreeError>`, so caller errors propagate
//! straight out of the build.

use std::marker::PhantomData;

use tracing::{debug, debug_span};

use crate::{error::TreeError, Age, NodeId, TimeTree};

/// A builder for adding children to one node during a build.
pub struct NodeBuilder<'a, E> {
    tree: &'a mut TimeTree,
    node: NodeId,
    _phantom: PhantomData<E>,
}

impl<'a, E> NodeBuilder<'a, E>
where
    E: From<TreeError>,
{
    fn new(tree: &'a mut TimeTree, node: NodeId) -> Self {
        Self {
            tree,
            node,
            _phantom: PhantomData,
        }
    }

    /// Adds a child of the current node, then calls `f` with the child's
    /// own builder.
    ///
    /// Fails with [`TreeError::InvalidAge`] when `age` is older than the
    /// current node's age.
    pub fn child<F>(&mut self, age: Age, label: Option<&str>, f: F) -> Result<NodeId, E>
    where
        F: FnOnce(&mut NodeBuilder<'_, E>) -> Result<(), E>,
    {
        let child = self.tree.add_child(self.node, age, label)?;
        let mut builder = NodeBuilder::new(self.tree, child);
        f(&mut builder)?;
        Ok(child)
    }

    /// Stores an annotation on the node being built.
    pub fn annotate(&mut self, key: &str, value: &str) -> Result<(), E> {
        self.tree.annotate(self.node, key, value)?;
        Ok(())
    }

    /// Id of the node being built.
    pub fn id(&self) -> NodeId {
        self.node
    }
}

/// A builder for constructing [`TimeTree`]s.
///
/// # Examples
///
/// ```
/// use timetree::{TreeBuilder, TreeError};
///
/// # fn main() -> Result<(), TreeError> {
/// let tree = TreeBuilder::<TreeError>::new()
///     .root(3.0, Some("root"), |root| {
///         root.child(2.0, Some("A"), |_| Ok(()))?;
///         root.child(2.0, None, |inner| {
///             inner.child(1.0, Some("B"), |_| Ok(()))?;
///             inner.child(0.0, Some("C"), |_| Ok(()))?;
///             Ok(())
///         })?;
///         Ok(())
///     })?
///     .done()?;
///
/// assert_eq!(tree.len(), 5);
/// assert!(tree.is_valid());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TreeBuilder<E = TreeError> {
    tree: Option<TimeTree>,
    debug_span: tracing::Span,
    _phantom: PhantomData<E>,
}

impl<E> TreeBuilder<E>
where
    E: From<TreeError>,
{
    /// Creates a new `TreeBuilder` instance.
    pub fn new() -> Self {
        let debug_span = debug_span!("TreeBuilder");
        debug_span.in_scope(|| debug!("created new TreeBuilder"));

        Self {
            tree: None,
            debug_span,
            _phantom: PhantomData,
        }
    }

    /// Adds the root node and calls `f` with its builder to populate the
    /// tree below it.
    ///
    /// Fails with [`TreeError::InvalidAge`] on a non-finite age and with
    /// [`TreeError::InconsistentTree`] when a root was already added.
    pub fn root<F>(mut self, age: Age, label: Option<&str>, f: F) -> Result<Self, E>
    where
        F: FnOnce(&mut NodeBuilder<'_, E>) -> Result<(), E>,
    {
        self.debug_span.in_scope(|| {
            if self.tree.is_some() {
                return Err(E::from(TreeError::inconsistent("root node already exists")));
            }
            let mut tree = TimeTree::create_root(age, label)?;
            let root = tree.root();
            let mut builder = NodeBuilder::new(&mut tree, root);
            f(&mut builder)?;
            debug!(%root, "added root");
            self.tree = Some(tree);
            Ok(())
        })?;
        Ok(self)
    }

    /// Returns the constructed tree when finished building it.
    ///
    /// Fails with [`TreeError::EmptyTree`] when no root was added.
    pub fn done(self) -> Result<TimeTree, E> {
        self.debug_span.in_scope(|| {
            debug!("finished building tree");
            self.tree.ok_or_else(|| E::from(TreeError::EmptyTree))
        })
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[traced_test]
    #[test]
    fn test_builder() {
        let tree = TreeBuilder::<TreeError>::new()
            .root(10.0, Some("root"), |root| {
                root.child(5.0, Some("left"), |left| {
                    left.child(1.0, Some("tip"), |_| Ok(()))?;
                    Ok(())
                })?;
                root.child(7.5, None, |_| Ok(()))?;
                Ok(())
            })
            .unwrap()
            .done()
            .unwrap();

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.num_leaves(), 2);
        assert!(tree.validate().is_ok());
        println!("{}", tree);
    }

    #[test]
    fn test_builder_propagates_age_violation() {
        let result = TreeBuilder::<TreeError>::new().root(1.0, None, |root| {
            root.child(5.0, Some("too old"), |_| Ok(()))?;
            Ok(())
        });
        assert!(matches!(result, Err(TreeError::InvalidAge { .. })));
    }

    #[test]
    fn test_builder_propagates_caller_errors() {
        #[derive(Debug)]
        enum MyError {
            Tree(TreeError),
            Fail(&'static str),
        }

        impl From<TreeError> for MyError {
            fn from(err: TreeError) -> Self {
                MyError::Tree(err)
            }
        }

        let result = TreeBuilder::<MyError>::new().root(1.0, None, |root| {
            root.child(0.5, None, |_| Err(MyError::Fail("boom")))?;
            Ok(())
        });
        assert!(matches!(result, Err(MyError::Fail("boom"))));
    }

    #[test]
    fn test_done_without_root_is_empty() {
        let result = TreeBuilder::<TreeError>::new().done();
        assert!(matches!(result, Err(TreeError::EmptyTree)));
    }

    #[test]
    fn test_double_root_rejected() {
        let result = TreeBuilder::<TreeError>::new()
            .root(1.0, None, |_| Ok(()))
            .unwrap()
            .root(2.0, None, |_| Ok(()));
        assert!(matches!(result, Err(TreeError::InconsistentTree { .. })));
    }

    #[test]
    fn test_builder_annotations() {
        let tree = TreeBuilder::<TreeError>::new()
            .root(2.0, None, |root| {
                root.annotate("rate", "0.3")?;
                root.child(1.0, Some("A"), |a| a.annotate("host", "bat"))?;
                Ok(())
            })
            .unwrap()
            .done()
            .unwrap();

        assert_eq!(tree.get(tree.root()).unwrap().annotation("rate"), Some("0.3"));
        let a = tree
            .iter()
            .find(|node| node.label() == Some("A"))
            .map(|node| node.id())
            .unwrap();
        assert_eq!(tree.get(a).unwrap().annotation("host"), Some("bat"));
    }
}
