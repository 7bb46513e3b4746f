use thiserror::Error;

use crate::NodeId;

/// Errors reported by parsing, construction, surgery, and layout.
///
/// All failures are synchronous and final: nothing is retried, nothing is
/// downgraded to a warning, and no mutating call leaves a tree half-changed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    /// The input text violates the bracketed tree grammar.
    #[error("malformed tree description at position {position}: {reason}")]
    MalformedDescription { position: usize, reason: String },

    /// An operation would give a node an age incompatible with its place
    /// in the tree.
    #[error("invalid age: {reason}")]
    InvalidAge { reason: String },

    /// Rescaling requires a positive, finite factor.
    #[error("invalid scale factor: {factor}")]
    InvalidScale { factor: f64 },

    /// The root cannot be detached from its own tree.
    #[error("cannot remove the root node")]
    RootRemoval,

    /// A structural invariant does not hold.
    #[error("inconsistent tree: {reason}")]
    InconsistentTree { reason: String },

    /// The operation requires at least one node.
    #[error("tree is empty")]
    EmptyTree,

    /// The id does not refer to a node of this tree.
    #[error("unknown node {id}")]
    UnknownNode { id: NodeId },
}

impl TreeError {
    pub(crate) fn malformed(position: usize, reason: impl Into<String>) -> Self {
        TreeError::MalformedDescription {
            position,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_age(reason: impl Into<String>) -> Self {
        TreeError::InvalidAge {
            reason: reason.into(),
        }
    }

    pub(crate) fn inconsistent(reason: impl Into<String>) -> Self {
        TreeError::InconsistentTree {
            reason: reason.into(),
        }
    }
}

pub type TreeResult<T> = Result<T, TreeError>;
