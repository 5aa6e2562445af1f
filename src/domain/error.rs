//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::arena::NodeId;

/// Errors raised by structural operations on a [`SaniTree`](crate::domain::SaniTree).
///
/// All variants leave the tree unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node not found in tree: {0}")]
    NotFound(NodeId),

    #[error("cannot detach the root node, use replace_root instead")]
    RootDetach,

    #[error("structural violation: {reason}")]
    StructuralViolation { reason: String },
}

impl TreeError {
    pub(crate) fn violation(reason: impl Into<String>) -> Self {
        Self::StructuralViolation {
            reason: reason.into(),
        }
    }
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
