//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::application::filter::BoxError;
use crate::domain::{NodePath, TreeError};

/// Application errors wrap domain errors and add filter-evaluation context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Tree(#[from] TreeError),

    /// A filter failed while deciding a node. `path` addresses the node in
    /// the tree as it was before `apply` started.
    #[error("filter '{filter}' failed at {path}: {source}")]
    Evaluation {
        path: NodePath,
        filter: String,
        #[source]
        source: BoxError,
    },

    #[error("config error: {message}")]
    Config { message: String },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
