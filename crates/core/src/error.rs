#![forbid(unsafe_code)]

use crate::model::NodeId;
use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a [`crate::TreeStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreFault {
    /// The store detected an isolation conflict (busy, locked, serialization failure).
    #[error("isolation conflict: {0}")]
    Conflict(String),

    #[error("store backend failure: {0}")]
    Backend(#[source] BoxedSource),
}

impl StoreFault {
    pub fn backend(err: impl Into<BoxedSource>) -> Self {
        Self::Backend(err.into())
    }
}

/// Errors surfaced by the maintenance engine. Every variant aborts the whole operation; the
/// enclosing unit of work is rolled back.
#[derive(Debug, Error)]
pub enum NestedError {
    #[error("parent node {parent} not found")]
    ParentNotFound { parent: NodeId },

    #[error("node {node} not found")]
    NodeNotFound { node: NodeId },

    #[error("cannot move node {node} under {target}: target lies inside the moved subtree")]
    CyclicMoveRejected { node: NodeId, target: NodeId },

    #[error("concurrent modification: {detail}")]
    ConcurrentModification { detail: String },

    #[error("store failure: {0}")]
    StoreFailure(#[source] BoxedSource),
}

impl NestedError {
    /// Only isolation conflicts are safe to re-issue as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

impl From<StoreFault> for NestedError {
    fn from(value: StoreFault) -> Self {
        match value {
            StoreFault::Conflict(detail) => Self::ConcurrentModification { detail },
            StoreFault::Backend(source) => Self::StoreFailure(source),
        }
    }
}
