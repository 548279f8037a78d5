//! Error taxonomy for the coordination layer.

use thiserror::Error;

use crate::node::NodeId;
use crate::task::TaskId;

/// Errors surfaced by the registry, store, and gateway.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    /// The node is not registered (or already deregistered).
    #[error("unknown node {0}")]
    NodeNotFound(NodeId),

    /// No task with this id exists in the store.
    #[error("unknown task {0}")]
    TaskNotFound(TaskId),

    /// A reply was already recorded, or the task expired first.
    #[error("task {0} is already resolved")]
    DuplicateReply(TaskId),

    /// The store was shut down; no further writes are accepted.
    #[error("task store is closed")]
    StoreClosed,
}
