//! Task handlers — the code a virtual participant runs per task kind.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use rondo_core::{NodeId, Payload, TaskKind};

use crate::state::NodeState;

/// Immutable facts about the executing node, visible to every handler.
#[derive(Debug, Clone, Copy)]
pub struct ExecEnv {
    pub node_id: NodeId,
    /// This node's slice of the data, fixed for the engine's lifetime.
    pub partition_id: usize,
    pub num_partitions: usize,
}

/// Why an execution produced no result.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("no handler registered for {0} tasks")]
    NoHandler(&'static str),
    #[error("{0}")]
    Failed(String),
}

impl ExecError {
    pub fn failed(reason: impl Into<String>) -> Self {
        ExecError::Failed(reason.into())
    }
}

/// One task execution. Takes the node's state by value and returns the
/// reply payload plus the state to commit; on error the engine keeps the
/// state the node had before.
pub type TaskHandler =
    Arc<dyn Fn(ExecEnv, NodeState, Payload) -> Result<(Payload, NodeState), ExecError> + Send + Sync>;

/// Handlers keyed by task kind. Kinds without an entry fail their tasks
/// with [`ExecError::NoHandler`].
#[derive(Clone, Default)]
pub struct HandlerMap {
    handlers: HashMap<TaskKind, TaskHandler>,
}

impl HandlerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<F>(&mut self, kind: TaskKind, handler: F)
    where
        F: Fn(ExecEnv, NodeState, Payload) -> Result<(Payload, NodeState), ExecError>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(kind, Arc::new(handler));
    }

    /// Builder-style insert, for chained registration.
    pub fn with<F>(mut self, kind: TaskKind, handler: F) -> Self
    where
        F: Fn(ExecEnv, NodeState, Payload) -> Result<(Payload, NodeState), ExecError>
            + Send
            + Sync
            + 'static,
    {
        self.insert(kind, handler);
        self
    }

    pub fn get(&self, kind: TaskKind) -> Option<TaskHandler> {
        self.handlers.get(&kind).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
