//! Participant gateway — the only surface a node may touch.
//!
//! Everything a participant does goes through here: join, leave, pull
//! work, push replies. The gateway owns the identity checks; the store
//! below it never sees an unregistered caller.

use tracing::debug;

use rondo_core::{LinkError, NodeId, Reply, Task, TaskId};

use crate::registry::NodeRegistry;
use crate::store::TaskStore;

/// In-process gateway over a shared registry and store. Clone-cheap; real
/// and virtual participants use the same one.
#[derive(Clone)]
pub struct LocalGateway {
    registry: NodeRegistry,
    store: TaskStore,
}

impl LocalGateway {
    pub fn new(registry: NodeRegistry, store: TaskStore) -> Self {
        Self { registry, store }
    }

    /// Join: returns the caller's assigned node id.
    pub fn register(&self) -> NodeId {
        self.registry.register()
    }

    /// Leave. Tasks already addressed to the node will time out.
    pub fn deregister(&self, node_id: NodeId) -> Result<(), LinkError> {
        self.registry.deregister(node_id)
    }

    /// Pull the pending tasks addressed to this node, oldest first.
    pub fn pull_tasks(
        &self,
        node_id: NodeId,
        limit: Option<usize>,
    ) -> Result<Vec<Task>, LinkError> {
        if !self.registry.contains(node_id) {
            return Err(LinkError::NodeNotFound(node_id));
        }
        let tasks = self.store.pull_for(node_id, limit);
        if !tasks.is_empty() {
            debug!(node_id, count = tasks.len(), "tasks pulled");
        }
        Ok(tasks)
    }

    /// Push the reply for a task this node pulled.
    ///
    /// A node can only answer tasks addressed to it; anything else reads as
    /// an unknown task.
    pub fn push_reply(
        &self,
        node_id: NodeId,
        task_id: TaskId,
        reply: Reply,
    ) -> Result<(), LinkError> {
        if !self.registry.contains(node_id) {
            return Err(LinkError::NodeNotFound(node_id));
        }
        match self.store.get(task_id) {
            Some(task) if task.dst == node_id => self.store.submit_reply(task_id, reply),
            Some(_) | None => Err(LinkError::TaskNotFound(task_id)),
        }
    }
}
