//! Node registry — tracks which participants are visible to the coordinator.
//!
//! Registration assigns the node its identity. Deregistration keeps the
//! record but marks it offline: offline nodes disappear from listings and
//! can no longer pull or reply.

use std::sync::Arc;

use dashmap::DashMap;
use rand::Rng;
use tracing::info;

use rondo_core::{now_ms, LinkError, Node, NodeId};

/// Shared registry handle. Clones see the same state.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    nodes: Arc<DashMap<NodeId, Node>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new participant and return its assigned id.
    ///
    /// Ids are random non-zero 64-bit values; a collision with any id ever
    /// issued (online or not) is re-rolled.
    pub fn register(&self) -> NodeId {
        let mut rng = rand::thread_rng();
        let node_id = loop {
            let id: u64 = rng.gen();
            if id != 0 && !self.nodes.contains_key(&id) {
                break id;
            }
        };
        self.nodes.insert(node_id, Node::new(node_id, now_ms()));
        info!(node_id, "node registered");
        node_id
    }

    /// Take a node offline. Its in-flight tasks will time out unanswered.
    pub fn deregister(&self, node_id: NodeId) -> Result<(), LinkError> {
        match self.nodes.get_mut(&node_id) {
            Some(mut node) if node.online => {
                node.online = false;
                info!(node_id, "node deregistered");
                Ok(())
            }
            _ => Err(LinkError::NodeNotFound(node_id)),
        }
    }

    /// Is this node currently registered and online?
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes
            .get(&node_id)
            .map(|n| n.online)
            .unwrap_or(false)
    }

    /// Look up a node record, online or not.
    pub fn get(&self, node_id: NodeId) -> Option<Node> {
        self.nodes.get(&node_id).map(|n| n.clone())
    }

    /// Point-in-time snapshot of online node ids, in ascending order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.online)
            .map(|n| n.node_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Point-in-time snapshot of online node records, in id order.
    pub fn snapshot(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self
            .nodes
            .iter()
            .filter(|n| n.online)
            .map(|n| n.clone())
            .collect();
        nodes.sort_unstable_by_key(|n| n.node_id);
        nodes
    }

    /// Number of online nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.online).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
