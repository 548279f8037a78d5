//! Node identity — participants as the registry sees them.

/// Opaque node identifier. Random non-zero 64-bit value assigned by the
/// registry at registration; zero is reserved as "no node".
pub type NodeId = u64;

/// A registered participant.
#[derive(Debug, Clone)]
pub struct Node {
    pub node_id: NodeId,
    /// Unix ms of registration.
    pub registered_at: u64,
    /// False once the node deregisters. Offline nodes receive no new tasks.
    pub online: bool,
}

impl Node {
    pub fn new(node_id: NodeId, registered_at: u64) -> Self {
        Self {
            node_id,
            registered_at,
            online: true,
        }
    }
}
