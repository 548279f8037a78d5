//! HTTP API handlers — the participant gateway as JSON over HTTP.

pub mod nodes;
pub mod status;
pub mod tasks;

use axum::http::StatusCode;

use rondo_core::{LinkError, NodeId};
use rondo_link::{LocalGateway, NodeRegistry, TaskStore};

#[derive(Clone)]
pub struct ApiState {
    pub gateway: LocalGateway,
    pub registry: NodeRegistry,
    pub store: TaskStore,
}

impl ApiState {
    pub fn new(registry: NodeRegistry, store: TaskStore) -> Self {
        Self {
            gateway: LocalGateway::new(registry.clone(), store.clone()),
            registry,
            store,
        }
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Ids are random 64-bit values; on the wire they travel as 16 hex chars so
/// clients never round them through a float.
fn encode_id(id: u64) -> String {
    hex::encode(id.to_be_bytes())
}

/// Parse a hex-encoded 8-byte node id.
fn parse_node_id(hex_str: &str) -> Result<NodeId, (StatusCode, String)> {
    let bytes = hex::decode(hex_str)
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid hex".to_string()))?;
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| (StatusCode::BAD_REQUEST, "node id must be 8 bytes".to_string()))?;
    Ok(NodeId::from_be_bytes(arr))
}

/// Map a link error onto the HTTP surface.
fn err_to_http(err: LinkError) -> (StatusCode, String) {
    let code = match err {
        LinkError::NodeNotFound(_) | LinkError::TaskNotFound(_) => StatusCode::NOT_FOUND,
        LinkError::DuplicateReply(_) => StatusCode::CONFLICT,
        LinkError::StoreClosed => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, err.to_string())
}

// Handler re-exports for the router.
pub use nodes::{handle_deregister, handle_nodes, handle_register};
pub use status::handle_status;
pub use tasks::{handle_get_task, handle_pull, handle_reply};
