//! /nodes handlers — registration surface.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use super::{encode_id, err_to_http, parse_node_id, ApiState};

// ── /nodes (POST) ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct RegisterResponse {
    pub node_id: String,
}

pub async fn handle_register(State(state): State<ApiState>) -> Json<RegisterResponse> {
    let node_id = state.gateway.register();
    Json(RegisterResponse {
        node_id: encode_id(node_id),
    })
}

// ── /nodes/{node_id} (DELETE) ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct DeregisterResponse {
    pub node_id: String,
}

pub async fn handle_deregister(
    State(state): State<ApiState>,
    Path(node_id): Path<String>,
) -> Result<Json<DeregisterResponse>, (StatusCode, String)> {
    let id = parse_node_id(&node_id)?;
    state.gateway.deregister(id).map_err(err_to_http)?;
    Ok(Json(DeregisterResponse { node_id }))
}

// ── /nodes (GET) ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct NodesResponse {
    pub count: usize,
    pub nodes: Vec<NodeJson>,
}

#[derive(Serialize)]
pub struct NodeJson {
    pub node_id: String,
    pub registered_at: u64,
}

pub async fn handle_nodes(State(state): State<ApiState>) -> Json<NodesResponse> {
    let nodes: Vec<NodeJson> = state
        .registry
        .snapshot()
        .into_iter()
        .map(|n| NodeJson {
            node_id: encode_id(n.node_id),
            registered_at: n.registered_at,
        })
        .collect();
    Json(NodesResponse {
        count: nodes.len(),
        nodes,
    })
}
