//! /status handler — one-look health of the link.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::ApiState;

#[derive(Serialize)]
pub struct StatusResponse {
    pub nodes_online: usize,
    /// Task records currently held, any status.
    pub tasks_held: usize,
    pub store_open: bool,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        nodes_online: state.registry.len(),
        tasks_held: state.store.len(),
        store_open: state.store.is_open(),
    })
}
