//! /tasks handlers — pull and reply, the participant's working loop.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use rondo_core::{Payload, Reply, Task, TaskId, TaskKind, TaskSource, TaskStatus};

use super::{encode_id, err_to_http, parse_node_id, ApiState};

// ── /nodes/{node_id}/tasks/pull (POST) ────────────────────────────────────────

#[derive(Deserialize)]
pub struct PullParams {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct PullResponse {
    pub node_id: String,
    pub tasks: Vec<TaskJson>,
}

pub async fn handle_pull(
    State(state): State<ApiState>,
    Path(node_id): Path<String>,
    Query(params): Query<PullParams>,
) -> Result<Json<PullResponse>, (StatusCode, String)> {
    let id = parse_node_id(&node_id)?;
    let tasks = state
        .gateway
        .pull_tasks(id, params.limit)
        .map_err(err_to_http)?
        .into_iter()
        .map(task_to_json)
        .collect();
    Ok(Json(PullResponse { node_id, tasks }))
}

// ── /tasks/{task_id}/reply (POST) ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PushReplyRequest {
    /// Hex-encoded id of the replying node.
    pub node_id: String,
    pub success: bool,
    /// Hex-encoded reply content. Success only.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub records: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub elapsed_ms: Option<u64>,
    /// Failure cause. Failure only.
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct PushReplyResponse {
    pub task_id: TaskId,
}

pub async fn handle_reply(
    State(state): State<ApiState>,
    Path(task_id): Path<TaskId>,
    Json(req): Json<PushReplyRequest>,
) -> Result<Json<PushReplyResponse>, (StatusCode, String)> {
    let node_id = parse_node_id(&req.node_id)?;

    let reply = if req.success {
        let content = match &req.content {
            Some(hex_str) => Bytes::from(
                hex::decode(hex_str)
                    .map_err(|_| (StatusCode::BAD_REQUEST, "invalid hex content".to_string()))?,
            ),
            None => Bytes::new(),
        };
        let payload = Payload {
            content,
            records: req.records.unwrap_or_default(),
        };
        Reply::success(payload, req.elapsed_ms.unwrap_or(0))
    } else {
        Reply::failure(req.reason.unwrap_or_else(|| "unspecified failure".to_string()))
    };

    state
        .gateway
        .push_reply(node_id, task_id, reply)
        .map_err(err_to_http)?;
    Ok(Json(PushReplyResponse { task_id }))
}

// ── /tasks/{task_id} (GET) ────────────────────────────────────────────────────

pub async fn handle_get_task(
    State(state): State<ApiState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<TaskJson>, (StatusCode, String)> {
    match state.store.get(task_id) {
        Some(task) => Ok(Json(task_to_json(task))),
        None => Err((StatusCode::NOT_FOUND, format!("unknown task {task_id}"))),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct TaskJson {
    pub task_id: TaskId,
    pub run_id: String,
    pub group_id: String,
    pub src: String,
    pub dst: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    /// Hex-encoded payload content.
    pub content: String,
    pub records: serde_json::Map<String, serde_json::Value>,
    pub created_at: u64,
    pub ttl_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulled_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyJson>,
}

#[derive(Serialize)]
pub struct ReplyJson {
    pub success: bool,
    pub content: String,
    pub records: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn task_to_json(t: Task) -> TaskJson {
    let reply = t.reply.map(|r| match r {
        Reply::Success {
            payload,
            elapsed_ms,
        } => ReplyJson {
            success: true,
            content: hex::encode(&payload.content),
            records: payload.records,
            elapsed_ms: Some(elapsed_ms),
            reason: None,
        },
        Reply::Failure { reason } => ReplyJson {
            success: false,
            content: String::new(),
            records: serde_json::Map::new(),
            elapsed_ms: None,
            reason: Some(reason),
        },
    });
    TaskJson {
        task_id: t.task_id,
        run_id: encode_id(t.run_id),
        group_id: t.group_id,
        src: match t.src {
            TaskSource::Coordinator => "coordinator".to_string(),
            TaskSource::Node(id) => encode_id(id),
        },
        dst: encode_id(t.dst),
        kind: t.kind,
        status: t.status,
        content: hex::encode(&t.payload.content),
        records: t.payload.records,
        created_at: t.created_at,
        ttl_ms: t.ttl_ms,
        pulled_at: t.pulled_at,
        resolved_at: t.resolved_at,
        reply,
    }
}
