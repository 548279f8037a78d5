//! Task model — the unit of round-scoped work addressed to one node.
//!
//! A task is created by the coordinator, pulled by exactly one participant,
//! and resolved by exactly one reply (success or error) or by expiry. The
//! task store owns every record; everything here is the data model it owns.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::node::NodeId;
use crate::run::RunId;

/// Unique task identifier. Allocated monotonically per store, so ordering
/// by id is creation order.
pub type TaskId = u64;

// ── Kind and status ───────────────────────────────────────────────────────────

/// Request type discriminator. Closed set; execution backends dispatch on
/// this through a lookup table, never by inspecting payload contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Train,
    Evaluate,
    Query,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Train => "train",
            TaskKind::Evaluate => "evaluate",
            TaskKind::Query => "query",
        }
    }
}

/// Lifecycle status of a task.
///
/// `Pending → InFlight → {Replied | Errored | TimedOut}`. The three
/// terminal states are never left once entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet pulled by its addressee.
    Pending,
    /// Pulled by the addressee; a reply is expected.
    InFlight,
    /// Resolved with a success reply.
    Replied,
    /// Resolved with an error reply.
    Errored,
    /// Expired before any reply was accepted.
    TimedOut,
}

impl TaskStatus {
    /// Terminal statuses admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Replied | TaskStatus::Errored | TaskStatus::TimedOut
        )
    }
}

// ── Payload ───────────────────────────────────────────────────────────────────

/// Opaque task/reply content: a raw byte blob plus named typed records.
///
/// The schema of both halves is a collaborator concern. The core carries
/// payloads around without ever interpreting them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    /// Raw binary content (e.g. serialized parameters).
    pub content: Bytes,
    /// Structured records keyed by name (configs, metrics, and the like).
    pub records: serde_json::Map<String, serde_json::Value>,
}

impl Payload {
    /// Payload carrying only raw bytes.
    pub fn from_content(content: impl Into<Bytes>) -> Self {
        Self {
            content: content.into(),
            records: serde_json::Map::new(),
        }
    }

    /// Payload carrying only named records.
    pub fn from_records(records: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            content: Bytes::new(),
            records,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.records.is_empty()
    }
}

// ── Source and reply ──────────────────────────────────────────────────────────

/// Originator of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSource {
    /// The coordinator itself (the usual case).
    Coordinator,
    /// Another node, for replies routed node-to-node.
    Node(NodeId),
}

/// Terminal outcome recorded on a task. Immutable once written; the first
/// accepted reply wins and duplicates are rejected by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The participant produced a result.
    Success {
        payload: Payload,
        /// Wall-clock milliseconds the execution took.
        elapsed_ms: u64,
    },
    /// The participant's computation failed.
    Failure {
        /// Human-readable cause.
        reason: String,
    },
}

impl Reply {
    pub fn success(payload: Payload, elapsed_ms: u64) -> Self {
        Reply::Success {
            payload,
            elapsed_ms,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Reply::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Success { .. })
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// A unit of round-scoped work addressed to one node.
///
/// Records are owned exclusively by the task store; coordinator and
/// participants observe clones and mutate only through store methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub task_id: TaskId,
    pub run_id: RunId,
    /// Round/stage label. All tasks of one rendezvous share it.
    pub group_id: String,
    pub src: TaskSource,
    /// Addressee. Fixed at creation; tasks are never reassigned.
    pub dst: NodeId,
    pub kind: TaskKind,
    pub payload: Payload,
    /// Unix ms when the task was inserted.
    pub created_at: u64,
    /// Expiry horizon relative to `created_at`.
    pub ttl_ms: u64,
    pub status: TaskStatus,
    /// Present exactly when `status` is `Replied` or `Errored`.
    pub reply: Option<Reply>,
    /// Unix ms when the task was pulled, if it was.
    pub pulled_at: Option<u64>,
    /// Unix ms when the task reached a terminal status.
    pub resolved_at: Option<u64>,
}

impl Task {
    /// Has the task passed its expiry horizon at `now`?
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.created_at.saturating_add(self.ttl_ms)
    }
}

/// Everything needed to create one task. The store assigns the id, the
/// creation timestamp, and the initial `Pending` status.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub run_id: RunId,
    pub group_id: String,
    pub src: TaskSource,
    pub dst: NodeId,
    pub kind: TaskKind,
    pub payload: Payload,
    pub ttl_ms: u64,
}

impl TaskRequest {
    /// Coordinator-sourced request, the usual case.
    pub fn new(
        run_id: RunId,
        group_id: impl Into<String>,
        dst: NodeId,
        kind: TaskKind,
        payload: Payload,
        ttl_ms: u64,
    ) -> Self {
        Self {
            run_id,
            group_id: group_id.into(),
            src: TaskSource::Coordinator,
            dst,
            kind,
            payload,
            ttl_ms,
        }
    }
}
