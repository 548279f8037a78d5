//! Task store — single source of truth for every task and reply.
//!
//! All status transitions happen under the store's entry locks, so each
//! transition is observed exactly once no matter how many handles race.
//! `Pending → InFlight → {Replied | Errored | TimedOut}`; terminal states
//! are final.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use rondo_core::{now_ms, LinkError, NodeId, Reply, Task, TaskId, TaskRequest, TaskStatus};

/// Shared store handle. Clones see the same state.
#[derive(Clone)]
pub struct TaskStore {
    tasks: Arc<DashMap<TaskId, Task>>,
    /// Next id to assign. Monotonic, so id order is creation order.
    next_id: Arc<AtomicU64>,
    open: Arc<AtomicBool>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Insert one task in `Pending` status and return its id.
    pub fn create_task(&self, request: TaskRequest) -> Result<TaskId, LinkError> {
        if !self.is_open() {
            return Err(LinkError::StoreClosed);
        }
        let task_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let task = Task {
            task_id,
            run_id: request.run_id,
            group_id: request.group_id,
            src: request.src,
            dst: request.dst,
            kind: request.kind,
            payload: request.payload,
            created_at: now_ms(),
            ttl_ms: request.ttl_ms,
            status: TaskStatus::Pending,
            reply: None,
            pulled_at: None,
            resolved_at: None,
        };
        debug!(task_id, dst = task.dst, kind = task.kind.as_str(), "task created");
        self.tasks.insert(task_id, task);
        Ok(task_id)
    }

    /// Insert a group of tasks all-or-nothing. On failure nothing from the
    /// group remains in the store.
    pub fn create_tasks(&self, requests: Vec<TaskRequest>) -> Result<Vec<TaskId>, LinkError> {
        let mut task_ids = Vec::with_capacity(requests.len());
        for request in requests {
            match self.create_task(request) {
                Ok(id) => task_ids.push(id),
                Err(e) => {
                    for id in &task_ids {
                        self.tasks.remove(id);
                    }
                    return Err(e);
                }
            }
        }
        Ok(task_ids)
    }

    /// Hand out the pending tasks addressed to `node_id`, oldest first,
    /// flipping each to `InFlight`.
    ///
    /// Each task is delivered at most once across all concurrent pulls.
    /// Expired tasks are never delivered. A closed store hands out nothing.
    pub fn pull_for(&self, node_id: NodeId, limit: Option<usize>) -> Vec<Task> {
        if !self.is_open() {
            return Vec::new();
        }
        let now = now_ms();
        let mut candidates: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|t| t.dst == node_id && t.status == TaskStatus::Pending && !t.is_expired(now))
            .map(|t| t.task_id)
            .collect();
        candidates.sort_unstable();

        let max = limit.unwrap_or(usize::MAX);
        let mut pulled = Vec::new();
        for task_id in candidates {
            if pulled.len() >= max {
                break;
            }
            // Re-check under the entry lock: another pull may have won.
            if let Some(mut task) = self.tasks.get_mut(&task_id) {
                if task.status == TaskStatus::Pending && !task.is_expired(now) {
                    task.status = TaskStatus::InFlight;
                    task.pulled_at = Some(now);
                    pulled.push(task.clone());
                }
            }
        }
        pulled
    }

    /// Record the reply for a task and move it to its terminal status.
    ///
    /// The first accepted reply wins. Replies to resolved tasks are
    /// rejected; a reply to an expired task resolves it as `TimedOut` and
    /// is rejected the same way.
    pub fn submit_reply(&self, task_id: TaskId, reply: Reply) -> Result<(), LinkError> {
        if !self.is_open() {
            return Err(LinkError::StoreClosed);
        }
        let mut task = self
            .tasks
            .get_mut(&task_id)
            .ok_or(LinkError::TaskNotFound(task_id))?;
        if task.status.is_terminal() {
            return Err(LinkError::DuplicateReply(task_id));
        }
        let now = now_ms();
        if task.is_expired(now) {
            task.status = TaskStatus::TimedOut;
            task.resolved_at = Some(now);
            return Err(LinkError::DuplicateReply(task_id));
        }
        task.status = if reply.is_success() {
            TaskStatus::Replied
        } else {
            TaskStatus::Errored
        };
        task.reply = Some(reply);
        task.resolved_at = Some(now);
        debug!(task_id, status = ?task.status, "reply recorded");
        Ok(())
    }

    /// Look up a task by id.
    pub fn get(&self, task_id: TaskId) -> Option<Task> {
        self.tasks.get(&task_id).map(|t| t.clone())
    }

    /// Move every expired non-terminal task to `TimedOut`. Returns how many
    /// transitioned.
    pub fn reap_expired(&self) -> usize {
        let now = now_ms();
        let expired: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|t| !t.status.is_terminal() && t.is_expired(now))
            .map(|t| t.task_id)
            .collect();

        let mut reaped = 0;
        for task_id in expired {
            if let Some(mut task) = self.tasks.get_mut(&task_id) {
                if !task.status.is_terminal() && task.is_expired(now) {
                    task.status = TaskStatus::TimedOut;
                    task.resolved_at = Some(now);
                    reaped += 1;
                }
            }
        }
        if reaped > 0 {
            debug!(reaped, "expired tasks reaped");
        }
        reaped
    }

    /// Force a task to `TimedOut` regardless of its TTL. No-op on terminal
    /// or unknown tasks. Returns whether it transitioned.
    pub fn expire(&self, task_id: TaskId) -> bool {
        if let Some(mut task) = self.tasks.get_mut(&task_id) {
            if !task.status.is_terminal() {
                task.status = TaskStatus::TimedOut;
                task.resolved_at = Some(now_ms());
                return true;
            }
        }
        false
    }

    /// Remove consumed tasks. Returns how many were present.
    pub fn delete(&self, task_ids: &[TaskId]) -> usize {
        task_ids
            .iter()
            .filter(|id| self.tasks.remove(id).is_some())
            .count()
    }

    /// Stop intake: no new tasks, pulls, or replies. Reads and the
    /// coordinator's own cleanup (`expire`, `delete`) keep working so
    /// in-progress rounds can drain.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        debug!("task store closed");
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Number of task records currently held.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
