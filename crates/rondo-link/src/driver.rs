//! Coordinator — opens rounds, waits for replies, and closes the books.
//!
//! `send_and_receive` is the round rendezvous: insert one task per
//! recipient as a unit, poll the store until every task is terminal or the
//! deadline passes, then report one outcome per input slot in input order.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use rondo_core::config::CoordinatorSettings;
use rondo_core::{
    now_ms, LinkError, NodeId, Payload, Reply, Run, RunConfig, RunId, TaskId, TaskKind,
    TaskRequest, TaskSource, TaskStatus,
};

use crate::registry::NodeRegistry;
use crate::store::TaskStore;

/// One outbound request slot of a round.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub dst: NodeId,
    pub kind: TaskKind,
    pub payload: Payload,
}

impl Outgoing {
    pub fn new(dst: NodeId, kind: TaskKind, payload: Payload) -> Self {
        Self { dst, kind, payload }
    }
}

/// What became of one request slot.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The node replied successfully.
    Replied { payload: Payload, elapsed_ms: u64 },
    /// The node reported a failure. Distinct from silence: the node was
    /// reachable, its computation was not.
    Errored { reason: String },
    /// No reply arrived before the deadline.
    Absent,
}

impl Outcome {
    pub fn is_replied(&self) -> bool {
        matches!(self, Outcome::Replied { .. })
    }

    /// Reply payload, when there is one.
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Outcome::Replied { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

/// Outcome of one request slot, in the same position as its input.
#[derive(Debug, Clone)]
pub struct RoundResult {
    pub task_id: TaskId,
    pub node_id: NodeId,
    pub outcome: Outcome,
}

/// The coordinator's driving handle for one run.
pub struct Coordinator {
    store: TaskStore,
    registry: NodeRegistry,
    run: Run,
    settings: CoordinatorSettings,
}

impl Coordinator {
    /// Start a run over the given store and registry.
    pub fn new(
        store: TaskStore,
        registry: NodeRegistry,
        config: RunConfig,
        settings: CoordinatorSettings,
    ) -> Self {
        let run = Run::new(config, now_ms());
        info!(run_id = run.run_id, "run started");
        Self {
            store,
            registry,
            run,
            settings,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run.run_id
    }

    pub fn run(&self) -> &Run {
        &self.run
    }

    /// Snapshot of currently registered node ids.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.registry.node_ids()
    }

    /// Mark the run finished. Rounds already returned stay valid.
    pub fn finish(&mut self) {
        self.run.finish();
        info!(run_id = self.run.run_id, "run finished");
    }

    /// Run one round: deliver each request to its node and gather replies.
    ///
    /// Returns when every slot is resolved or `timeout` elapses, whichever
    /// comes first, with exactly one [`Outcome`] per input slot in input
    /// order. Slots unresolved at the deadline come back [`Outcome::Absent`]
    /// and their tasks are expired in the store. Records whose results were
    /// handed to the caller are deleted before returning; timed-out records
    /// stay behind so stragglers remain visible.
    pub async fn send_and_receive(
        &self,
        group_id: &str,
        outgoing: Vec<Outgoing>,
        timeout: Option<Duration>,
    ) -> Result<Vec<RoundResult>, LinkError> {
        if outgoing.is_empty() {
            return Ok(Vec::new());
        }
        let timeout =
            timeout.unwrap_or_else(|| Duration::from_millis(self.settings.round_timeout_ms));
        let ttl_ms = timeout.as_millis() as u64;

        let dsts: Vec<NodeId> = outgoing.iter().map(|o| o.dst).collect();
        let requests: Vec<TaskRequest> = outgoing
            .into_iter()
            .map(|o| TaskRequest {
                run_id: self.run.run_id,
                group_id: group_id.to_string(),
                src: TaskSource::Coordinator,
                dst: o.dst,
                kind: o.kind,
                payload: o.payload,
                ttl_ms,
            })
            .collect();

        // All-or-nothing: either the whole round is visible or none of it.
        let task_ids = self.store.create_tasks(requests)?;
        info!(
            group_id,
            tasks = task_ids.len(),
            timeout_ms = ttl_ms,
            "round opened"
        );

        let deadline = Instant::now() + timeout;
        let poll = Duration::from_millis(self.settings.poll_interval_ms.max(1));
        loop {
            self.store.reap_expired();
            let all_terminal = task_ids.iter().all(|id| {
                self.store
                    .get(*id)
                    .map(|t| t.status.is_terminal())
                    .unwrap_or(true)
            });
            if all_terminal {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(poll.min(deadline - now)).await;
        }

        // Force stragglers terminal so late replies are rejected from here on.
        for task_id in &task_ids {
            self.store.expire(*task_id);
        }

        let mut results = Vec::with_capacity(task_ids.len());
        let mut consumed = Vec::new();
        for (task_id, node_id) in task_ids.iter().copied().zip(dsts) {
            let outcome = match self.store.get(task_id) {
                Some(task) => match task.status {
                    TaskStatus::Replied => match task.reply {
                        Some(Reply::Success {
                            payload,
                            elapsed_ms,
                        }) => {
                            consumed.push(task_id);
                            Outcome::Replied {
                                payload,
                                elapsed_ms,
                            }
                        }
                        _ => unreachable!("replied task {task_id} without success reply"),
                    },
                    TaskStatus::Errored => match task.reply {
                        Some(Reply::Failure { reason }) => {
                            consumed.push(task_id);
                            Outcome::Errored { reason }
                        }
                        _ => unreachable!("errored task {task_id} without failure reply"),
                    },
                    TaskStatus::TimedOut => Outcome::Absent,
                    TaskStatus::Pending | TaskStatus::InFlight => {
                        unreachable!("unresolved task {task_id} after deadline")
                    }
                },
                None => Outcome::Absent,
            };
            results.push(RoundResult {
                task_id,
                node_id,
                outcome,
            });
        }

        self.store.delete(&consumed);

        let replied = results.iter().filter(|r| r.outcome.is_replied()).count();
        let errored = results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Errored { .. }))
            .count();
        let absent = results.len() - replied - errored;
        info!(group_id, replied, errored, absent, "round closed");
        if absent > 0 {
            warn!(group_id, absent, "round closed with unanswered slots");
        }
        Ok(results)
    }
}
