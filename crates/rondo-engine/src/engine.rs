//! Virtual engine — answers tasks for N virtual nodes with W worker slots.
//!
//! The dispatch loop pulls through the same gateway surface a remote
//! participant would use, queues tasks per node, and runs handlers on the
//! blocking pool behind a semaphore. A node holds a slot for exactly one
//! execution at a time, so W bounds system-wide concurrency while every
//! node still answers its tasks in order.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::{DashMap, DashSet};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use rondo_core::config::EngineSettings;
use rondo_core::{NodeId, Reply, Task};
use rondo_link::{LocalGateway, NodeRegistry, TaskStore};

use crate::handler::{ExecEnv, ExecError, HandlerMap};
use crate::state::NodeState;

/// Engine handle. Clones share all state; `run` consumes one clone.
#[derive(Clone)]
pub struct VirtualEngine {
    gateway: LocalGateway,
    store: TaskStore,
    handlers: HandlerMap,
    /// Registration order; index is the node's partition id.
    nodes: Arc<Vec<NodeId>>,
    partitions: Arc<HashMap<NodeId, usize>>,
    states: Arc<DashMap<NodeId, NodeState>>,
    slots: Arc<Semaphore>,
    pool_size: usize,
    max_backlog: usize,
    poll_interval: Duration,
    /// Nodes with an execution in progress.
    busy: Arc<DashSet<NodeId>>,
    executed: Arc<AtomicU64>,
}

impl VirtualEngine {
    /// Register `num_nodes` virtual participants and wire up the pool.
    ///
    /// The i-th registered node is bound to partition i. A `pool_size` of
    /// zero means available parallelism.
    pub fn new(
        registry: NodeRegistry,
        store: TaskStore,
        handlers: HandlerMap,
        settings: &EngineSettings,
    ) -> Self {
        let pool_size = if settings.pool_size == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            settings.pool_size as usize
        };

        let gateway = LocalGateway::new(registry, store.clone());
        let states = Arc::new(DashMap::new());
        let mut nodes = Vec::with_capacity(settings.num_nodes as usize);
        let mut partitions = HashMap::new();
        for partition_id in 0..settings.num_nodes as usize {
            let node_id = gateway.register();
            partitions.insert(node_id, partition_id);
            states.insert(node_id, NodeState::new());
            nodes.push(node_id);
        }

        info!(
            nodes = nodes.len(),
            pool_size,
            max_backlog = settings.max_backlog,
            "virtual engine configured"
        );

        Self {
            gateway,
            store,
            handlers,
            nodes: Arc::new(nodes),
            partitions: Arc::new(partitions),
            states,
            slots: Arc::new(Semaphore::new(pool_size)),
            pool_size,
            max_backlog: settings.max_backlog as usize,
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(1)),
            busy: Arc::new(DashSet::new()),
            executed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Node ids in partition order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn partition_of(&self, node_id: NodeId) -> Option<usize> {
        self.partitions.get(&node_id).copied()
    }

    /// Snapshot of one node's committed state.
    pub fn state_of(&self, node_id: NodeId) -> Option<NodeState> {
        self.states.get(&node_id).map(|s| s.clone())
    }

    /// Replies accepted by the link so far.
    pub fn tasks_executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    /// Drive the engine until the store closes.
    pub async fn run(self) {
        info!(
            nodes = self.nodes.len(),
            pool_size = self.pool_size,
            "virtual engine running"
        );
        // Tasks pulled but not yet dispatched, per node, oldest first.
        let mut mailboxes: HashMap<NodeId, VecDeque<Task>> = HashMap::new();

        loop {
            if !self.store.is_open() {
                break;
            }

            // Refill mailboxes. A full backlog pauses pulling for that node.
            for &node_id in self.nodes.iter() {
                let queued = mailboxes.get(&node_id).map_or(0, |q| q.len());
                let limit = if self.max_backlog == 0 {
                    None
                } else if queued >= self.max_backlog {
                    continue;
                } else {
                    Some(self.max_backlog - queued)
                };
                match self.gateway.pull_tasks(node_id, limit) {
                    Ok(tasks) if !tasks.is_empty() => {
                        mailboxes.entry(node_id).or_default().extend(tasks);
                    }
                    Ok(_) => {}
                    Err(err) => warn!(node_id, error = %err, "virtual node pull failed"),
                }
            }

            // Dispatch at most one task per idle node, waiting for a slot
            // when the pool is saturated.
            let mut made_progress = false;
            for &node_id in self.nodes.iter() {
                if self.busy.contains(&node_id) {
                    continue;
                }
                let Some(task) = mailboxes.get_mut(&node_id).and_then(|q| q.pop_front()) else {
                    continue;
                };
                made_progress = true;
                match self.store.get(task.task_id) {
                    Some(current) if !current.status.is_terminal() => {}
                    // Resolved or deleted while queued. Drop it.
                    _ => continue,
                }
                let permit = match self.slots.clone().acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return, // semaphore closed
                };
                self.busy.insert(node_id);
                let engine = self.clone();
                tokio::spawn(async move {
                    engine.execute_one(task, permit).await;
                });
            }

            if !made_progress {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
        info!("virtual engine stopped");
    }

    /// Run one task to completion and push its reply. Holds `permit` for
    /// the duration; the node stays marked busy until the reply is in.
    async fn execute_one(&self, task: Task, permit: OwnedSemaphorePermit) {
        let node_id = task.dst;
        let env = ExecEnv {
            node_id,
            partition_id: self.partitions.get(&node_id).copied().unwrap_or(0),
            num_partitions: self.nodes.len(),
        };
        let state = self
            .states
            .get(&node_id)
            .map(|s| s.clone())
            .unwrap_or_default();

        let reply = match self.handlers.get(task.kind) {
            Some(handler) => {
                let payload = task.payload.clone();
                let started = Instant::now();
                let joined =
                    tokio::task::spawn_blocking(move || handler(env, state, payload)).await;
                let elapsed_ms = started.elapsed().as_millis() as u64;
                match joined {
                    Ok(Ok((reply_payload, new_state))) => {
                        self.states.insert(node_id, new_state);
                        Reply::success(reply_payload, elapsed_ms)
                    }
                    // Failed execution: previous state stays committed.
                    Ok(Err(err)) => Reply::failure(err.to_string()),
                    Err(join_err) => Reply::failure(panic_reason(join_err)),
                }
            }
            None => Reply::failure(ExecError::NoHandler(task.kind.as_str()).to_string()),
        };

        let ok = reply.is_success();
        match self.gateway.push_reply(node_id, task.task_id, reply) {
            Ok(()) => {
                self.executed.fetch_add(1, Ordering::Relaxed);
                debug!(node_id, task_id = task.task_id, ok, "virtual task finished");
            }
            // Late or duplicate. The round has moved on without us.
            Err(err) => warn!(node_id, task_id = task.task_id, error = %err, "reply rejected"),
        }

        self.busy.remove(&node_id);
        drop(permit);
    }
}

fn panic_reason(err: tokio::task::JoinError) -> String {
    match err.try_into_panic() {
        Ok(panic) => {
            if let Some(s) = panic.downcast_ref::<&str>() {
                format!("handler panicked: {s}")
            } else if let Some(s) = panic.downcast_ref::<String>() {
                format!("handler panicked: {s}")
            } else {
                "handler panicked".to_string()
            }
        }
        Err(_) => "handler cancelled".to_string(),
    }
}
