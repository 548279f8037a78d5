//! Rondo integration test harness.
//!
//! Everything runs in-process: registry, store, coordinator, virtual
//! engine, and the HTTP gateway share one runtime per test. Set
//! RUST_LOG=rondo_link=debug to watch the round traffic go by.
//!
//! Tests drive participants only through the gateway surface, the way a
//! real node would.

mod api;
mod engine;

use std::sync::Once;
use std::time::Duration;

use rondo_core::config::CoordinatorSettings;
use rondo_core::{NodeId, Reply, RunConfig};
use rondo_link::{Coordinator, LocalGateway, NodeRegistry, TaskStore};

// ── Harness ───────────────────────────────────────────────────────────────────

static TRACING: Once = Once::new();

/// Install the env-filter subscriber once for the whole test binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// One in-process link: a shared registry and store plus a gateway over
/// them.
pub struct Link {
    pub registry: NodeRegistry,
    pub store: TaskStore,
    pub gateway: LocalGateway,
}

pub fn build_link() -> Link {
    init_tracing();
    let registry = NodeRegistry::new();
    let store = TaskStore::new();
    let gateway = LocalGateway::new(registry.clone(), store.clone());
    Link {
        registry,
        store,
        gateway,
    }
}

/// Coordinator with test-speed polling.
pub fn build_coordinator(link: &Link) -> Coordinator {
    let settings = CoordinatorSettings {
        poll_interval_ms: 5,
        round_timeout_ms: 5_000,
        ..CoordinatorSettings::default()
    };
    Coordinator::new(
        link.store.clone(),
        link.registry.clone(),
        RunConfig::new(),
        settings,
    )
}

/// A hand-driven participant: pulls through the gateway and answers every
/// task after `delay`, succeeding or failing per `ok`. Runs until its node
/// loses access or the store closes.
pub fn spawn_participant(
    gateway: LocalGateway,
    node_id: NodeId,
    delay: Duration,
    ok: bool,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match gateway.pull_tasks(node_id, None) {
                Ok(tasks) => {
                    for task in tasks {
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        let reply = if ok {
                            Reply::success(task.payload.clone(), 1)
                        } else {
                            Reply::failure("training diverged")
                        };
                        let _ = gateway.push_reply(node_id, task.task_id, reply);
                    }
                }
                Err(_) => break,
            }
            tokio::time::sleep(Duration::from_millis(3)).await;
        }
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// Closing the store is visible through every handle at once: pulls drain
/// empty and new rounds refuse to open.
#[tokio::test]
async fn close_is_seen_by_every_handle() {
    use rondo_core::{LinkError, Payload, TaskKind};
    use rondo_link::Outgoing;

    let link = build_link();
    let node = link.gateway.register();
    let coordinator = build_coordinator(&link);

    link.store.close();

    assert!(link.gateway.pull_tasks(node, None).unwrap().is_empty());
    let err = coordinator
        .send_and_receive(
            "round-after-close",
            vec![Outgoing::new(node, TaskKind::Train, Payload::default())],
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err, LinkError::StoreClosed);
}
