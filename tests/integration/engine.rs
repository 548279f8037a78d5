//! Coordinator rounds served end-to-end by the virtual engine.

use std::time::Duration;

use rondo_core::config::EngineSettings;
use rondo_core::{Payload, TaskKind};
use rondo_engine::{ExecError, HandlerMap, VirtualEngine};
use rondo_link::{Outcome, Outgoing};

use crate::{build_coordinator, build_link};

fn engine_settings(num_nodes: u32, pool_size: u32) -> EngineSettings {
    EngineSettings {
        num_nodes,
        pool_size,
        max_backlog: 32,
        poll_interval_ms: 5,
    }
}

/// Six virtual nodes on two slots, two full rounds. Every partition
/// answers every round, and each node's round counter climbs with it.
#[tokio::test]
async fn two_rounds_over_six_virtual_nodes() {
    let link = build_link();
    let handlers = HandlerMap::new().with(TaskKind::Train, |env, mut state, payload| {
        let round = state.bump("rounds", 1);
        let mut records = serde_json::Map::new();
        records.insert("partition".into(), env.partition_id.into());
        records.insert("round".into(), round.into());
        Ok((
            Payload {
                content: payload.content,
                records,
            },
            state,
        ))
    });
    let engine = VirtualEngine::new(
        link.registry.clone(),
        link.store.clone(),
        handlers,
        &engine_settings(6, 2),
    );
    tokio::spawn(engine.clone().run());

    let coordinator = build_coordinator(&link);
    for round in 1..=2i64 {
        let outgoing: Vec<Outgoing> = coordinator
            .node_ids()
            .into_iter()
            .map(|n| Outgoing::new(n, TaskKind::Train, Payload::from_content("global-model")))
            .collect();
        assert_eq!(outgoing.len(), 6);

        let results = coordinator
            .send_and_receive(&format!("fit-{round}"), outgoing, Some(Duration::from_secs(10)))
            .await
            .unwrap();

        let mut partitions: Vec<i64> = results
            .iter()
            .map(|r| match &r.outcome {
                Outcome::Replied { payload, .. } => payload.records["partition"].as_i64().unwrap(),
                other => panic!("expected reply, got {other:?}"),
            })
            .collect();
        partitions.sort_unstable();
        assert_eq!(partitions, vec![0, 1, 2, 3, 4, 5]);
        for r in &results {
            match &r.outcome {
                Outcome::Replied { payload, .. } => {
                    assert_eq!(payload.records["round"], serde_json::json!(round));
                }
                other => panic!("expected reply, got {other:?}"),
            }
        }
    }
    link.store.close();
}

/// Training leaves state behind; a later evaluation round on the same
/// engine reads it back.
#[tokio::test]
async fn evaluate_sees_what_train_left_behind() {
    let link = build_link();
    let handlers = HandlerMap::new()
        .with(TaskKind::Train, |_env, mut state, payload| {
            let version = String::from_utf8_lossy(&payload.content).to_string();
            state.insert("model", serde_json::Value::from(version));
            Ok((Payload::default(), state))
        })
        .with(TaskKind::Evaluate, |_env, state, _payload| {
            let version = state
                .get("model")
                .and_then(|v| v.as_str())
                .unwrap_or("none")
                .to_string();
            Ok((Payload::from_content(version), state))
        });
    let engine = VirtualEngine::new(
        link.registry.clone(),
        link.store.clone(),
        handlers,
        &engine_settings(4, 2),
    );
    tokio::spawn(engine.clone().run());

    let coordinator = build_coordinator(&link);
    let nodes = coordinator.node_ids();

    let train: Vec<Outgoing> = nodes
        .iter()
        .map(|&n| Outgoing::new(n, TaskKind::Train, Payload::from_content("v7")))
        .collect();
    let results = coordinator
        .send_and_receive("fit", train, Some(Duration::from_secs(10)))
        .await
        .unwrap();
    assert!(results.iter().all(|r| r.outcome.is_replied()));

    let evaluate: Vec<Outgoing> = nodes
        .iter()
        .map(|&n| Outgoing::new(n, TaskKind::Evaluate, Payload::default()))
        .collect();
    let results = coordinator
        .send_and_receive("eval", evaluate, Some(Duration::from_secs(10)))
        .await
        .unwrap();
    for r in &results {
        let payload = r.outcome.payload().expect("replied");
        assert_eq!(&payload.content[..], b"v7");
    }
    link.store.close();
}

/// A partition that always fails errors its own slot and nothing else;
/// the round still closes on replies, not on the deadline.
#[tokio::test]
async fn one_bad_partition_does_not_block_the_round() {
    let link = build_link();
    let handlers = HandlerMap::new().with(TaskKind::Train, |env, state, payload| {
        if env.partition_id == 0 {
            return Err(ExecError::failed("partition 0 corrupt"));
        }
        Ok((payload, state))
    });
    let engine = VirtualEngine::new(
        link.registry.clone(),
        link.store.clone(),
        handlers,
        &engine_settings(4, 2),
    );
    tokio::spawn(engine.clone().run());

    let coordinator = build_coordinator(&link);
    let outgoing: Vec<Outgoing> = coordinator
        .node_ids()
        .into_iter()
        .map(|n| Outgoing::new(n, TaskKind::Train, Payload::from_content("w")))
        .collect();
    let results = coordinator
        .send_and_receive("fit", outgoing, Some(Duration::from_secs(10)))
        .await
        .unwrap();

    let errored: Vec<_> = results
        .iter()
        .filter_map(|r| match &r.outcome {
            Outcome::Errored { reason } => Some(reason.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(errored, vec!["partition 0 corrupt"]);
    assert_eq!(results.iter().filter(|r| r.outcome.is_replied()).count(), 3);
    link.store.close();
}
