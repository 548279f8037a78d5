//! The participant gateway over real HTTP.

use anyhow::Result;
use rondo_api::ApiState;
use rondo_core::{Payload, TaskKind, TaskRequest};
use serde_json::json;

use crate::build_link;

async fn serve(link: &crate::Link) -> Result<String> {
    let state = ApiState::new(link.registry.clone(), link.store.clone());
    let addr = rondo_api::spawn(state).await?;
    Ok(format!("http://{addr}/api"))
}

/// One node's whole life over HTTP: join, pull, reply, inspect, leave.
#[tokio::test]
async fn one_nodes_life_over_http() -> Result<()> {
    let link = build_link();
    let base = serve(&link).await?;
    let client = reqwest::Client::new();

    // Join.
    let resp: serde_json::Value = client.post(format!("{base}/nodes")).send().await?.json().await?;
    let node_id = resp["node_id"].as_str().unwrap().to_string();

    // Listed.
    let nodes: serde_json::Value = client.get(format!("{base}/nodes")).send().await?.json().await?;
    assert_eq!(nodes["count"], json!(1));
    assert_eq!(nodes["nodes"][0]["node_id"], json!(node_id));

    // Nothing to do yet.
    let pull: serde_json::Value = client
        .post(format!("{base}/nodes/{node_id}/tasks/pull"))
        .send()
        .await?
        .json()
        .await?;
    assert!(pull["tasks"].as_array().unwrap().is_empty());

    // A task lands coordinator-side.
    let dst = u64::from_str_radix(&node_id, 16)?;
    link.store.create_task(TaskRequest::new(
        1,
        "round-1",
        dst,
        TaskKind::Train,
        Payload::from_content("params"),
        60_000,
    ))?;

    let pull: serde_json::Value = client
        .post(format!("{base}/nodes/{node_id}/tasks/pull"))
        .send()
        .await?
        .json()
        .await?;
    let tasks = pull["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["kind"], json!("train"));
    assert_eq!(tasks[0]["status"], json!("in_flight"));
    assert_eq!(tasks[0]["content"], json!(hex::encode("params")));
    assert_eq!(tasks[0]["group_id"], json!("round-1"));
    let task_id = tasks[0]["task_id"].as_u64().unwrap();

    // Pulling again hands out nothing.
    let pull: serde_json::Value = client
        .post(format!("{base}/nodes/{node_id}/tasks/pull"))
        .send()
        .await?
        .json()
        .await?;
    assert!(pull["tasks"].as_array().unwrap().is_empty());

    // Reply. The second attempt bounces with a conflict.
    let body = json!({
        "node_id": node_id,
        "success": true,
        "content": hex::encode("update"),
        "elapsed_ms": 12,
    });
    let resp = client
        .post(format!("{base}/tasks/{task_id}/reply"))
        .json(&body)
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 200);
    let resp = client
        .post(format!("{base}/tasks/{task_id}/reply"))
        .json(&body)
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 409);

    // The record shows the winning reply.
    let task: serde_json::Value = client
        .get(format!("{base}/tasks/{task_id}"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(task["status"], json!("replied"));
    assert_eq!(task["reply"]["success"], json!(true));
    assert_eq!(task["reply"]["content"], json!(hex::encode("update")));
    assert_eq!(task["reply"]["elapsed_ms"], json!(12));

    // Status view.
    let status: serde_json::Value = client.get(format!("{base}/status")).send().await?.json().await?;
    assert_eq!(status["nodes_online"], json!(1));
    assert_eq!(status["tasks_held"], json!(1));
    assert_eq!(status["store_open"], json!(true));

    // Leave. The gateway stops answering for this node.
    let resp = client.delete(format!("{base}/nodes/{node_id}")).send().await?;
    assert_eq!(resp.status().as_u16(), 200);
    let resp = client
        .post(format!("{base}/nodes/{node_id}/tasks/pull"))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 404);
    Ok(())
}

/// Malformed and unknown identities map onto the right status codes.
#[tokio::test]
async fn bad_identities_are_rejected() -> Result<()> {
    let link = build_link();
    let base = serve(&link).await?;
    let client = reqwest::Client::new();

    // Not hex at all.
    let resp = client.post(format!("{base}/nodes/zzzz/tasks/pull")).send().await?;
    assert_eq!(resp.status().as_u16(), 400);

    // Well-formed but never registered.
    let ghost = hex::encode(7u64.to_be_bytes());
    let resp = client
        .post(format!("{base}/nodes/{ghost}/tasks/pull"))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 404);

    // Unknown task.
    let resp = client.get(format!("{base}/tasks/999")).send().await?;
    assert_eq!(resp.status().as_u16(), 404);

    // A real node replying to a task that does not exist.
    let joined: serde_json::Value = client.post(format!("{base}/nodes")).send().await?.json().await?;
    let node_id = joined["node_id"].as_str().unwrap();
    let resp = client
        .post(format!("{base}/tasks/999/reply"))
        .json(&json!({ "node_id": node_id, "success": false, "reason": "lost" }))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 404);
    Ok(())
}
