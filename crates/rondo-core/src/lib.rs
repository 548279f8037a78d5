//! rondo-core — shared task/node/run types, error taxonomy, and configuration.
//! All other rondo crates depend on this one.

pub mod config;
pub mod error;
pub mod node;
pub mod run;
pub mod task;

pub use error::LinkError;
pub use node::{Node, NodeId};
pub use run::{ConfigValue, Run, RunConfig, RunId, RunStatus};
pub use task::{Payload, Reply, Task, TaskId, TaskKind, TaskRequest, TaskSource, TaskStatus};

/// Current unix time in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
