//! rondo-engine — many virtual participants over a bounded worker pool.
//!
//! Registers N virtual nodes against a link and answers their tasks with
//! in-process handlers, W execution slots at a time. Each virtual node
//! keeps private state across tasks and never runs two tasks at once.

pub mod engine;
pub mod handler;
pub mod state;

pub use engine::VirtualEngine;
pub use handler::{ExecEnv, ExecError, HandlerMap, TaskHandler};
pub use state::NodeState;
