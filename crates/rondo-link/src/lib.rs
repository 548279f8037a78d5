//! rondo-link — the coordination link between a coordinator and its nodes.
//!
//! Holds the node registry, the task store, the coordinator's round
//! rendezvous, and the gateway surface participants talk to. Everything is
//! in-memory and clone-cheap: handles share state through `Arc`ed maps.

pub mod driver;
pub mod gateway;
pub mod registry;
pub mod store;

pub use driver::{Coordinator, Outcome, Outgoing, RoundResult};
pub use gateway::LocalGateway;
pub use registry::NodeRegistry;
pub use store::TaskStore;
