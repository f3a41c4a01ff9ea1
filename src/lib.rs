//! Foreground supervisor for a single node: record the PID, start the node, wait for a
//! termination signal, shut the node down, exit.

pub mod config;
pub mod identity;
pub mod lifecycle;
pub mod node;
pub mod signals;

pub use lifecycle::{Controller, RunOutcome, ServiceContext, ServiceState, EXIT_STATUS};
pub use node::{LocalNode, Node, NodeError};
pub use signals::{SignalSet, SignalWaiter};
