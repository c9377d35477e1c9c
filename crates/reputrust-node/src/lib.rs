//! # reputrust-node
//! The long-running process: wires every collaborator crate together,
//! persists a replayable write-ahead event log, serves the JSON-RPC
//! surface, and runs the periodic scheduler (authority recompute, path
//! cache sweep, anomaly scan, subscription sweep).

pub mod config;
pub mod error;
pub mod events;
pub mod node;
pub mod rpc;
pub mod storage;

pub use config::NodeConfig;
pub use error::NodeError;
pub use node::Node;
