//! # reputrust-graph
//! The directed weighted trust graph: stable-index node/edge store, damped
//! PageRank authority engine, bounded-BFS path discovery, and Sybil
//! indicators.

pub mod authority;
pub mod error;
pub mod metrics;
pub mod path;
pub mod registry;
pub mod sybil;
pub mod store;

pub use authority::{compute_authority, AuthorityPass, AuthorityResult, GraphSnapshot};
pub use error::GraphError;
pub use registry::AgentRegistry;
pub use store::TrustGraphStore;
