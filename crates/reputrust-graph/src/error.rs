use thiserror::Error;

use reputrust_core::error::CoreError;
use reputrust_core::ids::AgentId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("self-edges are not permitted: {0}")]
    SelfEdge(AgentId),

    #[error("no active edge source {0} found to revoke")]
    UnknownEdgeSource(String),
}
