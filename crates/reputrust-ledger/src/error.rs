use thiserror::Error;

use reputrust_core::error::CoreError;
use reputrust_graph::GraphError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
