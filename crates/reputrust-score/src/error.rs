use thiserror::Error;

use reputrust_core::error::CoreError;
use reputrust_graph::GraphError;
use reputrust_ledger::LedgerError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
