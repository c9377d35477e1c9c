//! Node-level error aggregation: one `#[from]`-wrapped variant per
//! collaborator crate, plus a bespoke `Storage` variant for RocksDB/IO
//! failures that never started as a typed sub-enum.

use thiserror::Error;

use reputrust_anomaly::AnomalyError;
use reputrust_core::error::CoreError;
use reputrust_graph::GraphError;
use reputrust_ledger::LedgerError;
use reputrust_score::ScoreError;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error(transparent)]
    Anomaly(#[from] AnomalyError),

    #[error("unknown agent address: {0}")]
    UnknownAddress(String),

    #[error("storage: {0}")]
    Storage(String),
}
