use thiserror::Error;

use reputrust_core::error::CoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnomalyError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("unknown alert: {0}")]
    UnknownAlert(u64),
}
