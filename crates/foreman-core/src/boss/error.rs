use thiserror::Error;

use foreman_model::LaborerName;

use crate::runner::RunnerError;

#[derive(Debug, Error)]
pub enum BossError {
    #[error("laborer '{0}' not found")]
    NotFound(LaborerName),

    #[error("failed to stop laborer '{name}': {source}")]
    StopFailed {
        name: LaborerName,
        #[source]
        source: RunnerError,
    },

    #[error("invalid laborer name: {0:?}")]
    InvalidName(String),

    #[error("no free laborer name after {0} attempts")]
    NamesExhausted(u32),

    #[error("boss is shutting down")]
    ShuttingDown,

    #[error("runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BossError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BossError::NotFound(_))
    }
}
