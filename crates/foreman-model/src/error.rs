use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown restart policy: {0}")]
    UnknownRestart(String),

    #[error("unknown runner kind: {0}")]
    UnknownRunnerKind(String),

    #[error("unknown log kind: {0}")]
    UnknownLogKind(String),

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
