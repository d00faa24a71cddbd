use thiserror::Error;

use foreman_model::ModelError;

#[derive(Debug, Error)]
pub enum RunnerError {
    /// The run was stopped on purpose.
    #[error("run canceled")]
    Canceled,

    /// The laborer owning the runner was disposed and will not run again.
    #[error("laborer disposed")]
    Disposed,

    #[error("operation '{op}' is not supported by {runner} runner")]
    Unsupported { op: &'static str, runner: &'static str },

    #[error("invalid specification: {0}")]
    InvalidSpec(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("exec error: {0}")]
    Exec(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RunnerError {
    /// `true` for the one failure a deliberate stop is expected to produce.
    pub fn is_canceled(&self) -> bool {
        matches!(self, RunnerError::Canceled)
    }

    /// Short label used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            RunnerError::Canceled => "canceled",
            RunnerError::Disposed => "disposed",
            RunnerError::Unsupported { .. } => "unsupported",
            RunnerError::InvalidSpec(_) => "invalid_spec",
            RunnerError::Io(_) => "io",
            RunnerError::Exec(_) => "exec",
            RunnerError::Internal(_) => "internal",
        }
    }
}

impl From<std::io::Error> for RunnerError {
    fn from(e: std::io::Error) -> Self {
        RunnerError::Io(e.to_string())
    }
}

impl From<ModelError> for RunnerError {
    fn from(e: ModelError) -> Self {
        RunnerError::InvalidSpec(e.to_string())
    }
}
