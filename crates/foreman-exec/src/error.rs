use thiserror::Error;

use foreman_core::RunnerError;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid specification: {0}")]
    InvalidSpec(String),

    #[error("process input is not connected")]
    NotConnected,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to signal pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ExecError> for RunnerError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::InvalidArgument(_) | ExecError::InvalidSpec(_) => {
                RunnerError::InvalidSpec(e.to_string())
            }
            ExecError::Io(e) => RunnerError::Io(e.to_string()),
            ExecError::Internal(msg) => RunnerError::Internal(msg),
            other => RunnerError::Exec(other.to_string()),
        }
    }
}
