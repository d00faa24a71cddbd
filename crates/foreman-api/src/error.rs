use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use foreman_core::{BossError, RunnerError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BossError> for ApiError {
    fn from(e: BossError) -> Self {
        match e {
            BossError::NotFound(_) => ApiError::NotFound(e.to_string()),
            BossError::InvalidName(_) => ApiError::InvalidRequest(e.to_string()),
            BossError::NamesExhausted(_) | BossError::ShuttingDown => {
                ApiError::Conflict(e.to_string())
            }
            BossError::Runner(RunnerError::InvalidSpec(_)) => {
                ApiError::InvalidRequest(e.to_string())
            }
            BossError::Runner(
                RunnerError::Unsupported { .. } | RunnerError::Exec(_) | RunnerError::Disposed,
            ) => {
                ApiError::Conflict(e.to_string())
            }
            BossError::StopFailed { .. } | BossError::Runner(_) | BossError::Io(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
