use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

/// Message reported by a process runner.
pub const EXITED_MESSAGE: &str = "Exited";

/// Message reported by a sequence whose steps all exited with `0`.
pub const COMPLETED_MESSAGE: &str = "Completed";

/// Result of one runner invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct WorkOutcome {
    pub exit_code: i32,
    pub message: String,
}

impl WorkOutcome {
    pub fn new(exit_code: i32, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exited(exit_code: i32) -> Self {
        Self::new(exit_code, EXITED_MESSAGE)
    }

    pub fn completed() -> Self {
        Self::new(0, COMPLETED_MESSAGE)
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}
