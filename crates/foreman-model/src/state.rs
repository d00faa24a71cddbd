use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

/// Observable lifecycle state of a runner.
///
/// A run starts from `Created`, becomes `Running` once the OS process is up and
/// ends in exactly one terminal state (see [`RunnerState::is_terminal`]).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum RunnerState {
    #[default]
    Created,
    Running,
    /// Cancelled run whose process is gone.
    Stopped,
    Paused,
    /// Process exited on its own with a status code.
    ExitedWithCode,
    /// Shutdown handshake in progress.
    Terminating,
    Restarting,
    /// Process exited on its own without a status code (killed by a signal).
    ExitedWithoutCode,
    /// The run ended without a process (spawn failure) or as a whole (sequence).
    Exited,
}

impl RunnerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunnerState::Stopped
                | RunnerState::ExitedWithCode
                | RunnerState::ExitedWithoutCode
                | RunnerState::Exited
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerState::Created => "created",
            RunnerState::Running => "running",
            RunnerState::Stopped => "stopped",
            RunnerState::Paused => "paused",
            RunnerState::ExitedWithCode => "exitedWithCode",
            RunnerState::Terminating => "terminating",
            RunnerState::Restarting => "restarting",
            RunnerState::ExitedWithoutCode => "exitedWithoutCode",
            RunnerState::Exited => "exited",
        }
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
