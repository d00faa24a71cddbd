use std::sync::Arc;

/// How a run ended, for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    /// Exit code `0`.
    Success,
    /// Non-zero exit code.
    Failure,
    /// Stopped on request.
    Canceled,
    /// Runner returned an error.
    Faulted,
}

impl RunResult {
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            RunResult::Success => "success",
            RunResult::Failure => "failure",
            RunResult::Canceled => "canceled",
            RunResult::Faulted => "faulted",
        }
    }
}

/// Backend metrics collection interface.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Called when a laborer launches its runner.
    fn record_work_started(&self, runner_kind: &str);

    /// Called when the run task finishes, whatever the reason.
    fn record_work_completed(&self, runner_kind: &str, result: RunResult, duration_ms: u64);

    /// Called for runner failures that are not a normal exit (spawn, io, panics).
    fn record_runner_error(&self, runner_kind: &str, error_kind: &str);
}

/// Shared handle to a metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
