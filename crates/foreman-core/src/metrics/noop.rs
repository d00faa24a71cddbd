use crate::metrics::backend::{MetricsBackend, RunResult};

/// Metrics backend that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_work_started(&self, _: &str) {}

    #[inline(always)]
    fn record_work_completed(&self, _: &str, _: RunResult, _: u64) {}

    #[inline(always)]
    fn record_runner_error(&self, _: &str, _: &str) {}
}
