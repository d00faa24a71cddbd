use std::sync::Arc;

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

use foreman_core::{MetricsBackend, RunResult};

/// Metrics backend exposing counters and a run-duration histogram.
///
/// Labels are low-cardinality: `runner_kind` is `process`/`sequence`,
/// `result` one of `success`/`failure`/`canceled`/`faulted`.
#[derive(Clone)]
pub struct PrometheusMetrics {
    work_started: CounterVec,
    work_completed: CounterVec,
    work_duration: HistogramVec,
    runner_errors: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let work_started = CounterVec::new(
            Opts::new("foreman_work_started_total", "Runs launched by laborers"),
            &["runner_kind"],
        )?;
        registry.register(Box::new(work_started.clone()))?;

        let work_completed = CounterVec::new(
            Opts::new("foreman_work_completed_total", "Runs finished, by result"),
            &["runner_kind", "result"],
        )?;
        registry.register(Box::new(work_completed.clone()))?;

        let work_duration = HistogramVec::new(
            HistogramOpts::new("foreman_work_duration_seconds", "Run duration in seconds")
                .buckets(vec![0.1, 1.0, 5.0, 30.0, 60.0, 300.0, 1800.0, 3600.0, 86400.0]),
            &["runner_kind"],
        )?;
        registry.register(Box::new(work_duration.clone()))?;

        let runner_errors = CounterVec::new(
            Opts::new("foreman_runner_errors_total", "Runner faults other than exits"),
            &["runner_kind", "error_kind"],
        )?;
        registry.register(Box::new(runner_errors.clone()))?;

        Ok(Self {
            work_started,
            work_completed,
            work_duration,
            runner_errors,
            registry,
        })
    }

    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition format, as served on `/metrics`.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_work_started(&self, runner_kind: &str) {
        self.work_started.with_label_values(&[runner_kind]).inc();
    }

    fn record_work_completed(&self, runner_kind: &str, result: RunResult, duration_ms: u64) {
        self.work_completed
            .with_label_values(&[runner_kind, result.as_label()])
            .inc();
        self.work_duration
            .with_label_values(&[runner_kind])
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_runner_error(&self, runner_kind: &str, error_kind: &str) {
        self.runner_errors
            .with_label_values(&[runner_kind, error_kind])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("metric {name} not found"))
    }

    #[test]
    fn started_is_labelled_by_kind() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_work_started("process");
        metrics.record_work_started("process");
        metrics.record_work_started("sequence");

        let families = metrics.gather();
        assert_eq!(family(&families, "foreman_work_started_total").get_metric().len(), 2);
    }

    #[test]
    fn completion_feeds_counter_and_histogram() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_work_completed("process", RunResult::Success, 1500);
        metrics.record_work_completed("process", RunResult::Canceled, 20);

        let families = metrics.gather();
        assert_eq!(family(&families, "foreman_work_completed_total").get_metric().len(), 2);
        assert_eq!(family(&families, "foreman_work_duration_seconds").get_metric().len(), 1);
    }

    #[test]
    fn errors_are_counted() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_runner_error("process", "io");

        let text = metrics.encode_text().unwrap();
        let line = text
            .lines()
            .find(|l| l.starts_with("foreman_runner_errors_total{"))
            .unwrap();
        assert!(line.contains(r#"error_kind="io""#));
        assert!(line.ends_with(" 1"));
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = Arc::new(Registry::new());
        PrometheusMetrics::new_with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::new_with_registry(registry).is_err());
    }
}
