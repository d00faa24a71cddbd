//! Prometheus [`foreman_core::MetricsBackend`].
//!
//! ## Metrics
//! - `foreman_work_started_total{runner_kind}` - Counter
//! - `foreman_work_completed_total{runner_kind, result}` - Counter
//! - `foreman_work_duration_seconds{runner_kind}` - Histogram
//! - `foreman_runner_errors_total{runner_kind, error_kind}` - Counter
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use foreman_core::BuildContext;
//! use foreman_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let ctx = BuildContext::default().with_metrics(Arc::new(metrics.clone()));
//!
//! let body = metrics.encode_text()?;
//! # let _ = (ctx, body);
//! # Ok(())
//! # }
//! ```
mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
