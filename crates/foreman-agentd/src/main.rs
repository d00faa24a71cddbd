mod config;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use foreman_api::{BossAdapter, HttpApi};
use foreman_core::{Boss, BuildContext};
use foreman_exec::ExecRunnerFactory;
use foreman_observe::{LoggerTimeZone, init_local_offset, init_logger, spawn_event_logger};
use foreman_prometheus::{Encoder, PrometheusMetrics, TextEncoder};

use crate::config::AgentdConfig;

fn main() -> anyhow::Result<()> {
    let cfg = AgentdConfig::load()?;

    // Offset detection must happen before the runtime spawns threads.
    if cfg.logger.tz == LoggerTimeZone::Local {
        init_local_offset();
    }
    init_logger(&cfg.logger)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cfg))
}

async fn run(cfg: AgentdConfig) -> anyhow::Result<()> {
    let metrics = PrometheusMetrics::new()?;
    let ctx = BuildContext::new(cfg.env.clone(), &cfg.log_dir, Arc::new(metrics.clone()));

    let boss = Arc::new(Boss::new(Arc::new(ExecRunnerFactory::new()), ctx));
    let event_logger = spawn_event_logger(boss.subscribe());

    let root = CancellationToken::new();
    let boss_task = tokio::spawn({
        let boss = boss.clone();
        let root = root.clone();
        async move { boss.run(root).await }
    });

    let app = HttpApi::new(Arc::new(BossAdapter::new(boss.clone())))
        .router()
        .merge(Router::new().route(
            "/metrics",
            get(move || render_metrics(metrics.clone())),
        ));

    let listener = tokio::net::TcpListener::bind(cfg.http_addr).await?;
    info!(addr = %cfg.http_addr, log_dir = %cfg.log_dir.display(), "foreman agent listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(root.clone()))
        .await?;

    // Serve can also end on its own; make sure the boss sweeps either way.
    root.cancel();
    boss_task.await?;
    drop(boss);

    if tokio::time::timeout(Duration::from_secs(1), event_logger)
        .await
        .is_err()
    {
        warn!("event logger did not drain in time");
    }
    info!("foreman agent stopped");
    Ok(())
}

async fn render_metrics(metrics: PrometheusMetrics) -> Response {
    match metrics.encode_text() {
        Ok(body) => ([(CONTENT_TYPE, TextEncoder::new().format_type().to_string())], body)
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Resolves on Ctrl-C (or SIGTERM on Unix) and fires `root`.
async fn shutdown_signal(root: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown requested");
    root.cancel();
}
