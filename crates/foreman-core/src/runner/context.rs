use std::{
    fmt,
    path::{Path, PathBuf},
};

use foreman_model::{Env, LaborerName, Project, RunnerState};

use crate::{
    event::{EventBus, WorkEvent},
    metrics::MetricsHandle,
};

/// Default directory for project logs, relative to the working directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Shared dependencies handed to the runner factory and every laborer.
#[derive(Clone)]
pub struct BuildContext {
    env: Env,
    log_dir: PathBuf,
    metrics: MetricsHandle,
}

impl BuildContext {
    pub fn new(env: Env, log_dir: impl Into<PathBuf>, metrics: MetricsHandle) -> Self {
        Self {
            env,
            log_dir: log_dir.into(),
            metrics,
        }
    }

    /// Supervisor-wide environment; project env is merged over it.
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Root directory of per-project logs.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self {
            env: Env::default(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            metrics: crate::metrics::noop_metrics(),
        }
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("env_len", &self.env.len())
            .field("log_dir", &self.log_dir)
            .field("metrics", &"<handle>")
            .finish()
    }
}

/// Per-run context passed to [`crate::Runner::work`].
#[derive(Clone, Debug)]
pub struct WorkContext {
    name: LaborerName,
    project: Project,
    log_dir: PathBuf,
    events: EventBus,
}

impl WorkContext {
    pub fn new(
        name: impl Into<LaborerName>,
        project: Project,
        log_dir: impl Into<PathBuf>,
        events: EventBus,
    ) -> Self {
        Self {
            name: name.into(),
            project,
            log_dir: log_dir.into(),
            events,
        }
    }

    /// Name of the laborer this run belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Publish a runner state transition for this laborer.
    pub fn report_state(&self, state: RunnerState) {
        self.events.publish(WorkEvent::StateChanged {
            name: self.name.clone(),
            state,
        });
    }
}
