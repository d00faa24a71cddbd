use std::{fmt, path::PathBuf};

use tracing::trace;

use foreman_model::{Env, ProcessSpec};

use crate::ExecError;

/// Resolved launch description of one process.
#[derive(Debug, Clone)]
pub struct Launch {
    pub(crate) executable: String,
    /// Arguments split from [`ProcessSpec::arguments`].
    pub(crate) args: Vec<String>,
    /// Supervisor env with the process entries merged over it.
    pub(crate) env: Env,
    /// Inherits the supervisor's working directory when `None`.
    pub(crate) cwd: Option<PathBuf>,
}

impl Launch {
    /// Resolve `spec` against the supervisor-wide environment.
    ///
    /// Arguments are split with POSIX shell quoting rules; no shell is involved
    /// at spawn time.
    pub fn resolve(spec: &ProcessSpec, base_env: &Env) -> Result<Self, ExecError> {
        let args = shell_words::split(&spec.arguments)
            .map_err(|e| ExecError::InvalidSpec(format!("bad argument string: {e}")))?;

        let launch = Self {
            executable: spec.executable.clone(),
            args,
            env: base_env.merged(&spec.env),
            cwd: spec.working_directory.clone(),
        };
        launch.validate()?;
        Ok(launch)
    }

    pub fn validate(&self) -> Result<(), ExecError> {
        if self.executable.trim().is_empty() {
            return Err(ExecError::InvalidSpec("executable is empty".into()));
        }
        Ok(())
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn trace_state(&self, laborer: &str) {
        trace!(
            laborer,
            executable = %self.executable,
            args = ?self.args,
            cwd = ?self.cwd,
            env_len = self.env.len(),
            "process launch resolved"
        );
    }
}

impl fmt::Display for Launch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Launch(exe='{}', args={}, env={}, cwd={:?})",
            self.executable,
            self.args.len(),
            self.env.len(),
            self.cwd,
        )
    }
}
