//! Process orchestration: spawn, pump output, feed input, stop cooperatively.
//!
//! A cancelled run is never killed outright. The orchestrator writes
//! [`EXIT_COMMAND`] to the child's input, closes it and waits up to the grace
//! period; only a child still alive after that is killed.
mod launch;
pub use launch::Launch;

mod pump;
pub mod signal;

use std::{process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::{
    process::{Child, Command},
    time::{Instant, timeout_at},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use foreman_model::RunnerState;

use crate::{CommandQueue, ExecError, StdinProxy};

/// Grace period between the shutdown handshake and the kill.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Line written to the child's input to ask it to exit.
pub const EXIT_COMMAND: &str = "exit";

/// Default read size of the output pumps.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Tunables of the process orchestrator.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Wait after the handshake before killing.
    pub grace: Duration,
    /// Read size of the stdout/stderr pumps.
    pub chunk_size: usize,
    /// Truncate the runtime log when a run starts; sequence steps append instead.
    pub truncate_log: bool,
}

impl ProcessOptions {
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn with_truncate_log(mut self, truncate: bool) -> Self {
        self.truncate_log = truncate;
        self
    }
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            grace: SHUTDOWN_GRACE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            truncate_log: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

/// Callbacks the orchestrator drives while a process runs.
#[async_trait]
pub trait ProcessHooks: Send + Sync {
    /// A decoded chunk of child output.
    async fn output(&self, stream: OutputStream, chunk: &str) -> Result<(), ExecError>;

    /// The process moved to `state` (`Running`, `Terminating`).
    fn state(&self, state: RunnerState);

    /// The process was spawned with `pid`.
    fn spawned(&self, _pid: Option<u32>) {}
}

/// How a process run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    /// The process could not be started.
    SpawnFailed(String),
    /// The process ran and exited.
    Exited {
        /// OS exit code; `None` when terminated by a signal.
        code: Option<i32>,
        /// The shutdown handshake was performed.
        canceled: bool,
        /// The process outlived the grace period and was killed.
        killed: bool,
    },
}

impl ProcessExit {
    /// Exit code reported to callers; `-1` when the OS gave none.
    pub fn code(&self) -> i32 {
        match self {
            ProcessExit::SpawnFailed(_) => -1,
            ProcessExit::Exited { code, .. } => code.unwrap_or(-1),
        }
    }
}

/// Result of the exit-wait activity.
struct Ended {
    canceled: bool,
    killed: bool,
}

/// Run one process to completion.
///
/// Spawn failures are reported as [`ProcessExit::SpawnFailed`]. Errors of the
/// output pumps or the exit-wait fault the run.
pub async fn orchestrate(
    launch: &Launch,
    options: &ProcessOptions,
    queue: &CommandQueue,
    stdin: &StdinProxy,
    hooks: &dyn ProcessHooks,
    cancel: &CancellationToken,
) -> Result<ProcessExit, ExecError> {
    let mut cmd = Command::new(&launch.executable);
    cmd.args(&launch.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &launch.cwd {
        cmd.current_dir(cwd);
    }
    for kv in launch.env.iter() {
        cmd.env(kv.key(), kv.value());
    }
    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(executable = %launch.executable, error = %e, "process failed to start");
            return Ok(ProcessExit::SpawnFailed(e.to_string()));
        }
    };

    let pid = child.id();
    info!(pid = ?pid, executable = %launch.executable, "process started");
    hooks.spawned(pid);
    hooks.state(RunnerState::Running);

    let (Some(child_in), Some(child_out), Some(child_err)) =
        (child.stdin.take(), child.stdout.take(), child.stderr.take())
    else {
        return Err(ExecError::Internal("child stdio was not piped".into()));
    };
    stdin.bind(child_in).await;

    let exited = CancellationToken::new();
    let feed_stop = cancel.child_token();

    let (ended, out, err, ()) = tokio::join!(
        wait_exit(&mut child, pid, stdin, hooks, options.grace, cancel, &exited, &feed_stop),
        pump::pump(child_out, OutputStream::Stdout, hooks, &exited, options.chunk_size),
        pump::pump(child_err, OutputStream::Stderr, hooks, &exited, options.chunk_size),
        feed(queue, stdin, &feed_stop),
    );
    stdin.unbind().await;

    let ended = ended.inspect_err(|e| warn!(pid = ?pid, error = %e, "exit wait failed"))?;
    out.inspect_err(|e| warn!(pid = ?pid, error = %e, "stdout pump failed"))?;
    err.inspect_err(|e| warn!(pid = ?pid, error = %e, "stderr pump failed"))?;

    let status = child.wait().await?;
    info!(
        pid = ?pid,
        code = ?status.code(),
        canceled = ended.canceled,
        killed = ended.killed,
        "process exited"
    );

    Ok(ProcessExit::Exited {
        code: status.code(),
        canceled: ended.canceled,
        killed: ended.killed,
    })
}

/// Race natural exit against cancellation; on cancellation run the handshake.
#[allow(clippy::too_many_arguments)]
async fn wait_exit(
    child: &mut Child,
    pid: Option<u32>,
    stdin: &StdinProxy,
    hooks: &dyn ProcessHooks,
    grace: Duration,
    cancel: &CancellationToken,
    exited: &CancellationToken,
    feed_stop: &CancellationToken,
) -> Result<Ended, ExecError> {
    let res = tokio::select! {
        status = child.wait() => status.map(|_| Ended { canceled: false, killed: false }).map_err(ExecError::from),
        _ = cancel.cancelled() => shutdown(child, pid, stdin, hooks, grace, feed_stop).await,
    };
    feed_stop.cancel();
    exited.cancel();
    res
}

async fn shutdown(
    child: &mut Child,
    pid: Option<u32>,
    stdin: &StdinProxy,
    hooks: &dyn ProcessHooks,
    grace: Duration,
    feed_stop: &CancellationToken,
) -> Result<Ended, ExecError> {
    debug!(pid = ?pid, "cancellation requested; asking process to exit");
    hooks.state(RunnerState::Terminating);
    feed_stop.cancel();

    #[cfg(unix)]
    if let Some(pid) = pid {
        if let Err(e) = signal::resume(pid) {
            trace!(pid, error = %e, "resume before shutdown failed");
        }
    }

    // The handshake shares the grace deadline; a child that never drains its
    // input must not hold the kill back.
    let deadline = Instant::now() + grace;
    match timeout_at(deadline, stdin.write_line(EXIT_COMMAND)).await {
        Ok(Ok(())) => trace!(pid = ?pid, "exit command delivered"),
        Ok(Err(e)) => debug!(pid = ?pid, error = %e, "exit command not delivered"),
        Err(_) => debug!(pid = ?pid, "process input is full; exit command not delivered"),
    }
    if timeout_at(deadline, stdin.close()).await.is_err() {
        debug!(pid = ?pid, "process input still busy at deadline");
    }

    match timeout_at(deadline, child.wait()).await {
        Ok(status) => {
            status?;
            Ok(Ended {
                canceled: true,
                killed: false,
            })
        }
        Err(_) => {
            warn!(pid = ?pid, grace_ms = grace.as_millis() as u64, "process ignored exit; killing");
            child.kill().await?;
            Ok(Ended {
                canceled: true,
                killed: true,
            })
        }
    }
}

/// Deliver queued commands to the process input until `stop` fires.
async fn feed(queue: &CommandQueue, stdin: &StdinProxy, stop: &CancellationToken) {
    while !stop.is_cancelled() {
        let Some(line) = queue.dequeue(stop).await else {
            break;
        };
        tokio::select! {
            res = stdin.write_line(&line) => match res {
                Ok(()) => trace!("command delivered"),
                Err(e) => warn!(error = %e, "command dropped"),
            },
            _ = stop.cancelled() => {
                debug!("command write abandoned on shutdown");
                break;
            }
        }
    }
}
