use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use foreman_core::{ProjectLog, Runner, RunnerError, WorkContext};
use foreman_model::{Env, LogKind, ProcessSpec, RunnerKind, RunnerSpec, RunnerState, WorkOutcome};

use crate::{
    CommandQueue, ExecError, StdinProxy,
    process::{Launch, OutputStream, ProcessExit, ProcessHooks, ProcessOptions, orchestrate},
};

/// Runs one OS process per invocation.
pub struct ProcessRunner {
    spec: ProcessSpec,
    launch: Launch,
    options: ProcessOptions,
    queue: CommandQueue,
    stdin: StdinProxy,
    state: Mutex<RunnerState>,
    live: Mutex<Option<Live>>,
}

/// The process of the current invocation.
struct Live {
    pid: Option<u32>,
    ctx: WorkContext,
}

impl ProcessRunner {
    pub fn new(spec: ProcessSpec, base_env: &Env, options: ProcessOptions) -> Result<Self, ExecError> {
        let launch = Launch::resolve(&spec, base_env)?;
        Ok(Self {
            spec,
            launch,
            options,
            queue: CommandQueue::new(),
            stdin: StdinProxy::new(),
            state: Mutex::new(RunnerState::Created),
            live: Mutex::new(None),
        })
    }

    pub fn launch(&self) -> &Launch {
        &self.launch
    }

    /// Commands waiting for delivery.
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    fn set_state(&self, ctx: &WorkContext, state: RunnerState) {
        *lock(&self.state) = state;
        ctx.report_state(state);
    }

    #[cfg(unix)]
    fn signal_live(
        &self,
        expect: RunnerState,
        next: RunnerState,
        send: fn(u32) -> Result<(), ExecError>,
    ) -> Result<(), RunnerError> {
        let live = lock(&self.live);
        let Some(Live { pid: Some(pid), ctx }) = live.as_ref() else {
            return Err(ExecError::NotConnected.into());
        };
        if self.state() != expect {
            return Err(RunnerError::Exec(format!(
                "process is {}, expected {expect}",
                self.state()
            )));
        }
        send(*pid)?;
        self.set_state(ctx, next);
        Ok(())
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    fn kind(&self) -> RunnerKind {
        RunnerKind::Process
    }

    fn spec(&self) -> RunnerSpec {
        RunnerSpec::Process(self.spec.clone())
    }

    fn state(&self) -> RunnerState {
        *lock(&self.state)
    }

    async fn work(
        &self,
        ctx: &WorkContext,
        cancel: CancellationToken,
    ) -> Result<WorkOutcome, RunnerError> {
        self.launch.trace_state(ctx.name());

        let log = if self.options.truncate_log {
            ProjectLog::open(ctx.log_dir(), ctx.project(), LogKind::Runtime).await?
        } else {
            ProjectLog::append(ctx.log_dir(), ctx.project(), LogKind::Runtime).await?
        };

        let hooks = RunHooks {
            runner: self,
            ctx,
            log: &log,
        };
        let res = orchestrate(
            &self.launch,
            &self.options,
            &self.queue,
            &self.stdin,
            &hooks,
            &cancel,
        )
        .await;
        *lock(&self.live) = None;

        match res {
            Ok(ProcessExit::SpawnFailed(reason)) => {
                if let Err(e) = log.log_line(&format!("failed to start: {reason}")).await {
                    warn!(laborer = %ctx.name(), error = %e, "runtime log write failed");
                }
                self.set_state(ctx, RunnerState::Exited);
                Ok(WorkOutcome::exited(-1))
            }
            Ok(exit @ ProcessExit::Exited { code, canceled, killed }) => {
                if killed {
                    if let Err(e) = log.log_line("killed after shutdown grace period").await {
                        warn!(laborer = %ctx.name(), error = %e, "runtime log write failed");
                    }
                }
                let state = match code {
                    _ if canceled => RunnerState::Stopped,
                    Some(_) => RunnerState::ExitedWithCode,
                    None => RunnerState::ExitedWithoutCode,
                };
                self.set_state(ctx, state);
                Ok(WorkOutcome::exited(exit.code()))
            }
            Err(e) => {
                self.set_state(ctx, RunnerState::Exited);
                Err(e.into())
            }
        }
    }

    fn send(&self, line: &str) -> Result<(), RunnerError> {
        self.queue.enqueue(line)?;
        Ok(())
    }

    #[cfg(unix)]
    fn pause(&self) -> Result<(), RunnerError> {
        self.signal_live(
            RunnerState::Running,
            RunnerState::Paused,
            crate::process::signal::suspend,
        )
    }

    #[cfg(unix)]
    fn resume(&self) -> Result<(), RunnerError> {
        self.signal_live(
            RunnerState::Paused,
            RunnerState::Running,
            crate::process::signal::resume,
        )
    }
}

/// Routes orchestrator callbacks into the runtime log and the event bus.
struct RunHooks<'a> {
    runner: &'a ProcessRunner,
    ctx: &'a WorkContext,
    log: &'a ProjectLog,
}

#[async_trait]
impl<'a> ProcessHooks for RunHooks<'a> {
    async fn output(&self, stream: OutputStream, chunk: &str) -> Result<(), ExecError> {
        debug!(
            laborer = %self.ctx.name(),
            stream = stream.as_str(),
            chunk = chunk.trim_end(),
            "process output"
        );
        self.log.log(chunk).await?;
        Ok(())
    }

    fn state(&self, state: RunnerState) {
        self.runner.set_state(self.ctx, state);
    }

    fn spawned(&self, pid: Option<u32>) {
        *lock(&self.runner.live) = Some(Live {
            pid,
            ctx: self.ctx.clone(),
        });
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
