//! In-crate fake runners for lifecycle tests.
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use foreman_model::{ProcessSpec, RunnerKind, RunnerSpec, RunnerState, WorkOutcome};

use crate::runner::{BuildContext, Runner, RunnerError, RunnerFactory, WorkContext};

#[derive(Clone, Copy, Debug)]
pub(crate) enum Behavior {
    /// Return the exit code right away.
    ExitNow(i32),
    /// Wait for cancellation, then exit with `-1`.
    UntilCanceled,
    /// Wait for cancellation, then fail with an exec error.
    FaultOnCancel,
    /// Wait for cancellation, then report `Canceled`.
    CanceledErr,
}

impl Behavior {
    /// Behaviour keyed by the fake executable name.
    pub(crate) fn from_executable(executable: &str) -> Self {
        if let Some(code) = executable.strip_prefix("exit:") {
            return Behavior::ExitNow(code.parse().unwrap_or(0));
        }
        match executable {
            "fault" => Behavior::FaultOnCancel,
            "canceled" => Behavior::CanceledErr,
            _ => Behavior::UntilCanceled,
        }
    }
}

/// Counters shared by every fake runner of a test.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    pub started: AtomicUsize,
    pub canceled: AtomicUsize,
    pub sent: Mutex<Vec<String>>,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

impl Tally {
    pub(crate) fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub(crate) fn canceled(&self) -> usize {
        self.canceled.load(Ordering::SeqCst)
    }

    pub(crate) fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub(crate) fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }
}

pub(crate) struct FakeRunner {
    behavior: Behavior,
    spec: ProcessSpec,
    tally: Arc<Tally>,
    state: Mutex<RunnerState>,
}

impl FakeRunner {
    pub(crate) fn new(spec: ProcessSpec, tally: Arc<Tally>) -> Self {
        Self {
            behavior: Behavior::from_executable(&spec.executable),
            spec,
            tally,
            state: Mutex::new(RunnerState::Created),
        }
    }

    fn set_state(&self, ctx: &WorkContext, state: RunnerState) {
        *self.state.lock().unwrap() = state;
        ctx.report_state(state);
    }
}

#[async_trait]
impl Runner for FakeRunner {
    fn kind(&self) -> RunnerKind {
        RunnerKind::Process
    }

    fn spec(&self) -> RunnerSpec {
        RunnerSpec::Process(self.spec.clone())
    }

    fn state(&self) -> RunnerState {
        *self.state.lock().unwrap()
    }

    async fn work(
        &self,
        ctx: &WorkContext,
        cancel: CancellationToken,
    ) -> Result<WorkOutcome, RunnerError> {
        self.tally.started.fetch_add(1, Ordering::SeqCst);
        let live = self.tally.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.tally.max_live.fetch_max(live, Ordering::SeqCst);
        self.set_state(ctx, RunnerState::Running);

        let result = match self.behavior {
            Behavior::ExitNow(code) => Ok(WorkOutcome::exited(code)),
            other => {
                cancel.cancelled().await;
                self.tally.canceled.fetch_add(1, Ordering::SeqCst);
                // Linger so an overlapping second run would be observed.
                tokio::time::sleep(Duration::from_millis(20)).await;
                match other {
                    Behavior::FaultOnCancel => Err(RunnerError::Exec("boom".into())),
                    Behavior::CanceledErr => Err(RunnerError::Canceled),
                    _ => Ok(WorkOutcome::exited(-1)),
                }
            }
        };

        self.tally.live.fetch_sub(1, Ordering::SeqCst);
        self.set_state(
            ctx,
            match &result {
                Ok(_) if cancel.is_cancelled() => RunnerState::Stopped,
                Ok(_) => RunnerState::ExitedWithCode,
                Err(_) => RunnerState::Exited,
            },
        );
        result
    }

    fn send(&self, line: &str) -> Result<(), RunnerError> {
        self.tally.sent.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

/// Builds [`FakeRunner`]s for process specs; sequences are rejected.
#[derive(Default)]
pub(crate) struct FakeFactory {
    pub tally: Arc<Tally>,
}

impl RunnerFactory for FakeFactory {
    fn build(&self, spec: &RunnerSpec, _ctx: &BuildContext) -> Result<Arc<dyn Runner>, RunnerError> {
        match spec {
            RunnerSpec::Process(p) => Ok(Arc::new(FakeRunner::new(p.clone(), self.tally.clone()))),
            RunnerSpec::Sequence { .. } => {
                Err(RunnerError::InvalidSpec("sequences are not faked".into()))
            }
        }
    }
}
