use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use foreman_core::{ProjectLog, Runner, RunnerError, WorkContext};
use foreman_model::{LogKind, RunnerKind, RunnerSpec, RunnerState, WorkOutcome};

use crate::ExecError;

/// Runs child runners in order, stopping at the first non-zero exit.
///
/// Steps report their own state transitions; the sequence only tracks where
/// it is. Completed steps are never re-run within one invocation.
pub struct SequenceRunner {
    steps: Vec<Arc<dyn Runner>>,
    state: Mutex<RunnerState>,
    current: Mutex<Option<usize>>,
}

impl SequenceRunner {
    pub fn new(steps: Vec<Arc<dyn Runner>>) -> Self {
        Self {
            steps,
            state: Mutex::new(RunnerState::Created),
            current: Mutex::new(None),
        }
    }

    pub fn steps(&self) -> &[Arc<dyn Runner>] {
        &self.steps
    }

    fn set_state(&self, state: RunnerState) {
        *lock(&self.state) = state;
    }

    fn current_step(&self) -> Option<&Arc<dyn Runner>> {
        let current = *lock(&self.current);
        current.and_then(|i| self.steps.get(i))
    }

    /// Point control calls at step `next`, or at nothing past the last step.
    fn advance_to(&self, next: usize) {
        *lock(&self.current) = (next < self.steps.len()).then_some(next);
    }

    fn finish(&self, state: RunnerState) {
        *lock(&self.current) = None;
        self.set_state(state);
    }
}

#[async_trait]
impl Runner for SequenceRunner {
    fn kind(&self) -> RunnerKind {
        RunnerKind::Sequence
    }

    fn spec(&self) -> RunnerSpec {
        RunnerSpec::Sequence {
            steps: self.steps.iter().map(|s| s.spec()).collect(),
        }
    }

    fn state(&self) -> RunnerState {
        *lock(&self.state)
    }

    async fn work(
        &self,
        ctx: &WorkContext,
        cancel: CancellationToken,
    ) -> Result<WorkOutcome, RunnerError> {
        // Steps append to the runtime log; start it fresh once per invocation.
        drop(ProjectLog::open(ctx.log_dir(), ctx.project(), LogKind::Runtime).await?);
        self.set_state(RunnerState::Running);
        self.advance_to(0);

        for (i, step) in self.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                debug!(laborer = %ctx.name(), step = i, "sequence canceled between steps");
                self.finish(RunnerState::Stopped);
                return Err(RunnerError::Canceled);
            }

            trace!(laborer = %ctx.name(), step = i, kind = %step.kind(), "sequence step starting");
            match step.work(ctx, cancel.clone()).await {
                Ok(outcome) if outcome.is_success() => self.advance_to(i + 1),
                Ok(outcome) => {
                    debug!(
                        laborer = %ctx.name(),
                        step = i,
                        exit_code = outcome.exit_code,
                        "sequence step failed; stopping"
                    );
                    self.finish(if cancel.is_cancelled() {
                        RunnerState::Stopped
                    } else {
                        RunnerState::Exited
                    });
                    return Ok(outcome);
                }
                Err(e) => {
                    self.finish(if e.is_canceled() {
                        RunnerState::Stopped
                    } else {
                        RunnerState::Exited
                    });
                    return Err(e);
                }
            }
        }

        self.finish(RunnerState::Exited);
        Ok(WorkOutcome::completed())
    }

    /// Forwarded to the running or upcoming step; to the first step when idle.
    fn send(&self, line: &str) -> Result<(), RunnerError> {
        match self.current_step().or_else(|| self.steps.first()) {
            Some(step) => step.send(line),
            None => Err(ExecError::NotConnected.into()),
        }
    }

    fn pause(&self) -> Result<(), RunnerError> {
        match self.current_step() {
            Some(step) => step.pause(),
            None => Err(ExecError::NotConnected.into()),
        }
    }

    fn resume(&self) -> Result<(), RunnerError> {
        match self.current_step() {
            Some(step) => step.resume(),
            None => Err(ExecError::NotConnected.into()),
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
