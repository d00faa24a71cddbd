//! Supervised lifecycle around one runner.
//!
//! A laborer owns at most one in-flight run. Every [`Laborer::run`] first stops
//! the previous run to completion, then launches the runner under a token
//! linked to the caller's parent token. The run itself executes on a background
//! task; its completion records the exit code and publishes the outcome.
use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use foreman_model::{
    LaborerName, LaborerSnapshot, Project, RestartPolicy, RunnerState, WorkOutcome,
};

use crate::{
    event::{EventBus, WorkEvent},
    metrics::RunResult,
    runner::{BuildContext, Runner, RunnerError, WorkContext},
};

/// Background run task plus the token that cancels it.
struct RunHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<WorkOutcome, RunnerError>>,
}

pub struct Laborer {
    name: LaborerName,
    project: Project,
    restart: RestartPolicy,
    runner: Arc<dyn Runner>,
    ctx: BuildContext,
    events: EventBus,
    last_exit_code: Arc<Mutex<Option<i32>>>,
    current: Mutex<Option<RunHandle>>,
    /// Serializes run/stop so a new run never overlaps the previous one.
    gate: tokio::sync::Mutex<()>,
    disposed: AtomicBool,
}

impl Laborer {
    pub fn new(
        name: impl Into<LaborerName>,
        project: Project,
        restart: RestartPolicy,
        runner: Arc<dyn Runner>,
        ctx: BuildContext,
        events: EventBus,
    ) -> Self {
        Self {
            name: name.into(),
            project,
            restart,
            runner,
            ctx,
            events,
            last_exit_code: Arc::new(Mutex::new(None)),
            current: Mutex::new(None),
            gate: tokio::sync::Mutex::new(()),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Declared restart intent; stored and reported, never acted on.
    pub fn restart(&self) -> RestartPolicy {
        self.restart
    }

    pub fn state(&self) -> RunnerState {
        self.runner.state()
    }

    /// Exit code of the last completed run, if any.
    pub fn last_exit_code(&self) -> Option<i32> {
        *lock(&self.last_exit_code)
    }

    /// `true` while a run task is in flight.
    pub fn is_running(&self) -> bool {
        lock(&self.current)
            .as_ref()
            .is_some_and(|h| !h.task.is_finished())
    }

    /// Stop any previous run, then start the runner under a token linked to `parent`.
    ///
    /// Returns once the new run task is launched; the work itself continues in
    /// the background. Fails when stopping the previous run fails or the
    /// laborer was disposed.
    pub async fn run(&self, parent: &CancellationToken) -> Result<(), RunnerError> {
        let _gate = self.gate.lock().await;
        if self.is_disposed() {
            return Err(RunnerError::Disposed);
        }
        self.stop_current().await?;

        let cancel = parent.child_token();
        let task = tokio::spawn(supervise(
            self.runner.clone(),
            WorkContext::new(
                self.name.clone(),
                self.project.clone(),
                self.ctx.log_dir(),
                self.events.clone(),
            ),
            cancel.clone(),
            self.ctx.clone(),
            self.last_exit_code.clone(),
        ));

        *lock(&self.current) = Some(RunHandle { cancel, task });
        info!(laborer = %self.name, kind = %self.runner.kind(), "laborer started");
        Ok(())
    }

    /// Cancel the in-flight run and wait for it to finish.
    ///
    /// Idempotent. Cancellation-shaped failures are absorbed; any other fault
    /// of the run is returned.
    pub async fn stop(&self) -> Result<(), RunnerError> {
        let _gate = self.gate.lock().await;
        self.stop_current().await
    }

    /// Stop for good: any later [`Laborer::run`] fails with [`RunnerError::Disposed`].
    pub async fn dispose(&self) -> Result<(), RunnerError> {
        let _gate = self.gate.lock().await;
        self.disposed.store(true, Ordering::SeqCst);
        let res = self.stop_current().await;
        debug!(laborer = %self.name, "laborer disposed");
        res
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn send(&self, line: &str) -> Result<(), RunnerError> {
        self.runner.send(line)
    }

    pub fn pause(&self) -> Result<(), RunnerError> {
        self.runner.pause()
    }

    pub fn resume(&self) -> Result<(), RunnerError> {
        self.runner.resume()
    }

    pub fn snapshot(&self) -> LaborerSnapshot {
        LaborerSnapshot {
            name: self.name.clone(),
            project: self.project.clone(),
            restart: self.restart,
            runner: self.runner.spec(),
            state: self.runner.state(),
            last_exit_code: self.last_exit_code(),
            running: self.is_running(),
        }
    }

    async fn stop_current(&self) -> Result<(), RunnerError> {
        let Some(handle) = lock(&self.current).take() else {
            return Ok(());
        };

        if handle.task.is_finished() {
            handle.cancel.cancel();
            return Ok(());
        }

        debug!(laborer = %self.name, "stopping run");
        handle.cancel.cancel();

        match handle.task.await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) if e.is_canceled() => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(RunnerError::Internal(format!("run task panicked: {e}"))),
        }
    }
}

impl Drop for Laborer {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.current).take() {
            if !handle.task.is_finished() {
                warn!(laborer = %self.name, "laborer dropped with a live run; canceling");
            }
            handle.cancel.cancel();
        }
    }
}

/// Body of the background run task.
async fn supervise(
    runner: Arc<dyn Runner>,
    wctx: WorkContext,
    cancel: CancellationToken,
    ctx: BuildContext,
    last_exit_code: Arc<Mutex<Option<i32>>>,
) -> Result<WorkOutcome, RunnerError> {
    let kind = runner.kind();
    let metrics = ctx.metrics();
    let started = Instant::now();
    metrics.record_work_started(kind.as_str());

    let res = runner.work(&wctx, cancel.clone()).await;
    let elapsed = started.elapsed().as_millis() as u64;
    let name = wctx.name().to_string();

    match &res {
        Ok(outcome) => {
            *lock(&last_exit_code) = Some(outcome.exit_code);
            let result = if cancel.is_cancelled() {
                RunResult::Canceled
            } else if outcome.is_success() {
                RunResult::Success
            } else {
                RunResult::Failure
            };
            metrics.record_work_completed(kind.as_str(), result, elapsed);
            info!(
                laborer = %name,
                exit_code = outcome.exit_code,
                message = %outcome.message,
                elapsed_ms = elapsed,
                "run finished"
            );
            wctx.events().publish(WorkEvent::Exited {
                name,
                outcome: outcome.clone(),
            });
        }
        Err(e) if e.is_canceled() => {
            metrics.record_work_completed(kind.as_str(), RunResult::Canceled, elapsed);
            debug!(laborer = %name, "run canceled");
        }
        Err(e) => {
            metrics.record_work_completed(kind.as_str(), RunResult::Faulted, elapsed);
            metrics.record_runner_error(kind.as_str(), e.kind());
            error!(laborer = %name, error = %e, "run faulted");
            wctx.events().publish(WorkEvent::Faulted {
                name,
                reason: e.to_string(),
            });
        }
    }
    res
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use foreman_model::ProcessSpec;

    use super::*;
    use crate::testing::{FakeRunner, Tally};

    fn laborer(executable: &str, tally: &Arc<Tally>, events: &EventBus) -> Laborer {
        let project = Project::new("api", executable);
        let runner = Arc::new(FakeRunner::new(ProcessSpec::new(executable), tally.clone()));
        Laborer::new(
            "w1",
            project,
            RestartPolicy::Never,
            runner,
            BuildContext::default(),
            events.clone(),
        )
    }

    async fn next_exit(rx: &mut tokio::sync::broadcast::Receiver<WorkEvent>) -> WorkOutcome {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let WorkEvent::Exited { outcome, .. } = rx.recv().await.unwrap() {
                    return outcome;
                }
            }
        })
        .await
        .expect("no exit event")
    }

    #[tokio::test]
    async fn stop_without_run_is_noop_and_idempotent() {
        let tally = Arc::new(Tally::default());
        let l = laborer("sleep", &tally, &EventBus::new());

        l.stop().await.unwrap();
        l.stop().await.unwrap();
        assert_eq!(tally.started(), 0);
        assert!(!l.is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn rerun_stops_previous_run_first() {
        let tally = Arc::new(Tally::default());
        let l = laborer("sleep", &tally, &EventBus::new());
        let root = CancellationToken::new();

        l.run(&root).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        l.run(&root).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(tally.started(), 2);
        assert_eq!(tally.canceled(), 1);
        assert_eq!(tally.max_live(), 1);

        l.stop().await.unwrap();
        l.stop().await.unwrap();
        assert_eq!(tally.canceled(), 2);
        assert!(!l.is_running());
    }

    #[tokio::test]
    async fn completed_run_records_exit_code() {
        let tally = Arc::new(Tally::default());
        let events = EventBus::new();
        let mut rx = events.subscribe();
        let l = laborer("exit:3", &tally, &events);

        l.run(&CancellationToken::new()).await.unwrap();
        let outcome = next_exit(&mut rx).await;

        assert_eq!(outcome, WorkOutcome::exited(3));
        assert_eq!(l.last_exit_code(), Some(3));
        assert_eq!(l.state(), RunnerState::ExitedWithCode);
        l.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_swallows_cancellation_error() {
        let tally = Arc::new(Tally::default());
        let l = laborer("canceled", &tally, &EventBus::new());

        l.run(&CancellationToken::new()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        l.stop().await.unwrap();
        assert_eq!(l.last_exit_code(), None);
    }

    #[tokio::test]
    async fn stop_propagates_unexpected_fault() {
        let tally = Arc::new(Tally::default());
        let events = EventBus::new();
        let mut rx = events.subscribe();
        let l = laborer("fault", &tally, &events);

        l.run(&CancellationToken::new()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let err = l.stop().await.unwrap_err();
        assert!(matches!(err, RunnerError::Exec(_)));

        let mut faulted = false;
        while let Ok(ev) = rx.try_recv() {
            faulted |= matches!(ev, WorkEvent::Faulted { .. });
        }
        assert!(faulted);
    }

    #[tokio::test]
    async fn parent_cancellation_reaches_the_run() {
        let tally = Arc::new(Tally::default());
        let events = EventBus::new();
        let mut rx = events.subscribe();
        let l = laborer("sleep", &tally, &events);
        let parent = CancellationToken::new();

        l.run(&parent).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        parent.cancel();

        assert_eq!(next_exit(&mut rx).await.exit_code, -1);
        assert_eq!(tally.canceled(), 1);
        assert_eq!(l.state(), RunnerState::Stopped);
    }

    #[tokio::test]
    async fn disposed_laborer_cannot_run() {
        let tally = Arc::new(Tally::default());
        let l = laborer("sleep", &tally, &EventBus::new());
        let root = CancellationToken::new();

        l.run(&root).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        l.dispose().await.unwrap();

        assert!(l.is_disposed());
        assert!(!l.is_running());
        assert!(matches!(l.run(&root).await, Err(RunnerError::Disposed)));
        assert_eq!(tally.started(), 1);
        l.stop().await.unwrap();
    }

    #[tokio::test]
    async fn snapshot_reflects_runner() {
        let tally = Arc::new(Tally::default());
        let l = laborer("sleep", &tally, &EventBus::new());

        let snap = l.snapshot();
        assert_eq!(snap.name, "w1");
        assert_eq!(snap.state, RunnerState::Created);
        assert_eq!(snap.restart, RestartPolicy::Never);
        assert!(!snap.running);
        assert_eq!(snap.runner.kind(), foreman_model::RunnerKind::Process);
    }
}
