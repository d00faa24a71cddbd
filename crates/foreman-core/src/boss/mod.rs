//! Named registry of laborers.
//!
//! The boss is the only component the control plane talks to. It owns the
//! registry, the runner factory and a root token every run is linked to.
//! [`Boss::run`] waits for the host's shutdown signal and sweeps the registry.
//!
//! Lifecycle operations on one name are serialized by a per-name async lock,
//! so a hire, start or remove never interleaves with another on the same name.
mod error;
pub use error::BossError;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};

use tokio::sync::{OwnedMutexGuard, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use foreman_model::{LaborerName, LaborerSnapshot, LogKind, Project, RestartPolicy, RunnerSpec};

use crate::{
    event::{EventBus, WorkChange, WorkEvent},
    laborer::Laborer,
    log::ProjectLog,
    names::{HumanNames, NameGenerator},
    runner::{BuildContext, RunnerError, RunnerFactory},
};

/// Retries after the first generated name collides.
pub const MAX_NAME_ATTEMPTS: u32 = 16;

pub struct Boss {
    laborers: RwLock<HashMap<LaborerName, Arc<Laborer>>>,
    name_locks: Mutex<HashMap<LaborerName, Arc<tokio::sync::Mutex<()>>>>,
    factory: Arc<dyn RunnerFactory>,
    names: Arc<dyn NameGenerator>,
    ctx: BuildContext,
    events: EventBus,
    root: CancellationToken,
}

impl Boss {
    pub fn new(factory: Arc<dyn RunnerFactory>, ctx: BuildContext) -> Self {
        Self {
            laborers: RwLock::new(HashMap::new()),
            name_locks: Mutex::new(HashMap::new()),
            factory,
            names: Arc::new(HumanNames::new()),
            ctx,
            events: EventBus::new(),
            root: CancellationToken::new(),
        }
    }

    pub fn with_names(mut self, names: Arc<dyn NameGenerator>) -> Self {
        self.names = names;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkEvent> {
        self.events.subscribe()
    }

    /// Register a process laborer for `project` and start it.
    ///
    /// An existing laborer of the same name is removed first.
    pub async fn run_project(
        &self,
        project: Project,
        name: Option<String>,
    ) -> Result<LaborerSnapshot, BossError> {
        let spec = RunnerSpec::Process(project.process_spec());
        self.hire(name, project, spec, RestartPolicy::default()).await
    }

    /// Register a laborer for any runner spec and start it.
    pub async fn hire(
        &self,
        name: Option<String>,
        project: Project,
        spec: RunnerSpec,
        restart: RestartPolicy,
    ) -> Result<LaborerSnapshot, BossError> {
        if self.root.is_cancelled() {
            return Err(BossError::ShuttingDown);
        }

        let requested = match name {
            Some(name) => {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    return Err(BossError::InvalidName(name));
                }
                Some(trimmed.to_string())
            }
            None => None,
        };

        spec.validate().map_err(RunnerError::from)?;
        let runner = self.factory.build(&spec, &self.ctx)?;

        let (name, _guard) = match requested {
            Some(name) => {
                let guard = self.lock_name(&name).await;
                (name, guard)
            }
            None => self.claim_generated_name().await?,
        };
        if self.root.is_cancelled() {
            return Err(BossError::ShuttingDown);
        }

        if let Some(existing) = self.find(&name) {
            debug!(laborer = %name, "replacing existing laborer");
            self.retire(&name, &existing).await?;
        }

        let laborer = Arc::new(Laborer::new(
            name.clone(),
            project,
            restart,
            runner,
            self.ctx.clone(),
            self.events.clone(),
        ));

        let displaced = self.write().insert(name.clone(), laborer.clone());
        if let Some(old) = displaced {
            if let Err(e) = old.dispose().await {
                warn!(laborer = %name, error = %e, "displaced laborer failed to stop");
            }
        }
        self.changed(&name, WorkChange::Registered);
        info!(laborer = %name, kind = %spec.kind(), restart = ?restart, "laborer registered");

        laborer.run(&self.root).await?;
        self.changed(&name, WorkChange::Started);
        Ok(laborer.snapshot())
    }

    /// Start (or restart) a registered laborer.
    pub async fn start(&self, name: &str) -> Result<LaborerSnapshot, BossError> {
        let _guard = self.lock_name(name).await;
        let laborer = self.require(name)?;
        if self.root.is_cancelled() {
            return Err(BossError::ShuttingDown);
        }
        laborer.run(&self.root).await.map_err(|source| match source {
            RunnerError::Disposed => BossError::NotFound(name.to_string()),
            source => BossError::StopFailed {
                name: name.to_string(),
                source,
            },
        })?;
        self.changed(name, WorkChange::Started);
        Ok(laborer.snapshot())
    }

    pub async fn stop(&self, name: &str) -> Result<LaborerSnapshot, BossError> {
        let _guard = self.lock_name(name).await;
        let laborer = self.require(name)?;
        laborer.stop().await.map_err(|source| BossError::StopFailed {
            name: name.to_string(),
            source,
        })?;
        info!(laborer = %name, "laborer stopped");
        self.changed(name, WorkChange::Stopped);
        Ok(laborer.snapshot())
    }

    pub async fn pause(&self, name: &str) -> Result<LaborerSnapshot, BossError> {
        let _guard = self.lock_name(name).await;
        let laborer = self.require(name)?;
        laborer.pause()?;
        self.changed(name, WorkChange::Paused);
        Ok(laborer.snapshot())
    }

    pub async fn resume(&self, name: &str) -> Result<LaborerSnapshot, BossError> {
        let _guard = self.lock_name(name).await;
        let laborer = self.require(name)?;
        laborer.resume()?;
        self.changed(name, WorkChange::Resumed);
        Ok(laborer.snapshot())
    }

    /// Stop the laborer, then unregister it. A failed stop leaves it registered.
    pub async fn remove(&self, name: &str) -> Result<LaborerSnapshot, BossError> {
        let _guard = self.lock_name(name).await;
        let laborer = self.require(name)?;
        self.retire(name, &laborer).await?;
        self.release_name(name);
        Ok(laborer.snapshot())
    }

    /// Queue a line for the laborer's process input.
    pub fn send(&self, name: &str, line: &str) -> Result<(), BossError> {
        self.require(name)?.send(line)?;
        Ok(())
    }

    /// Snapshots of every registered laborer, ordered by name.
    pub fn get_work(&self) -> Vec<LaborerSnapshot> {
        let mut all: Vec<_> = self.read().values().map(|l| l.snapshot()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn get(&self, name: &str) -> Result<LaborerSnapshot, BossError> {
        Ok(self.require(name)?.snapshot())
    }

    /// Current contents of the laborer's `kind` log; empty before the first run.
    pub async fn read_log(&self, name: &str, kind: LogKind) -> Result<String, BossError> {
        let laborer = self.require(name)?;
        Ok(ProjectLog::read_existing(self.ctx.log_dir(), laborer.project(), kind).await?)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Wait for `shutdown`, then stop and dispose every laborer in turn.
    ///
    /// Individual failures are logged and skipped.
    pub async fn run(&self, shutdown: CancellationToken) {
        debug!("boss waiting for shutdown");
        shutdown.cancelled().await;

        info!(laborers = self.len(), "boss shutting down");
        self.root.cancel();

        let drained: Vec<_> = self.write().drain().collect();
        for (name, laborer) in drained {
            match laborer.dispose().await {
                Ok(()) => debug!(laborer = %name, "laborer disposed on shutdown"),
                Err(e) => warn!(laborer = %name, error = %e, "laborer failed to stop on shutdown"),
            }
        }
        info!("boss stopped");
    }

    /// Dispose `laborer` and unregister it. Callers hold the name lock.
    async fn retire(&self, name: &str, laborer: &Arc<Laborer>) -> Result<(), BossError> {
        laborer.dispose().await.map_err(|source| BossError::StopFailed {
            name: name.to_string(),
            source,
        })?;

        {
            let mut map = self.write();
            if map.get(name).is_some_and(|cur| Arc::ptr_eq(cur, laborer)) {
                map.remove(name);
            }
        }
        info!(laborer = %name, "laborer removed");
        self.changed(name, WorkChange::Removed);
        Ok(())
    }

    async fn lock_name(&self, name: &str) -> OwnedMutexGuard<()> {
        let slot = lock(&self.name_locks)
            .entry(name.to_string())
            .or_default()
            .clone();
        slot.lock_owned().await
    }

    /// Drop the lock slot of a removed name unless someone is waiting on it.
    fn release_name(&self, name: &str) {
        let mut locks = lock(&self.name_locks);
        // One reference in the table, one held by the caller's guard.
        if locks.get(name).is_some_and(|slot| Arc::strong_count(slot) <= 2) {
            locks.remove(name);
        }
    }

    /// Pick a free generated name and lock it before anyone else can.
    async fn claim_generated_name(&self) -> Result<(LaborerName, OwnedMutexGuard<()>), BossError> {
        for _ in 0..=MAX_NAME_ATTEMPTS {
            let name = self.unique_name()?;
            let guard = self.lock_name(&name).await;
            if self.find(&name).is_none() {
                return Ok((name, guard));
            }
            trace!(laborer = %name, "generated name taken while waiting; retrying");
        }
        Err(BossError::NamesExhausted(MAX_NAME_ATTEMPTS))
    }

    fn unique_name(&self) -> Result<String, BossError> {
        let map = self.read();
        let first = self.names.generate();
        if !map.contains_key(&first) {
            return Ok(first);
        }
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let candidate = self.names.regenerate(attempt);
            if !map.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
        Err(BossError::NamesExhausted(MAX_NAME_ATTEMPTS))
    }

    fn find(&self, name: &str) -> Option<Arc<Laborer>> {
        self.read().get(name).cloned()
    }

    fn require(&self, name: &str) -> Result<Arc<Laborer>, BossError> {
        self.find(name)
            .ok_or_else(|| BossError::NotFound(name.to_string()))
    }

    fn changed(&self, name: &str, change: WorkChange) {
        self.events.publish(WorkEvent::Changed {
            name: name.to_string(),
            change,
        });
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<LaborerName, Arc<Laborer>>> {
        self.laborers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<LaborerName, Arc<Laborer>>> {
        self.laborers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use foreman_model::RunnerState;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::testing::{FakeFactory, Tally};

    fn boss() -> (Boss, Arc<Tally>) {
        let factory = FakeFactory::default();
        let tally = factory.tally.clone();
        (Boss::new(Arc::new(factory), BuildContext::default()), tally)
    }

    fn project(executable: &str) -> Project {
        Project::new("api", executable)
    }

    /// Always proposes the same base name.
    struct FixedNames {
        retries: bool,
    }

    impl NameGenerator for FixedNames {
        fn generate(&self) -> String {
            "dup".into()
        }

        fn regenerate(&self, attempt: u32) -> String {
            if self.retries {
                format!("dup-{attempt}")
            } else {
                "dup".into()
            }
        }
    }

    #[tokio::test]
    async fn unknown_name_operations_fail_without_events() {
        let (boss, _) = boss();
        let mut rx = boss.subscribe();

        assert!(boss.start("ghost").await.unwrap_err().is_not_found());
        assert!(boss.stop("ghost").await.unwrap_err().is_not_found());
        assert!(boss.pause("ghost").await.unwrap_err().is_not_found());
        assert!(boss.resume("ghost").await.unwrap_err().is_not_found());
        assert!(boss.remove("ghost").await.unwrap_err().is_not_found());
        assert!(boss.get("ghost").unwrap_err().is_not_found());
        assert!(boss.send("ghost", "hi").unwrap_err().is_not_found());

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_project_twice_replaces_laborer() {
        let (boss, tally) = boss();

        boss.run_project(project("sleep"), Some("w1".into())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let snap = boss.run_project(project("sleep"), Some("w1".into())).await.unwrap();

        assert_eq!(snap.name, "w1");
        assert_eq!(boss.len(), 1);
        assert_eq!(tally.canceled(), 1);
        assert_eq!(tally.max_live(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_hires_of_one_name_never_overlap() {
        let (boss, tally) = boss();
        let boss = Arc::new(boss);

        let hires: Vec<_> = (0..8)
            .map(|_| {
                let boss = boss.clone();
                tokio::spawn(async move {
                    boss.run_project(project("sleep"), Some("w1".into())).await
                })
            })
            .collect();
        for hire in hires {
            hire.await.unwrap().unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(boss.len(), 1);
        assert_eq!(tally.started(), 8);
        assert_eq!(tally.max_live(), 1);
        assert_eq!(tally.live(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn start_racing_remove_leaves_nothing_running() {
        let (boss, tally) = boss();
        let boss = Arc::new(boss);
        boss.run_project(project("sleep"), Some("w1".into())).await.unwrap();

        let remove = tokio::spawn({
            let boss = boss.clone();
            async move { boss.remove("w1").await }
        });
        let start = tokio::spawn({
            let boss = boss.clone();
            async move { boss.start("w1").await }
        });
        remove.await.unwrap().unwrap();
        match start.await.unwrap() {
            Ok(_) => {}
            Err(e) => assert!(e.is_not_found(), "unexpected error: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(boss.is_empty());
        assert_eq!(tally.live(), 0);
        assert!(boss.start("w1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn lifecycle_events_are_published() {
        let (boss, _) = boss();
        let mut rx = boss.subscribe();

        boss.run_project(project("sleep"), Some("w1".into())).await.unwrap();
        boss.stop("w1").await.unwrap();
        boss.remove("w1").await.unwrap();

        let mut changes = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if let WorkEvent::Changed { change, .. } = ev {
                changes.push(change);
            }
        }
        assert_eq!(
            changes,
            vec![
                WorkChange::Registered,
                WorkChange::Started,
                WorkChange::Stopped,
                WorkChange::Removed
            ]
        );
        assert!(boss.is_empty());
    }

    #[tokio::test]
    async fn stop_then_start_reruns() {
        let (boss, tally) = boss();

        boss.run_project(project("sleep"), Some("w1".into())).await.unwrap();
        let stopped = boss.stop("w1").await.unwrap();
        assert!(!stopped.running);

        let started = boss.start("w1").await.unwrap();
        assert!(started.running);
        assert_eq!(tally.started(), 2);
    }

    #[tokio::test]
    async fn failed_stop_keeps_laborer_registered() {
        let (boss, _) = boss();
        boss.run_project(project("fault"), Some("w1".into())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let err = boss.remove("w1").await.unwrap_err();
        assert!(matches!(err, BossError::StopFailed { .. }));
        assert!(boss.get("w1").is_ok());
    }

    #[tokio::test]
    async fn generated_names_retry_on_collision() {
        let (boss, _) = boss();
        let boss = boss.with_names(Arc::new(FixedNames { retries: true }));

        let a = boss.run_project(project("sleep"), None).await.unwrap();
        let b = boss.run_project(project("sleep"), None).await.unwrap();
        assert_eq!(a.name, "dup");
        assert_eq!(b.name, "dup-1");
        assert_eq!(boss.len(), 2);
    }

    #[tokio::test]
    async fn generated_names_can_run_out() {
        let (boss, _) = boss();
        let boss = boss.with_names(Arc::new(FixedNames { retries: false }));

        boss.run_project(project("sleep"), None).await.unwrap();
        let err = boss.run_project(project("sleep"), None).await.unwrap_err();
        assert!(matches!(err, BossError::NamesExhausted(MAX_NAME_ATTEMPTS)));
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let (boss, _) = boss();
        let err = boss.run_project(project("sleep"), Some("  ".into())).await.unwrap_err();
        assert!(matches!(err, BossError::InvalidName(_)));
        assert!(boss.is_empty());
    }

    #[tokio::test]
    async fn send_reaches_runner() {
        let (boss, tally) = boss();
        boss.run_project(project("sleep"), Some("w1".into())).await.unwrap();

        boss.send("w1", "status").unwrap();
        assert_eq!(*tally.sent.lock().unwrap(), vec!["status".to_string()]);
    }

    #[tokio::test]
    async fn pause_unsupported_by_runner_is_an_error() {
        let (boss, _) = boss();
        let mut rx = boss.subscribe();
        boss.run_project(project("sleep"), Some("w1".into())).await.unwrap();
        while rx.try_recv().is_ok() {}

        let err = boss.pause("w1").await.unwrap_err();
        assert!(matches!(err, BossError::Runner(_)));
        let paused = std::iter::from_fn(|| rx.try_recv().ok())
            .any(|ev| matches!(ev, WorkEvent::Changed { change: WorkChange::Paused, .. }));
        assert!(!paused);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_sweep_is_fault_tolerant() {
        let (boss, tally) = boss();
        let boss = Arc::new(boss);

        boss.run_project(project("fault"), Some("bad".into())).await.unwrap();
        boss.run_project(project("sleep"), Some("good".into())).await.unwrap();
        boss.run_project(project("canceled"), Some("quiet".into())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let shutdown = CancellationToken::new();
        let task = tokio::spawn({
            let boss = boss.clone();
            let shutdown = shutdown.clone();
            async move { boss.run(shutdown).await }
        });

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();

        assert!(boss.is_empty());
        assert_eq!(tally.canceled(), 3);
        let err = boss.run_project(project("sleep"), None).await.unwrap_err();
        assert!(matches!(err, BossError::ShuttingDown));
    }

    #[tokio::test]
    async fn read_log_is_empty_before_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let boss = Boss::new(
            Arc::new(FakeFactory::default()),
            BuildContext::default().with_log_dir(dir.path()),
        );
        boss.run_project(project("sleep"), Some("w1".into())).await.unwrap();

        assert_eq!(boss.read_log("w1", LogKind::Runtime).await.unwrap(), "");
    }

    #[tokio::test]
    async fn snapshots_are_sorted_by_name() {
        let (boss, _) = boss();
        boss.run_project(project("sleep"), Some("b".into())).await.unwrap();
        boss.run_project(project("sleep"), Some("a".into())).await.unwrap();

        let names: Vec<_> = boss.get_work().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(
            boss.get_work()
                .iter()
                .all(|s| s.state == RunnerState::Created || s.state == RunnerState::Running)
        );
    }
}
