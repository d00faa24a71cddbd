pub mod boss;
pub mod event;
pub mod laborer;
pub mod log;
pub mod metrics;
pub mod names;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use boss::{Boss, BossError};
pub use event::{EventBus, WorkChange, WorkEvent};
pub use laborer::Laborer;
pub use log::ProjectLog;
pub use metrics::{MetricsBackend, MetricsHandle, NoOpMetrics, RunResult, noop_metrics};
pub use names::{HumanNames, NameGenerator};
pub use runner::{BuildContext, Runner, RunnerError, RunnerFactory, WorkContext};

pub mod prelude {
    pub use crate::boss::{Boss, BossError};
    pub use crate::event::{EventBus, WorkEvent};
    pub use crate::runner::{BuildContext, Runner, RunnerError, RunnerFactory, WorkContext};
}
