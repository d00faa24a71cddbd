mod domain;
pub use domain::{Env, KeyValue, LaborerName};

mod error;
pub use error::{ModelError, ModelResult};

mod kind;
pub use kind::{ProcessSpec, RunnerKind, RunnerSpec};

mod project;
pub use project::Project;

mod state;
pub use state::RunnerState;

mod strategy;
pub use strategy::RestartPolicy;

mod log;
pub use log::LogKind;

mod outcome;
pub use outcome::{COMPLETED_MESSAGE, EXITED_MESSAGE, WorkOutcome};

mod snapshot;
pub use snapshot::LaborerSnapshot;
