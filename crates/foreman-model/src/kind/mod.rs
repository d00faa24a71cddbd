mod runner;
pub use runner::{ProcessSpec, RunnerKind, RunnerSpec};
