//! Process execution for foreman: the command queue, the stdin proxy, the
//! process orchestrator and the runners built on top of them.
mod error;
pub use error::ExecError;

mod queue;
pub use queue::CommandQueue;

mod stdin;
pub use stdin::StdinProxy;

pub mod process;
pub use process::{EXIT_COMMAND, ProcessOptions, SHUTDOWN_GRACE};

mod runner;
pub use runner::{ExecRunnerFactory, ProcessRunner, SequenceRunner};
