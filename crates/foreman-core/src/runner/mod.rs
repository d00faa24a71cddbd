//! Runner abstraction: the unit of work a laborer supervises.
//!
//! Concrete runners live in `foreman-exec`; the boss only sees them through
//! [`Runner`] and builds them through an injected [`RunnerFactory`].
mod error;
pub use error::RunnerError;

mod context;
pub use context::{BuildContext, DEFAULT_LOG_DIR, WorkContext};

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use foreman_model::{RunnerKind, RunnerSpec, RunnerState, WorkOutcome};

/// Polymorphic unit of work.
///
/// `work` runs to completion and reports `(exit code, message)`. Cancelling
/// `cancel` asks the runner to wind down cooperatively; runners must still
/// return once they do.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Variant discriminator used in logs, metrics and serialization.
    fn kind(&self) -> RunnerKind;

    /// Serializable description this runner can be rebuilt from.
    fn spec(&self) -> RunnerSpec;

    /// Current lifecycle state.
    fn state(&self) -> RunnerState;

    async fn work(
        &self,
        ctx: &WorkContext,
        cancel: CancellationToken,
    ) -> Result<WorkOutcome, RunnerError>;

    /// Queue a line for the standard input of the running process.
    fn send(&self, _line: &str) -> Result<(), RunnerError> {
        Err(RunnerError::Unsupported {
            op: "send",
            runner: self.kind().as_str(),
        })
    }

    /// Suspend the running process.
    fn pause(&self) -> Result<(), RunnerError> {
        Err(RunnerError::Unsupported {
            op: "pause",
            runner: self.kind().as_str(),
        })
    }

    /// Continue a suspended process.
    fn resume(&self) -> Result<(), RunnerError> {
        Err(RunnerError::Unsupported {
            op: "resume",
            runner: self.kind().as_str(),
        })
    }
}

/// Builds runners from their serializable description.
pub trait RunnerFactory: Send + Sync {
    fn build(&self, spec: &RunnerSpec, ctx: &BuildContext) -> Result<Arc<dyn Runner>, RunnerError>;
}
