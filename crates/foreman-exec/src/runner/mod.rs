//! Concrete runners and the factory that builds them from specs.
mod process;
pub use process::ProcessRunner;

mod sequence;
pub use sequence::SequenceRunner;

use std::sync::Arc;

use tracing::trace;

use foreman_core::{BuildContext, Runner, RunnerError, RunnerFactory};
use foreman_model::RunnerSpec;

use crate::process::ProcessOptions;

/// Builds process and sequence runners.
#[derive(Debug, Clone, Default)]
pub struct ExecRunnerFactory {
    options: ProcessOptions,
}

impl ExecRunnerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ProcessOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    fn build_with(
        &self,
        spec: &RunnerSpec,
        ctx: &BuildContext,
        options: &ProcessOptions,
    ) -> Result<Arc<dyn Runner>, RunnerError> {
        match spec {
            RunnerSpec::Process(p) => {
                trace!(executable = %p.executable, "building process runner");
                let runner = ProcessRunner::new(p.clone(), ctx.env(), options.clone())?;
                Ok(Arc::new(runner))
            }
            RunnerSpec::Sequence { steps } => {
                trace!(steps = steps.len(), "building sequence runner");
                let step_options = options.clone().with_truncate_log(false);
                let steps = steps
                    .iter()
                    .map(|s| self.build_with(s, ctx, &step_options))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Arc::new(SequenceRunner::new(steps)))
            }
        }
    }
}

impl RunnerFactory for ExecRunnerFactory {
    fn build(&self, spec: &RunnerSpec, ctx: &BuildContext) -> Result<Arc<dyn Runner>, RunnerError> {
        spec.validate()?;
        self.build_with(spec, ctx, &self.options)
    }
}
