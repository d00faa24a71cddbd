use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{Env, ModelError, ModelResult};

/// Stable discriminator of a runner variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum RunnerKind {
    Process,
    Sequence,
}

impl RunnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerKind::Process => "process",
            RunnerKind::Sequence => "sequence",
        }
    }
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunnerKind {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "process" => Ok(RunnerKind::Process),
            "sequence" => Ok(RunnerKind::Sequence),
            other => Err(ModelError::UnknownRunnerKind(other.to_string())),
        }
    }
}

/// Launch description of a single OS process.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ProcessSpec {
    pub executable: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub arguments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Env::is_empty")]
    pub env: Env,
}

impl ProcessSpec {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            ..Default::default()
        }
    }

    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = arguments.into();
        self
    }
}

/// Serializable form of a runner tree.
///
/// The `type` tag carries the [`RunnerKind`] name, so a runner can be rebuilt
/// from persisted or transmitted state by a runner factory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RunnerSpec {
    /// One OS process.
    Process(ProcessSpec),
    /// Steps run in order until the first non-zero exit.
    Sequence { steps: Vec<RunnerSpec> },
}

impl RunnerSpec {
    pub fn kind(&self) -> RunnerKind {
        match self {
            RunnerSpec::Process(_) => RunnerKind::Process,
            RunnerSpec::Sequence { .. } => RunnerKind::Sequence,
        }
    }

    /// Reject trees that can never launch anything.
    pub fn validate(&self) -> ModelResult<()> {
        match self {
            RunnerSpec::Process(p) if p.executable.trim().is_empty() => {
                Err(ModelError::Invalid("process executable is empty".into()))
            }
            RunnerSpec::Process(_) => Ok(()),
            RunnerSpec::Sequence { steps } if steps.is_empty() => {
                Err(ModelError::Invalid("sequence has no steps".into()))
            }
            RunnerSpec::Sequence { steps } => steps.iter().try_for_each(RunnerSpec::validate),
        }
    }
}

impl From<ProcessSpec> for RunnerSpec {
    fn from(spec: ProcessSpec) -> Self {
        RunnerSpec::Process(spec)
    }
}
