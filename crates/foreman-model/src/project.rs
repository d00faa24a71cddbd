use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{Env, ProcessSpec};

/// Work context a laborer runs on behalf of.
///
/// Only the launch description is carried here; project files, hashing and
/// packaging live with the host service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project name; default laborer name and log directory.
    pub name: String,
    /// Program to launch (absolute path or looked up in `PATH`).
    pub executable: String,
    /// Argument string, split with POSIX shell quoting rules at launch time.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub arguments: String,
    /// Working directory; inherits the supervisor's when `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
    /// Extra environment merged over the supervisor's.
    #[serde(default, skip_serializing_if = "Env::is_empty")]
    pub env: Env,
}

impl Project {
    pub fn new(name: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            arguments: String::new(),
            working_directory: None,
            env: Env::default(),
        }
    }

    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = arguments.into();
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    /// Process launch description declared by this project.
    pub fn process_spec(&self) -> ProcessSpec {
        ProcessSpec {
            executable: self.executable.clone(),
            arguments: self.arguments.clone(),
            working_directory: self.working_directory.clone(),
            env: self.env.clone(),
        }
    }
}
