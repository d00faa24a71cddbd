use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{ModelError, ModelResult};

/// Which project log a sink writes to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum LogKind {
    #[default]
    Runtime,
    Build,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Runtime => "runtime",
            LogKind::Build => "build",
        }
    }

    /// File name of this log inside a project's log directory.
    pub fn file_name(&self) -> String {
        format!("{}.log", self.as_str())
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogKind {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "runtime" | "" => Ok(LogKind::Runtime),
            "build" => Ok(LogKind::Build),
            other => Err(ModelError::UnknownLogKind(other.to_string())),
        }
    }
}
