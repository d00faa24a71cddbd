use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{LaborerName, Project, RestartPolicy, RunnerSpec, RunnerState};

/// Point-in-time view of a laborer, as served to the control plane.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct LaborerSnapshot {
    pub name: LaborerName,
    pub project: Project,
    pub restart: RestartPolicy,
    pub runner: RunnerSpec,
    pub state: RunnerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_exit_code: Option<i32>,
    /// A run task is in flight.
    pub running: bool,
}
