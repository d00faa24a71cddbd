use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::error::{ModelError, ModelResult};

/// Declared restart intent of a laborer.
///
/// Stored and reported only; the supervisor never restarts a laborer on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum RestartPolicy {
    #[default]
    Never,
    OnFailure,
    UnlessStopped,
    Always,
}

impl FromStr for RestartPolicy {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" | "no" | "" => Ok(RestartPolicy::Never),
            "on-failure" | "onfailure" | "failure" => Ok(RestartPolicy::OnFailure),
            "unless-stopped" | "unlessstopped" => Ok(RestartPolicy::UnlessStopped),
            "always" => Ok(RestartPolicy::Always),
            other => Err(ModelError::UnknownRestart(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_docker_style_names() {
        assert_eq!("no".parse::<RestartPolicy>().unwrap(), RestartPolicy::Never);
        assert_eq!(
            "on-failure".parse::<RestartPolicy>().unwrap(),
            RestartPolicy::OnFailure
        );
        assert_eq!(
            "Unless-Stopped".parse::<RestartPolicy>().unwrap(),
            RestartPolicy::UnlessStopped
        );
        assert_eq!("ALWAYS".parse::<RestartPolicy>().unwrap(), RestartPolicy::Always);
    }

    #[test]
    fn rejects_unknown() {
        let err = "sometimes".parse::<RestartPolicy>().unwrap_err();
        assert!(matches!(err, ModelError::UnknownRestart(ref s) if s == "sometimes"));
    }

    #[test]
    fn default_is_never() {
        assert_eq!(RestartPolicy::default(), RestartPolicy::Never);
    }
}
