use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::logger::object::{LoggerFormat, LoggerLevel, LoggerTimeZone};

/// Logger section of the agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` expression, e.g. `"info"` or `"foreman_exec=debug,info"`.
    pub level: LoggerLevel,
    /// Zone of log timestamps.
    pub tz: LoggerTimeZone,
    /// Include module targets in output.
    pub with_targets: bool,
    /// Allow ANSI colors; only honoured when stdout is a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Colors are used only when enabled and stdout is a terminal.
    ///
    /// Evaluated at init time so redirected output stays plain.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LoggerConfig::default();

        assert_eq!(config.format, LoggerFormat::Text);
        assert_eq!(config.tz, LoggerTimeZone::Utc);
        assert_eq!(config.level.as_str(), "info");
        assert!(config.with_targets);
        assert!(config.use_color);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: LoggerConfig =
            serde_json::from_str(r#"{"format": "json", "level": "foreman_core=debug,info"}"#)
                .unwrap();

        assert_eq!(config.format, LoggerFormat::Json);
        assert_eq!(config.level.as_str(), "foreman_core=debug,info");
        assert_eq!(config.tz, LoggerTimeZone::Utc);
        assert!(config.with_targets);
    }

    #[test]
    fn invalid_level_fails_deserialization() {
        let res = serde_json::from_str::<LoggerConfig>(r#"{"level": "foreman_exec=loud"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn serializes_canonical_names() {
        let config = LoggerConfig {
            tz: LoggerTimeZone::Local,
            use_color: false,
            ..Default::default()
        };
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["format"], "text");
        assert_eq!(json["tz"], "local");
        assert_eq!(json["level"], "info");
        assert_eq!(json["use_color"], false);
    }
}
