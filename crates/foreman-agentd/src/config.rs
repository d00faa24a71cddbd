use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;
use serde::Deserialize;

use foreman_model::Env;
use foreman_observe::LoggerConfig;

/// Environment variable naming the JSON config file.
pub const CONFIG_ENV: &str = "FOREMAN_CONFIG";

const DEFAULT_LOG_DIR: &str = "./logs";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentdConfig {
    pub logger: LoggerConfig,
    /// Listen address of the control plane.
    pub http_addr: SocketAddr,
    /// Root of per-project logs.
    pub log_dir: PathBuf,
    /// Environment merged under every project's own.
    pub env: Env,
}

impl Default for AgentdConfig {
    fn default() -> Self {
        Self {
            logger: LoggerConfig::default(),
            http_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            env: Env::default(),
        }
    }
}

impl AgentdConfig {
    /// Load from the file named by [`CONFIG_ENV`], or defaults when unset.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_json(&raw)
                    .with_context(|| format!("invalid config {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
