use async_trait::async_trait;

use foreman_model::{LaborerSnapshot, LogKind, Project};

use crate::ApiError;

/// Backend of the control plane.
///
/// Implemented by [`crate::BossAdapter`]; custom handlers can wrap it to add
/// auth or auditing.
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    async fn list_work(&self) -> Result<Vec<LaborerSnapshot>, ApiError>;

    async fn get_work(&self, name: &str) -> Result<LaborerSnapshot, ApiError>;

    /// Register `project` under `name` (generated when `None`) and start it.
    async fn run_project(
        &self,
        name: Option<String>,
        project: Project,
    ) -> Result<LaborerSnapshot, ApiError>;

    async fn start(&self, name: &str) -> Result<LaborerSnapshot, ApiError>;

    async fn stop(&self, name: &str) -> Result<LaborerSnapshot, ApiError>;

    async fn pause(&self, name: &str) -> Result<LaborerSnapshot, ApiError>;

    async fn resume(&self, name: &str) -> Result<LaborerSnapshot, ApiError>;

    /// Stop and unregister.
    async fn remove(&self, name: &str) -> Result<LaborerSnapshot, ApiError>;

    /// Queue one line for the process input.
    async fn send(&self, name: &str, line: &str) -> Result<(), ApiError>;

    async fn read_log(&self, name: &str, kind: LogKind) -> Result<String, ApiError>;
}
