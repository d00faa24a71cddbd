use std::sync::Arc;

use async_trait::async_trait;

use foreman_core::Boss;
use foreman_model::{LaborerSnapshot, LogKind, Project};

use crate::{ApiError, ApiHandler};

/// [`ApiHandler`] delegating to a [`Boss`].
pub struct BossAdapter {
    boss: Arc<Boss>,
}

impl BossAdapter {
    pub fn new(boss: Arc<Boss>) -> Self {
        Self { boss }
    }
}

#[async_trait]
impl ApiHandler for BossAdapter {
    async fn list_work(&self) -> Result<Vec<LaborerSnapshot>, ApiError> {
        Ok(self.boss.get_work())
    }

    async fn get_work(&self, name: &str) -> Result<LaborerSnapshot, ApiError> {
        Ok(self.boss.get(name)?)
    }

    async fn run_project(
        &self,
        name: Option<String>,
        project: Project,
    ) -> Result<LaborerSnapshot, ApiError> {
        Ok(self.boss.run_project(project, name).await?)
    }

    async fn start(&self, name: &str) -> Result<LaborerSnapshot, ApiError> {
        Ok(self.boss.start(name).await?)
    }

    async fn stop(&self, name: &str) -> Result<LaborerSnapshot, ApiError> {
        Ok(self.boss.stop(name).await?)
    }

    async fn pause(&self, name: &str) -> Result<LaborerSnapshot, ApiError> {
        Ok(self.boss.pause(name).await?)
    }

    async fn resume(&self, name: &str) -> Result<LaborerSnapshot, ApiError> {
        Ok(self.boss.resume(name).await?)
    }

    async fn remove(&self, name: &str) -> Result<LaborerSnapshot, ApiError> {
        Ok(self.boss.remove(name).await?)
    }

    async fn send(&self, name: &str, line: &str) -> Result<(), ApiError> {
        Ok(self.boss.send(name, line)?)
    }

    async fn read_log(&self, name: &str, kind: LogKind) -> Result<String, ApiError> {
        Ok(self.boss.read_log(name, kind).await?)
    }
}
