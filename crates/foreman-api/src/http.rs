use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use foreman_model::{LogKind, Project};

use crate::{ApiError, ApiHandler};

/// HTTP control plane builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
}

impl<H> HttpApi<H>
where
    H: ApiHandler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Routes:
    /// - GET    /api/v1/work                - list laborers
    /// - POST   /api/v1/work                - run a project `{ name?, project }`
    /// - GET    /api/v1/work/{name}         - one laborer
    /// - DELETE /api/v1/work/{name}         - stop and remove
    /// - POST   /api/v1/work/{name}/start   - (re)start
    /// - POST   /api/v1/work/{name}/stop    - stop
    /// - POST   /api/v1/work/{name}/pause   - suspend the process
    /// - POST   /api/v1/work/{name}/resume  - continue the process
    /// - POST   /api/v1/work/{name}/send    - queue `{ line }` for stdin
    /// - GET    /api/v1/work/{name}/log     - log contents, `?kind=runtime|build`
    pub fn router(self) -> Router {
        Router::new()
            .route("/api/v1/work", get(list_work::<H>).post(run_project::<H>))
            .route(
                "/api/v1/work/{name}",
                get(get_work::<H>).delete(remove::<H>),
            )
            .route("/api/v1/work/{name}/start", post(start::<H>))
            .route("/api/v1/work/{name}/stop", post(stop::<H>))
            .route("/api/v1/work/{name}/pause", post(pause::<H>))
            .route("/api/v1/work/{name}/resume", post(resume::<H>))
            .route("/api/v1/work/{name}/send", post(send::<H>))
            .route("/api/v1/work/{name}/log", get(read_log::<H>))
            .with_state(self.handler)
    }
}

#[derive(Debug, Deserialize)]
struct RunProjectRequest {
    #[serde(default)]
    name: Option<String>,
    project: Project,
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    line: String,
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    kind: Option<String>,
}

async fn list_work<H: ApiHandler>(
    State(handler): State<Arc<H>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(handler.list_work().await?))
}

async fn run_project<H: ApiHandler>(
    State(handler): State<Arc<H>>,
    Json(req): Json<RunProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.project.executable.trim().is_empty() {
        return Err(ApiError::InvalidRequest("project executable is empty".into()));
    }
    Ok(Json(handler.run_project(req.name, req.project).await?))
}

async fn get_work<H: ApiHandler>(
    State(handler): State<Arc<H>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(handler.get_work(&name).await?))
}

async fn remove<H: ApiHandler>(
    State(handler): State<Arc<H>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(handler.remove(&name).await?))
}

async fn start<H: ApiHandler>(
    State(handler): State<Arc<H>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(handler.start(&name).await?))
}

async fn stop<H: ApiHandler>(
    State(handler): State<Arc<H>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(handler.stop(&name).await?))
}

async fn pause<H: ApiHandler>(
    State(handler): State<Arc<H>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(handler.pause(&name).await?))
}

async fn resume<H: ApiHandler>(
    State(handler): State<Arc<H>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(handler.resume(&name).await?))
}

async fn send<H: ApiHandler>(
    State(handler): State<Arc<H>>,
    Path(name): Path<String>,
    Json(req): Json<SendRequest>,
) -> Result<impl IntoResponse, ApiError> {
    handler.send(&name, &req.line).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn read_log<H: ApiHandler>(
    State(handler): State<Arc<H>>,
    Path(name): Path<String>,
    Query(query): Query<LogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = match query.kind.as_deref() {
        None => LogKind::default(),
        Some(raw) => raw
            .parse::<LogKind>()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?,
    };
    handler.read_log(&name, kind).await
}
