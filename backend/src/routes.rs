use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use prometheus::TEXT_FORMAT;
use shared::{CreateTaskRequest, HealthStatus, MessageBody, Task, UpdateTaskRequest};
use tracing::{error, info};

use crate::{error::ApiError, state::AppState};

pub const WELCOME_MESSAGE: &str = "Welcome to the task management API!";
pub const TASK_DELETED_MESSAGE: &str = "Task deleted successfully";

pub async fn welcome() -> Json<MessageBody> {
    Json(MessageBody {
        message: WELCOME_MESSAGE.to_string(),
    })
}

/// Liveness only: answers whenever the process is serving, without asking the
/// store.
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(body) => ([(CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            ApiError::Internal("failed to encode metrics".to_string()).into_response()
        }
    }
}

pub async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.store.list_all().await?;
    Ok(Json(tasks))
}

pub async fn get_task(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Task>, ApiError> {
    let task = state.store.find_by_id(&id).await?;
    Ok(Json(task))
}

pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let Json(payload) = payload?;
    let task = state.store.create(payload).await?;

    info!(id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    Path(id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Json(payload) = payload?;
    let task = state.store.update_by_id(&id, payload).await?;
    Ok(Json(task))
}

pub async fn delete_task(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MessageBody>, ApiError> {
    let task = state.store.delete_by_id(&id).await?;

    info!(id = %task.id, "task deleted");
    Ok(Json(MessageBody {
        message: TASK_DELETED_MESSAGE.to_string(),
    }))
}
