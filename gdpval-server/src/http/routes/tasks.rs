//! Task endpoints

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::db::StoreError;
use crate::http::error::ApiError;
use crate::http::extractors::{ValidJson, ValidListQuery};
use crate::http::server::AppState;
use crate::models::{NewTask, TaskDetail, TaskHeader};

/// Run a store call under the configured deadline.
///
/// On expiry the store future is dropped, and with it any open transaction,
/// so nothing half-written survives the timeout.
async fn with_deadline<T>(
    limit: Duration,
    op: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, ApiError> {
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => Err(ApiError::Timeout {
            seconds: limit.as_secs(),
        }),
    }
}

/// POST /api/tasks - store a task and all its child rows
async fn create_task(
    State(state): State<Arc<AppState>>,
    ValidJson(task): ValidJson<NewTask>,
) -> Result<(StatusCode, Json<TaskHeader>), ApiError> {
    task.validate()?;

    let header = with_deadline(state.operation_timeout, state.store.create_task(&task)).await?;
    Ok((StatusCode::CREATED, Json(header)))
}

/// GET /api/tasks/{task_id} - task header
async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskHeader>, ApiError> {
    let header = with_deadline(state.operation_timeout, state.store.get_task(&task_id)).await?;
    Ok(Json(header))
}

/// GET /api/tasks/{task_id}/detail - header with rubrics, files and artifacts
async fn get_task_detail(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskDetail>, ApiError> {
    let detail =
        with_deadline(state.operation_timeout, state.store.get_task_detail(&task_id)).await?;
    Ok(Json(detail))
}

/// GET /api/tasks - filtered, paginated headers, newest first
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    ValidListQuery(query): ValidListQuery,
) -> Result<Json<Vec<TaskHeader>>, ApiError> {
    let headers = with_deadline(state.operation_timeout, state.store.list_tasks(&query)).await?;
    Ok(Json(headers))
}

/// Task routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{task_id}", get(get_task))
        .route("/api/tasks/{task_id}/detail", get(get_task_detail))
}
