use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::require_project_member;
use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::extract::ApiJson;
use crate::api::rest::middleware::AuthContext;
use crate::shared::models::constants::{canonical_value, TASK_STATUSES};
use crate::shared::models::{AppState, CreateTaskRequest, Project, Task, UpdateTaskRequest};

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<String>,
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Query(query): Query<TaskListQuery>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Task>>> {
    let project = require_project_member(&state, &project_id, auth.user_id()).await?;

    let status = match query.status.as_deref() {
        Some(s) => Some(
            canonical_value(s, &TASK_STATUSES)
                .ok_or_else(|| ApiError::BadRequest(format!("Invalid status '{}'", s)))?,
        ),
        None => None,
    };

    let tasks = Task::find_by_project(&state.db, &project.id, status).await?;
    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate().map_err(ApiError::BadRequest)?;
    let project = require_project_member(&state, &project_id, auth.user_id()).await?;

    if let Some(assignee) = req.assignee_id.as_deref().filter(|a| !a.trim().is_empty()) {
        if !Project::is_member(&state.db, &project.id, assignee).await? {
            return Err(ApiError::BadRequest(
                "Assignee must be a member of the project".to_string(),
            ));
        }
    }

    let task = Task::create(&state.db, req.into_new_task(&project.id, auth.user_id())).await?;
    info!(user_id = %auth.user_id(), task_id = %task.id, project_id = %project.id, "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn load_task_for_member(state: &AppState, id: &str, user_id: &str) -> ApiResult<Task> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    require_project_member(state, &task.project_id, user_id).await?;
    Ok(task)
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate().map_err(ApiError::BadRequest)?;
    let task = load_task_for_member(&state, &id, auth.user_id()).await?;

    if let Some(assignee) = req.assignee_id.as_deref().filter(|a| !a.trim().is_empty()) {
        if !Project::is_member(&state.db, &task.project_id, assignee).await? {
            return Err(ApiError::BadRequest(
                "Assignee must be a member of the project".to_string(),
            ));
        }
    }

    let updated = Task::update_by_id(&state.db, &task.id, req).await?;
    Ok(Json(updated))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    let task = load_task_for_member(&state, &id, auth.user_id()).await?;
    if !Task::delete_by_id(&state.db, &task.id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
