use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::{require_project_member, require_project_owner};
use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::extract::ApiJson;
use crate::api::rest::middleware::AuthContext;
use crate::shared::models::constants::{canonical_value, MEMBER_ROLE_ADMIN, MEMBER_ROLE_MEMBER};
use crate::shared::models::{
    AddMemberRequest, AppState, CreateProjectRequest, DatabaseError, Project, UpdateProjectRequest,
    User,
};

fn duplicate_title(title: &str) -> ApiError {
    ApiError::Conflict(format!(
        "Project '{}' already exists. Choose a different title.",
        title.trim()
    ))
}

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Project>>> {
    let projects = Project::find_accessible(&state.db, auth.user_id()).await?;
    Ok(Json(projects))
}

pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    req.validate().map_err(ApiError::BadRequest)?;

    if Project::find_owned_by_title(&state.db, auth.user_id(), req.title.trim())
        .await?
        .is_some()
    {
        return Err(duplicate_title(&req.title));
    }

    let title = req.title.clone();
    let project = Project::create(&state.db, req.into_new_project(auth.user_id()))
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::Unique(_) => duplicate_title(&title),
            other => ApiError::Database(other),
        })?;

    info!(user_id = %auth.user_id(), project_id = %project.id, "Project created");
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Project>> {
    let project = require_project_member(&state, &id, auth.user_id()).await?;
    Ok(Json(project))
}

pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate().map_err(ApiError::BadRequest)?;
    let project = require_project_owner(&state, &id, auth.user_id()).await?;

    if let Some(title) = req.title.as_deref().map(str::trim) {
        if title != project.title {
            if let Some(other) =
                Project::find_owned_by_title(&state.db, auth.user_id(), title).await?
            {
                if other.id != project.id {
                    return Err(duplicate_title(title));
                }
            }
        }
    }

    let updated = Project::update_by_id(&state.db, &project.id, req)
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::Unique(_) => {
                ApiError::Conflict("Project title already exists".to_string())
            }
            other => ApiError::Database(other),
        })?;
    Ok(Json(updated))
}

pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    let project = require_project_owner(&state, &id, auth.user_id()).await?;
    if !Project::delete_by_id(&state.db, &project.id).await? {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }
    info!(user_id = %auth.user_id(), project_id = %project.id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<AddMemberRequest>,
) -> ApiResult<Json<Value>> {
    req.validate().map_err(ApiError::BadRequest)?;
    let project = require_project_owner(&state, &id, auth.user_id()).await?;

    let member_id = req.user_id.trim();
    if member_id == project.owner_id {
        return Err(ApiError::BadRequest(
            "The owner is already a member".to_string(),
        ));
    }
    User::find_by_id(&state.db, member_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let role = req
        .role
        .as_deref()
        .and_then(|r| canonical_value(r, &[MEMBER_ROLE_MEMBER, MEMBER_ROLE_ADMIN]))
        .unwrap_or(MEMBER_ROLE_MEMBER);
    Project::add_member(&state.db, &project.id, member_id, role).await?;

    info!(project_id = %project.id, member_id = %member_id, role = %role, "Member added");
    Ok(Json(json!({
        "project_id": project.id,
        "user_id": member_id,
        "role": role
    })))
}
