pub mod actions;
pub mod chats;
pub mod checklist;
pub mod projects;
pub mod reports;
pub mod settings;
pub mod tasks;

use crate::api::rest::error::{ApiError, ApiResult};
use crate::shared::models::{AppState, Project};

/// Loads a project the caller belongs to: 404 when absent, 403 otherwise.
pub(crate) async fn require_project_member(
    state: &AppState,
    project_id: &str,
    user_id: &str,
) -> ApiResult<Project> {
    let project = Project::find_by_id(&state.db, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    if !Project::is_member(&state.db, &project.id, user_id).await? {
        return Err(ApiError::Forbidden(
            "You are not a member of this project".to_string(),
        ));
    }
    Ok(project)
}

pub(crate) async fn require_project_owner(
    state: &AppState,
    project_id: &str,
    user_id: &str,
) -> ApiResult<Project> {
    let project = Project::find_by_id(&state.db, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    if project.owner_id != user_id {
        return Err(ApiError::Forbidden(
            "Only the project owner can do this".to_string(),
        ));
    }
    Ok(project)
}
