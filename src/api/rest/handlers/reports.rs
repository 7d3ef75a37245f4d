use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::require_project_member;
use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::extract::ApiJson;
use crate::api::rest::middleware::AuthContext;
use crate::assistant::reports::{generate_project_report, ProjectReport, ReportFacts};
use crate::assistant::ProviderFactory;
use crate::shared::models::{AiSettings, AppState, Task};

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub project_id: String,
}

pub async fn create_report(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<ReportRequest>,
) -> ApiResult<Json<ProjectReport>> {
    if req.project_id.trim().is_empty() {
        return Err(ApiError::BadRequest("project_id is required".to_string()));
    }
    let project = require_project_member(&state, req.project_id.trim(), auth.user_id()).await?;
    let tasks = Task::find_by_project(&state.db, &project.id, None).await?;
    let settings = AiSettings::load_or_default(&state.db, auth.user_id()).await?;

    let facts = ReportFacts::collect(&project, &tasks, Utc::now());
    let report = generate_project_report(
        &ProviderFactory::from_state(&state),
        &settings,
        &project.id,
        facts,
    )
    .await;

    info!(
        user_id = %auth.user_id(),
        project_id = %project.id,
        fallback = report.fallback,
        "Project report generated"
    );
    Ok(Json(report))
}
