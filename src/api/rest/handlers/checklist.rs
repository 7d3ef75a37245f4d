use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::extract::ApiJson;
use crate::api::rest::middleware::AuthContext;
use crate::shared::models::{
    AppState, ChecklistItem, CreateChecklistItemRequest, UpdateChecklistItemRequest,
};

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ChecklistItem>>> {
    Ok(Json(
        ChecklistItem::find_by_user(&state.db, auth.user_id()).await?,
    ))
}

pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateChecklistItemRequest>,
) -> ApiResult<(StatusCode, Json<ChecklistItem>)> {
    req.validate().map_err(ApiError::BadRequest)?;
    let item = ChecklistItem::create(&state.db, auth.user_id(), &req.text).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn load_own_item(state: &AppState, id: &str, user_id: &str) -> ApiResult<ChecklistItem> {
    let item = ChecklistItem::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Checklist item not found".to_string()))?;
    if item.user_id != user_id {
        return Err(ApiError::Forbidden(
            "Checklist item belongs to another user".to_string(),
        ));
    }
    Ok(item)
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<UpdateChecklistItemRequest>,
) -> ApiResult<Json<ChecklistItem>> {
    req.validate().map_err(ApiError::BadRequest)?;
    let item = load_own_item(&state, &id, auth.user_id()).await?;
    Ok(Json(
        ChecklistItem::update_by_id(&state.db, &item.id, req).await?,
    ))
}

pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    let item = load_own_item(&state, &id, auth.user_id()).await?;
    ChecklistItem::delete_by_id(&state.db, &item.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
