use axum::{
    body::Bytes,
    extract::{Extension, State},
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::extract::ApiJson;
use crate::api::rest::middleware::AuthContext;
use crate::assistant::{ConnectionTestResult, ProviderFactory};
use crate::shared::models::{AiSettings, AiSettingsView, AppState, UpdateAiSettingsRequest};

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AiSettingsView>> {
    let settings = AiSettings::load_or_default(&state.db, auth.user_id()).await?;
    Ok(Json(settings.view()))
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<UpdateAiSettingsRequest>,
) -> ApiResult<Json<AiSettingsView>> {
    req.validate().map_err(ApiError::BadRequest)?;

    let current = AiSettings::load_or_default(&state.db, auth.user_id()).await?;
    let updated = req.apply(current);
    updated.upsert(&state.db).await?;

    info!(
        user_id = %auth.user_id(),
        provider = %updated.provider,
        enabled = updated.enabled,
        "AI settings updated"
    );
    Ok(Json(updated.view()))
}

/// Checks the provider. An optional body overrides the stored settings for
/// this call only; nothing is saved.
pub async fn test_connection(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    body: Bytes,
) -> ApiResult<Json<ConnectionTestResult>> {
    let stored = AiSettings::load_or_default(&state.db, auth.user_id()).await?;

    let settings = if body.iter().all(u8::is_ascii_whitespace) {
        stored
    } else {
        let overrides: UpdateAiSettingsRequest = serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid settings body: {}", e)))?;
        overrides.validate().map_err(ApiError::BadRequest)?;
        overrides.apply(stored)
    };

    let result = ProviderFactory::from_state(&state)
        .test_connection(&settings)
        .await;
    info!(
        user_id = %auth.user_id(),
        provider = %settings.provider,
        success = result.success,
        latency_ms = %result.latency_ms,
        "Provider connection test"
    );
    Ok(Json(result))
}
