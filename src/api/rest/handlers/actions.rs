use axum::{
    extract::{Extension, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::extract::ApiJson;
use crate::api::rest::middleware::AuthContext;
use crate::assistant::actions::{parse_action_from_response, ActionExecutor, ActionResult, AiAction};
use crate::shared::models::AppState;
use crate::shared::workspace::MySqlWorkspace;

#[derive(Debug, Deserialize)]
pub struct ActionTextRequest {
    pub text: String,
}

impl ActionTextRequest {
    fn validate(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("text is required".to_string());
        }
        Ok(())
    }
}

pub async fn parse_action(
    Extension(_auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<ActionTextRequest>,
) -> ApiResult<Json<Option<AiAction>>> {
    req.validate().map_err(ApiError::BadRequest)?;
    Ok(Json(parse_action_from_response(&req.text)))
}

pub async fn execute_action(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<ActionTextRequest>,
) -> ApiResult<Json<ActionResult>> {
    req.validate().map_err(ApiError::BadRequest)?;

    let Some(action) = parse_action_from_response(&req.text) else {
        return Ok(Json(ActionResult::failed(
            "No action recognised in the text",
            "no confirmation phrase matched",
        )));
    };

    let executor = ActionExecutor::new(Arc::new(MySqlWorkspace::new(state.db.clone())));
    Ok(Json(executor.execute_action(&action, auth.user_id()).await))
}
