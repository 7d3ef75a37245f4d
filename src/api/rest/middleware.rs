use crate::api::rest::error::ApiError;
use crate::shared::models::{AppState, User};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::info;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Skip auth for public endpoints
    if request.uri().path() == "/api/version" {
        return Ok(next.run(request).await);
    }

    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::Unauthorized)?
        .to_string();

    let user = User::find_by_id(&state.db, &user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    info!(
        method = %request.method(),
        path = %request.uri().path(),
        user_id = %user.id,
        "API request"
    );

    request.extensions_mut().insert(AuthContext { user });

    Ok(next.run(request).await)
}
