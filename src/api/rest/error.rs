use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::error;

use crate::assistant::chat::ChatTurnError;
use crate::assistant::ProviderError;
use crate::shared::models::DatabaseError;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Database(DatabaseError),
    Provider(ProviderError),
    Internal(anyhow::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Database(DatabaseError::Unique(msg)) => (
                StatusCode::CONFLICT,
                format!("Already exists: {}", msg),
            ),
            ApiError::Database(e) => {
                error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Database error: {}", e),
                )
            }
            ApiError::Provider(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            ApiError::Internal(e) => {
                error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Internal error: {}", e),
                )
            }
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        ApiError::Database(e)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Database(e.into())
    }
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        ApiError::Provider(e)
    }
}

impl From<ChatTurnError> for ApiError {
    fn from(e: ChatTurnError) -> Self {
        match e {
            ChatTurnError::Store(e) => ApiError::Database(e),
            ChatTurnError::Provider(e) => ApiError::Provider(e),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ProviderKind;

    #[test]
    fn status_codes_follow_error_category() {
        let cases = [
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                ApiError::Database(DatabaseError::Unique("dup".into())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Provider(ProviderError::MissingApiKey(ProviderKind::OpenAi)),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn failed_chat_turn_maps_to_gateway_error() {
        let err = ApiError::from(ChatTurnError::Provider(ProviderError::Disabled));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);

        let err = ApiError::from(ChatTurnError::Store(DatabaseError::Internal("gone".into())));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
