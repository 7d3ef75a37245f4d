use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::extract::ApiJson;
use crate::api::rest::middleware::AuthContext;
use crate::assistant::actions::{ActionResult, AiAction};
use crate::assistant::chat::ChatAssistant;
use crate::assistant::{ChatRole, ProviderFactory, TokenUsage};
use crate::shared::models::{
    AiSettings, AppState, Chat, ChatMessageRecord, CreateChatRequest, SendMessageRequest,
};
use crate::shared::workspace::MySqlWorkspace;

/// History sent to the provider is capped to the most recent rows.
const CONTEXT_MESSAGES: i64 = 40;

#[derive(Debug, Deserialize)]
pub struct MessageListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub user_message: ChatMessageRecord,
    pub assistant_message: ChatMessageRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    pub action: Option<AiAction>,
    pub action_result: Option<ActionResult>,
}

async fn load_own_chat(state: &AppState, id: &str, user_id: &str) -> ApiResult<Chat> {
    let chat = Chat::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chat not found".to_string()))?;
    if chat.user_id != user_id {
        return Err(ApiError::Forbidden("Chat belongs to another user".to_string()));
    }
    Ok(chat)
}

pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Chat>>> {
    Ok(Json(Chat::find_by_user(&state.db, auth.user_id()).await?))
}

pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateChatRequest>,
) -> ApiResult<(StatusCode, Json<Chat>)> {
    req.validate().map_err(ApiError::BadRequest)?;
    let chat = Chat::create(&state.db, auth.user_id(), req.title).await?;
    Ok((StatusCode::CREATED, Json(chat)))
}

pub async fn delete_chat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    let chat = load_own_chat(&state, &id, auth.user_id()).await?;
    Chat::delete_by_id(&state.db, &chat.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<MessageListQuery>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ChatMessageRecord>>> {
    let chat = load_own_chat(&state, &id, auth.user_id()).await?;
    Ok(Json(
        ChatMessageRecord::find_by_chat(&state.db, &chat.id, query.limit).await?,
    ))
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> ApiResult<Json<SendMessageResponse>> {
    req.validate().map_err(ApiError::BadRequest)?;
    let chat = load_own_chat(&state, &id, auth.user_id()).await?;
    let user_id = auth.user_id();

    // Stored before dispatch; history is append-only even if the provider fails
    let user_message =
        ChatMessageRecord::append(&state.db, &chat.id, ChatRole::User.as_str(), req.content.trim())
            .await?;

    let settings = AiSettings::load_or_default(&state.db, user_id).await?;
    let history =
        ChatMessageRecord::find_by_chat(&state.db, &chat.id, Some(CONTEXT_MESSAGES)).await?;

    let assistant = ChatAssistant::new(
        ProviderFactory::from_state(&state),
        Arc::new(MySqlWorkspace::new(state.db.clone())),
        state.config.system_prompt_override.clone(),
    );
    let turn = assistant
        .respond(user_id, &settings, &history, req.execute_actions.unwrap_or(true))
        .await
        .map_err(|e| {
            warn!(user_id = %user_id, chat_id = %chat.id, provider = %settings.provider, "Chat turn failed: {}", e);
            ApiError::from(e)
        })?;

    let assistant_message = ChatMessageRecord::append(
        &state.db,
        &chat.id,
        ChatRole::Assistant.as_str(),
        &turn.completion.content,
    )
    .await?;
    Chat::touch(&state.db, &chat.id).await?;

    info!(
        user_id = %user_id,
        chat_id = %chat.id,
        action = ?turn.action.as_ref().map(|a| a.kind),
        action_success = ?turn.action_result.as_ref().map(|r| r.success),
        "Chat turn completed"
    );

    Ok(Json(SendMessageResponse {
        user_message,
        assistant_message,
        model: turn.completion.model,
        usage: turn.completion.usage,
        action: turn.action,
        action_result: turn.action_result,
    }))
}
