use sqlx::{MySql, Pool};
use thiserror::Error;

use crate::shared::config::ProjectMindConfig;

pub mod chat;
pub mod checklist;
pub mod constants;
pub mod project;
pub mod settings;
pub mod task;
pub mod user;

pub use chat::{Chat, ChatMessageRecord, CreateChatRequest, SendMessageRequest};
pub use checklist::{ChecklistItem, CreateChecklistItemRequest, UpdateChecklistItemRequest};
pub use project::{
    AddMemberRequest, CreateProjectRequest, NewProject, Project, UpdateProjectRequest,
};
pub use settings::{AiSettings, AiSettingsView, ProviderKind, UpdateAiSettingsRequest};
pub use task::{CreateTaskRequest, NewTask, Task, UpdateTaskRequest};
pub use user::User;

// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(sqlx::Error),
    #[error("Unique constraint violation: {0}")]
    Unique(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        // MySQL reports duplicate keys as SQLSTATE 23000 / error 1062
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(code) = db_err.code() {
                if code == "23000" || code == "1062" {
                    return DatabaseError::Unique(db_err.message().to_string());
                }
            }
        }
        DatabaseError::Connection(err)
    }
}

// Application state
#[derive(Clone)]
pub struct AppState {
    pub db: std::sync::Arc<Pool<MySql>>,
    pub config: std::sync::Arc<ProjectMindConfig>,
    pub http: reqwest::Client,
}
