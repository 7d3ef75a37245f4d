use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::project::validate_title;

pub const DEFAULT_CHAT_TITLE: &str = "New chat";
pub const MESSAGE_MAX_LEN: usize = 16_000;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Chat {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessageRecord {
    pub id: String,
    pub chat_id: String,
    pub role: String, // system | user | assistant
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    /// When false the reply is parsed for actions but nothing is written.
    #[serde(default)]
    pub execute_actions: Option<bool>,
}

impl CreateChatRequest {
    pub fn validate(&self) -> Result<(), String> {
        match &self.title {
            Some(t) => validate_title(t),
            None => Ok(()),
        }
    }
}

impl SendMessageRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.content.trim().is_empty() {
            return Err("Message content is required".to_string());
        }
        if self.content.chars().count() > MESSAGE_MAX_LEN {
            return Err(format!(
                "Message content must be at most {} characters",
                MESSAGE_MAX_LEN
            ));
        }
        Ok(())
    }
}

impl Chat {
    pub async fn create(
        pool: &sqlx::MySqlPool,
        user_id: &str,
        title: Option<String>,
    ) -> Result<Chat, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_CHAT_TITLE.to_string());

        sqlx::query(
            r#"INSERT INTO chats (id, user_id, title, created_at, updated_at) VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&title)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(Chat {
            id,
            user_id: user_id.to_string(),
            title,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(pool: &sqlx::MySqlPool, id: &str) -> Result<Option<Chat>, sqlx::Error> {
        sqlx::query_as::<_, Chat>(
            r#"SELECT id, user_id, title, created_at, updated_at FROM chats WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_user(
        pool: &sqlx::MySqlPool,
        user_id: &str,
    ) -> Result<Vec<Chat>, sqlx::Error> {
        sqlx::query_as::<_, Chat>(
            r#"
            SELECT id, user_id, title, created_at, updated_at
            FROM chats
            WHERE user_id = ?
            ORDER BY updated_at DESC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn delete_by_id(pool: &sqlx::MySqlPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn touch(pool: &sqlx::MySqlPool, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE chats SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

impl ChatMessageRecord {
    pub async fn append(
        pool: &sqlx::MySqlPool,
        chat_id: &str,
        role: &str,
        content: &str,
    ) -> Result<ChatMessageRecord, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"INSERT INTO chat_messages (id, chat_id, role, content, created_at) VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(chat_id)
        .bind(role)
        .bind(content)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(ChatMessageRecord {
            id,
            chat_id: chat_id.to_string(),
            role: role.to_string(),
            content: content.to_string(),
            created_at: now,
        })
    }

    pub async fn find_by_chat(
        pool: &sqlx::MySqlPool,
        chat_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ChatMessageRecord>, sqlx::Error> {
        let limit = limit.unwrap_or(200).min(1000);
        // Newest `limit` rows, returned oldest first
        let mut rows = sqlx::query_as::<_, ChatMessageRecord>(
            r#"
            SELECT id, chat_id, role, content, created_at
            FROM chat_messages
            WHERE chat_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(chat_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        rows.reverse();
        Ok(rows)
    }
}
