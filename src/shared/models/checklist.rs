use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const CHECKLIST_TEXT_MAX_LEN: usize = 1024;
/// Highest position a client may set; appends stay well inside `i32`.
pub const CHECKLIST_POSITION_MAX: i32 = 1_000_000;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChecklistItem {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub completed: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChecklistItemRequest {
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateChecklistItemRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub position: Option<i32>,
}

fn validate_text(text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        return Err("Checklist text is required".to_string());
    }
    if text.chars().count() > CHECKLIST_TEXT_MAX_LEN {
        return Err(format!(
            "Checklist text must be at most {} characters",
            CHECKLIST_TEXT_MAX_LEN
        ));
    }
    Ok(())
}

impl CreateChecklistItemRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_text(&self.text)
    }
}

impl UpdateChecklistItemRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(t) = &self.text {
            validate_text(t)?;
        }
        if let Some(p) = self.position {
            if !(0..=CHECKLIST_POSITION_MAX).contains(&p) {
                return Err(format!(
                    "position must be between 0 and {}",
                    CHECKLIST_POSITION_MAX
                ));
            }
        }
        Ok(())
    }
}

fn position_after(last: Option<i32>) -> i32 {
    last.map(|p| p.saturating_add(1)).unwrap_or(0)
}

impl ChecklistItem {
    /// Appends a new item after the user's current last position.
    pub async fn create(
        pool: &sqlx::MySqlPool,
        user_id: &str,
        text: &str,
    ) -> Result<ChecklistItem, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let last_position = sqlx::query_scalar::<_, Option<i32>>(
            "SELECT MAX(position) FROM checklist_items WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        let next_position = position_after(last_position);

        sqlx::query(
            r#"
            INSERT INTO checklist_items (id, user_id, text, completed, position, created_at, updated_at)
            VALUES (?, ?, ?, FALSE, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(text.trim())
        .bind(next_position)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(ChecklistItem {
            id,
            user_id: user_id.to_string(),
            text: text.trim().to_string(),
            completed: false,
            position: next_position,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_user(
        pool: &sqlx::MySqlPool,
        user_id: &str,
    ) -> Result<Vec<ChecklistItem>, sqlx::Error> {
        sqlx::query_as::<_, ChecklistItem>(
            r#"
            SELECT id, user_id, text, completed, position, created_at, updated_at
            FROM checklist_items
            WHERE user_id = ?
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(
        pool: &sqlx::MySqlPool,
        id: &str,
    ) -> Result<Option<ChecklistItem>, sqlx::Error> {
        sqlx::query_as::<_, ChecklistItem>(
            r#"
            SELECT id, user_id, text, completed, position, created_at, updated_at
            FROM checklist_items
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_by_id(
        pool: &sqlx::MySqlPool,
        id: &str,
        req: UpdateChecklistItemRequest,
    ) -> Result<ChecklistItem, sqlx::Error> {
        let mut item = Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        if let Some(t) = req.text {
            item.text = t.trim().to_string();
        }
        if let Some(c) = req.completed {
            item.completed = c;
        }
        if let Some(p) = req.position {
            item.position = p;
        }

        let now = Utc::now();
        sqlx::query(
            r#"UPDATE checklist_items SET text = ?, completed = ?, position = ?, updated_at = ? WHERE id = ?"#,
        )
        .bind(&item.text)
        .bind(item.completed)
        .bind(item.position)
        .bind(now)
        .bind(&item.id)
        .execute(pool)
        .await?;
        item.updated_at = now;
        Ok(item)
    }

    pub async fn delete_by_id(pool: &sqlx::MySqlPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM checklist_items WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
