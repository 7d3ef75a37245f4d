use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub async fn find_by_id(pool: &sqlx::MySqlPool, id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(r#"SELECT id, name, email, created_at FROM users WHERE id = ?"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
