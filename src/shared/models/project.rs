use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::constants::{
    canonical_value, MEMBER_ROLE_ADMIN, MEMBER_ROLE_MEMBER, PRIORITIES, PRIORITY_MEDIUM,
    PROJECT_STATUSES, PROJECT_STATUS_ACTIVE, TITLE_MAX_LEN,
};

const PROJECT_COLUMNS: &str =
    "p.id, p.owner_id, p.title, p.description, p.status, p.priority, p.due_date, p.created_at, p.updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,   // ACTIVE | ON_HOLD | COMPLETED | ARCHIVED
    pub priority: String, // LOW | MEDIUM | HIGH | URGENT
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload shared by the REST handlers and the action executor.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: String,
    #[serde(default)]
    pub role: Option<String>,
}

pub(crate) fn validate_title(title: &str) -> Result<(), String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err("Title is required".to_string());
    }
    if trimmed.chars().count() > TITLE_MAX_LEN {
        return Err(format!("Title must be at most {} characters", TITLE_MAX_LEN));
    }
    Ok(())
}

impl CreateProjectRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_title(&self.title)?;
        if let Some(p) = &self.priority {
            canonical_value(p, &PRIORITIES).ok_or_else(|| format!("Invalid priority '{}'", p))?;
        }
        Ok(())
    }

    pub fn into_new_project(self, owner_id: &str) -> NewProject {
        let priority = self
            .priority
            .as_deref()
            .and_then(|p| canonical_value(p, &PRIORITIES))
            .unwrap_or(PRIORITY_MEDIUM);
        NewProject {
            owner_id: owner_id.to_string(),
            title: self.title.trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            priority: priority.to_string(),
            due_date: self.due_date,
        }
    }
}

impl UpdateProjectRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(t) = &self.title {
            validate_title(t)?;
        }
        if let Some(s) = &self.status {
            canonical_value(s, &PROJECT_STATUSES)
                .ok_or_else(|| format!("Invalid status '{}'", s))?;
        }
        if let Some(p) = &self.priority {
            canonical_value(p, &PRIORITIES).ok_or_else(|| format!("Invalid priority '{}'", p))?;
        }
        Ok(())
    }
}

impl AddMemberRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.user_id.trim().is_empty() {
            return Err("user_id is required".to_string());
        }
        if let Some(r) = &self.role {
            canonical_value(r, &[MEMBER_ROLE_MEMBER, MEMBER_ROLE_ADMIN])
                .ok_or_else(|| format!("Invalid role '{}'", r))?;
        }
        Ok(())
    }
}

impl Project {
    pub async fn create(pool: &sqlx::MySqlPool, new: NewProject) -> Result<Project, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let status = PROJECT_STATUS_ACTIVE.to_string();

        sqlx::query(
            r#"
            INSERT INTO projects (id, owner_id, title, description, status, priority, due_date, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.owner_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&status)
        .bind(&new.priority)
        .bind(new.due_date)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(Project {
            id,
            owner_id: new.owner_id,
            title: new.title,
            description: new.description,
            status,
            priority: new.priority,
            due_date: new.due_date,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(
        pool: &sqlx::MySqlPool,
        id: &str,
    ) -> Result<Option<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects p WHERE p.id = ?",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Projects the user owns or is a member of, most recently updated first.
    pub async fn find_accessible(
        pool: &sqlx::MySqlPool,
        user_id: &str,
    ) -> Result<Vec<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {} FROM projects p
            WHERE p.owner_id = ?
               OR EXISTS (SELECT 1 FROM project_members m WHERE m.project_id = p.id AND m.user_id = ?)
            ORDER BY p.updated_at DESC, p.id ASC
            "#,
            PROJECT_COLUMNS
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_accessible_by_title(
        pool: &sqlx::MySqlPool,
        user_id: &str,
        title: &str,
    ) -> Result<Option<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {} FROM projects p
            WHERE p.title = ?
              AND (p.owner_id = ?
                   OR EXISTS (SELECT 1 FROM project_members m WHERE m.project_id = p.id AND m.user_id = ?))
            ORDER BY p.updated_at DESC
            LIMIT 1
            "#,
            PROJECT_COLUMNS
        ))
        .bind(title)
        .bind(user_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_owned_by_title(
        pool: &sqlx::MySqlPool,
        owner_id: &str,
        title: &str,
    ) -> Result<Option<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects p WHERE p.owner_id = ? AND p.title = ? LIMIT 1",
            PROJECT_COLUMNS
        ))
        .bind(owner_id)
        .bind(title)
        .fetch_optional(pool)
        .await
    }

    pub async fn is_member(
        pool: &sqlx::MySqlPool,
        project_id: &str,
        user_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM projects p
            WHERE p.id = ?
              AND (p.owner_id = ?
                   OR EXISTS (SELECT 1 FROM project_members m WHERE m.project_id = p.id AND m.user_id = ?))
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn update_by_id(
        pool: &sqlx::MySqlPool,
        id: &str,
        req: UpdateProjectRequest,
    ) -> Result<Project, sqlx::Error> {
        let mut project = Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        if let Some(t) = req.title {
            project.title = t.trim().to_string();
        }
        if let Some(d) = req.description {
            project.description = Some(d).filter(|d| !d.trim().is_empty());
        }
        if let Some(s) = req.status.as_deref().and_then(|s| canonical_value(s, &PROJECT_STATUSES)) {
            project.status = s.to_string();
        }
        if let Some(p) = req.priority.as_deref().and_then(|p| canonical_value(p, &PRIORITIES)) {
            project.priority = p.to_string();
        }
        if req.due_date.is_some() {
            project.due_date = req.due_date;
        }

        let now = Utc::now();
        sqlx::query(
            r#"UPDATE projects SET title=?, description=?, status=?, priority=?, due_date=?, updated_at=? WHERE id = ?"#,
        )
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.status)
        .bind(&project.priority)
        .bind(project.due_date)
        .bind(now)
        .bind(&project.id)
        .execute(pool)
        .await?;
        project.updated_at = now;
        Ok(project)
    }

    pub async fn update_status(
        pool: &sqlx::MySqlPool,
        id: &str,
        status: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"UPDATE projects SET status = ?, updated_at = ? WHERE id = ?"#)
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_id(pool: &sqlx::MySqlPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn add_member(
        pool: &sqlx::MySqlPool,
        project_id: &str,
        user_id: &str,
        role: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE role = VALUES(role)
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .execute(pool)
        .await?;
        Ok(())
    }
}
