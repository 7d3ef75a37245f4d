use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::constants::{
    canonical_value, PRIORITIES, PRIORITY_MEDIUM, TASK_STATUSES, TASK_STATUS_TODO,
};
use super::project::validate_title;

const TASK_COLUMNS: &str = "t.id, t.project_id, t.creator_id, t.assignee_id, t.title, t.description, t.status, t.priority, t.due_date, t.created_at, t.updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub creator_id: String,
    pub assignee_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: String, // TODO | IN_PROGRESS | REVIEW | DONE
    pub priority: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub project_id: String,
    pub creator_id: String,
    pub assignee_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl CreateTaskRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_title(&self.title)?;
        if let Some(p) = &self.priority {
            canonical_value(p, &PRIORITIES).ok_or_else(|| format!("Invalid priority '{}'", p))?;
        }
        Ok(())
    }

    pub fn into_new_task(self, project_id: &str, creator_id: &str) -> NewTask {
        let priority = self
            .priority
            .as_deref()
            .and_then(|p| canonical_value(p, &PRIORITIES))
            .unwrap_or(PRIORITY_MEDIUM);
        NewTask {
            project_id: project_id.to_string(),
            creator_id: creator_id.to_string(),
            assignee_id: self.assignee_id.filter(|a| !a.trim().is_empty()),
            title: self.title.trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            priority: priority.to_string(),
            due_date: self.due_date,
        }
    }
}

impl UpdateTaskRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(t) = &self.title {
            validate_title(t)?;
        }
        if let Some(s) = &self.status {
            canonical_value(s, &TASK_STATUSES).ok_or_else(|| format!("Invalid status '{}'", s))?;
        }
        if let Some(p) = &self.priority {
            canonical_value(p, &PRIORITIES).ok_or_else(|| format!("Invalid priority '{}'", p))?;
        }
        Ok(())
    }
}

impl Task {
    pub async fn create(pool: &sqlx::MySqlPool, new: NewTask) -> Result<Task, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let status = TASK_STATUS_TODO.to_string();

        sqlx::query(
            r#"
            INSERT INTO tasks (id, project_id, creator_id, assignee_id, title, description, status, priority, due_date, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.project_id)
        .bind(&new.creator_id)
        .bind(&new.assignee_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&status)
        .bind(&new.priority)
        .bind(new.due_date)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(Task {
            id,
            project_id: new.project_id,
            creator_id: new.creator_id,
            assignee_id: new.assignee_id,
            title: new.title,
            description: new.description,
            status,
            priority: new.priority,
            due_date: new.due_date,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(pool: &sqlx::MySqlPool, id: &str) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {} FROM tasks t WHERE t.id = ?", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_project(
        pool: &sqlx::MySqlPool,
        project_id: &str,
        status: Option<&str>,
    ) -> Result<Vec<Task>, sqlx::Error> {
        match status {
            Some(s) => {
                sqlx::query_as::<_, Task>(&format!(
                    "SELECT {} FROM tasks t WHERE t.project_id = ? AND t.status = ? ORDER BY t.created_at ASC, t.id ASC",
                    TASK_COLUMNS
                ))
                .bind(project_id)
                .bind(s)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Task>(&format!(
                    "SELECT {} FROM tasks t WHERE t.project_id = ? ORDER BY t.created_at ASC, t.id ASC",
                    TASK_COLUMNS
                ))
                .bind(project_id)
                .fetch_all(pool)
                .await
            }
        }
    }

    /// Looks a task up by exact title among every project the user belongs to,
    /// optionally narrowed to one project.
    pub async fn find_accessible_by_title(
        pool: &sqlx::MySqlPool,
        user_id: &str,
        title: &str,
        project_id: Option<&str>,
    ) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {} FROM tasks t
            JOIN projects p ON p.id = t.project_id
            WHERE t.title = ?
              AND (? IS NULL OR t.project_id = ?)
              AND (p.owner_id = ?
                   OR EXISTS (SELECT 1 FROM project_members m WHERE m.project_id = p.id AND m.user_id = ?))
            ORDER BY t.updated_at DESC
            LIMIT 1
            "#,
            TASK_COLUMNS
        ))
        .bind(title)
        .bind(project_id)
        .bind(project_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_by_id(
        pool: &sqlx::MySqlPool,
        id: &str,
        req: UpdateTaskRequest,
    ) -> Result<Task, sqlx::Error> {
        let mut task = Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        if let Some(t) = req.title {
            task.title = t.trim().to_string();
        }
        if let Some(d) = req.description {
            task.description = Some(d).filter(|d| !d.trim().is_empty());
        }
        if let Some(s) = req.status.as_deref().and_then(|s| canonical_value(s, &TASK_STATUSES)) {
            task.status = s.to_string();
        }
        if let Some(p) = req.priority.as_deref().and_then(|p| canonical_value(p, &PRIORITIES)) {
            task.priority = p.to_string();
        }
        if let Some(a) = req.assignee_id {
            task.assignee_id = Some(a).filter(|a| !a.trim().is_empty());
        }
        if req.due_date.is_some() {
            task.due_date = req.due_date;
        }

        let now = Utc::now();
        sqlx::query(
            r#"UPDATE tasks SET title=?, description=?, status=?, priority=?, assignee_id=?, due_date=?, updated_at=? WHERE id = ?"#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.status)
        .bind(&task.priority)
        .bind(&task.assignee_id)
        .bind(task.due_date)
        .bind(now)
        .bind(&task.id)
        .execute(pool)
        .await?;
        task.updated_at = now;
        Ok(task)
    }

    pub async fn update_status(
        pool: &sqlx::MySqlPool,
        id: &str,
        status: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?"#)
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_id(pool: &sqlx::MySqlPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != super::constants::TASK_STATUS_DONE
            && self.due_date.map(|d| d < now).unwrap_or(false)
    }
}
