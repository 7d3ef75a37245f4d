use async_trait::async_trait;
use std::sync::Arc;

use crate::shared::models::{DatabaseError, NewProject, NewTask, Project, Task};

/// The slice of persistence the assistant's action executor writes through.
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    async fn find_owned_project(
        &self,
        owner_id: &str,
        title: &str,
    ) -> Result<Option<Project>, DatabaseError>;

    async fn find_accessible_project(
        &self,
        user_id: &str,
        title: &str,
    ) -> Result<Option<Project>, DatabaseError>;

    /// Any project the user belongs to, most recently updated first.
    async fn first_accessible_project(&self, user_id: &str)
        -> Result<Option<Project>, DatabaseError>;

    async fn list_accessible_projects(&self, user_id: &str) -> Result<Vec<Project>, DatabaseError>;

    async fn insert_project(&self, project: NewProject) -> Result<Project, DatabaseError>;

    async fn insert_task(&self, task: NewTask) -> Result<Task, DatabaseError>;

    async fn find_accessible_task(
        &self,
        user_id: &str,
        title: &str,
        project_id: Option<&str>,
    ) -> Result<Option<Task>, DatabaseError>;

    async fn set_task_status(&self, task_id: &str, status: &str) -> Result<bool, DatabaseError>;

    async fn set_project_status(
        &self,
        project_id: &str,
        status: &str,
    ) -> Result<bool, DatabaseError>;
}

#[derive(Clone)]
pub struct MySqlWorkspace {
    db: Arc<sqlx::MySqlPool>,
}

impl MySqlWorkspace {
    pub fn new(db: Arc<sqlx::MySqlPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WorkspaceStore for MySqlWorkspace {
    async fn find_owned_project(
        &self,
        owner_id: &str,
        title: &str,
    ) -> Result<Option<Project>, DatabaseError> {
        Ok(Project::find_owned_by_title(&self.db, owner_id, title).await?)
    }

    async fn find_accessible_project(
        &self,
        user_id: &str,
        title: &str,
    ) -> Result<Option<Project>, DatabaseError> {
        Ok(Project::find_accessible_by_title(&self.db, user_id, title).await?)
    }

    async fn first_accessible_project(
        &self,
        user_id: &str,
    ) -> Result<Option<Project>, DatabaseError> {
        Ok(Project::find_accessible(&self.db, user_id)
            .await?
            .into_iter()
            .next())
    }

    async fn list_accessible_projects(&self, user_id: &str) -> Result<Vec<Project>, DatabaseError> {
        Ok(Project::find_accessible(&self.db, user_id).await?)
    }

    async fn insert_project(&self, project: NewProject) -> Result<Project, DatabaseError> {
        Ok(Project::create(&self.db, project).await?)
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, DatabaseError> {
        Ok(Task::create(&self.db, task).await?)
    }

    async fn find_accessible_task(
        &self,
        user_id: &str,
        title: &str,
        project_id: Option<&str>,
    ) -> Result<Option<Task>, DatabaseError> {
        Ok(Task::find_accessible_by_title(&self.db, user_id, title, project_id).await?)
    }

    async fn set_task_status(&self, task_id: &str, status: &str) -> Result<bool, DatabaseError> {
        Ok(Task::update_status(&self.db, task_id, status).await?)
    }

    async fn set_project_status(
        &self,
        project_id: &str,
        status: &str,
    ) -> Result<bool, DatabaseError> {
        Ok(Project::update_status(&self.db, project_id, status).await?)
    }
}
