use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use super::{ActionKind, ActionResult, AiAction};
use crate::shared::models::constants::{
    canonical_value, PRIORITIES, PRIORITY_MEDIUM, PROJECT_STATUSES, TASK_STATUSES,
};
use crate::shared::models::{DatabaseError, NewProject, NewTask};
use crate::shared::workspace::WorkspaceStore;

/// Turns a recognised action into at most one write. Never returns an
/// error: every failure is folded into an `ActionResult`.
#[derive(Clone)]
pub struct ActionExecutor {
    store: Arc<dyn WorkspaceStore>,
}

/// Internal failure carrying the user-facing message and the detail.
struct Failure {
    message: String,
    error: String,
}

impl Failure {
    fn new(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: error.into(),
        }
    }
}

impl From<DatabaseError> for Failure {
    fn from(e: DatabaseError) -> Self {
        Failure::new("Could not save changes", e.to_string())
    }
}

type Outcome = Result<ActionResult, Failure>;

fn priority_or_default(raw: Option<&str>) -> String {
    raw.and_then(|p| canonical_value(p, &PRIORITIES))
        .unwrap_or(PRIORITY_MEDIUM)
        .to_string()
}

fn required_title(action: &AiAction) -> Result<String, Failure> {
    action
        .data
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Failure::new("The action has no title", "missing title"))
}

impl ActionExecutor {
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self { store }
    }

    pub async fn execute_action(&self, action: &AiAction, user_id: &str) -> ActionResult {
        let outcome = match action.kind {
            ActionKind::CreateProject => self.create_project(action, user_id).await,
            ActionKind::CreateTask => self.create_task(action, user_id).await,
            ActionKind::UpdateProject => self.update_project(action, user_id).await,
            ActionKind::UpdateTask => self.update_task(action, user_id).await,
            ActionKind::Unknown => Err(Failure::new(
                "Unknown action type",
                "the assistant reply did not map to a supported action",
            )),
        };

        match outcome {
            Ok(result) => {
                info!(user_id = %user_id, action = ?action.kind, "{}", result.message);
                result
            }
            Err(f) => {
                warn!(user_id = %user_id, action = ?action.kind, error = %f.error, "{}", f.message);
                ActionResult::failed(f.message, f.error)
            }
        }
    }

    async fn create_project(&self, action: &AiAction, user_id: &str) -> Outcome {
        let title = required_title(action)?;

        if self.store.find_owned_project(user_id, &title).await?.is_some() {
            return Err(Failure::new(
                format!("Project '{}' already exists", title),
                "duplicate project title",
            ));
        }

        let project = self
            .store
            .insert_project(NewProject {
                owner_id: user_id.to_string(),
                title,
                description: action.data.description.clone(),
                priority: priority_or_default(action.data.priority.as_deref()),
                due_date: action.data.due_date,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent insert of the same title
                DatabaseError::Unique(_) => Failure::new(
                    "Project with this title already exists",
                    "duplicate project title",
                ),
                other => other.into(),
            })?;

        Ok(ActionResult::ok(
            format!("Project '{}' created", project.title),
            json!({ "project": project }),
        ))
    }

    async fn create_task(&self, action: &AiAction, user_id: &str) -> Outcome {
        let title = required_title(action)?;

        let project = match action.data.project_title.as_deref() {
            Some(project_title) => self
                .store
                .find_accessible_project(user_id, project_title)
                .await?
                .ok_or_else(|| {
                    Failure::new(
                        format!("Project '{}' not found", project_title),
                        "no accessible project with that title",
                    )
                })?,
            None => self
                .store
                .first_accessible_project(user_id)
                .await?
                .ok_or_else(|| {
                    Failure::new(
                        "Create a project first: you have no projects to add the task to",
                        "user belongs to no projects",
                    )
                })?,
        };

        let task = self
            .store
            .insert_task(NewTask {
                project_id: project.id.clone(),
                creator_id: user_id.to_string(),
                assignee_id: None,
                title,
                description: action.data.description.clone(),
                priority: priority_or_default(action.data.priority.as_deref()),
                due_date: action.data.due_date,
            })
            .await?;

        Ok(ActionResult::ok(
            format!("Task '{}' added to project '{}'", task.title, project.title),
            json!({ "task": task, "project_id": project.id }),
        ))
    }

    async fn update_task(&self, action: &AiAction, user_id: &str) -> Outcome {
        let title = required_title(action)?;
        let status = action
            .data
            .status
            .as_deref()
            .and_then(|s| canonical_value(s, &TASK_STATUSES))
            .ok_or_else(|| Failure::new("The action has no valid task status", "missing status"))?;

        let scope = match action.data.project_title.as_deref() {
            Some(project_title) => Some(
                self.store
                    .find_accessible_project(user_id, project_title)
                    .await?
                    .ok_or_else(|| {
                        Failure::new(
                            format!("Project '{}' not found", project_title),
                            "no accessible project with that title",
                        )
                    })?
                    .id,
            ),
            None => None,
        };

        let task = self
            .store
            .find_accessible_task(user_id, &title, scope.as_deref())
            .await?
            .ok_or_else(|| {
                Failure::new(
                    format!("Task '{}' not found", title),
                    "no accessible task with that title",
                )
            })?;

        if !self.store.set_task_status(&task.id, status).await? {
            return Err(Failure::new(
                format!("Task '{}' could not be updated", title),
                "task disappeared before update",
            ));
        }

        Ok(ActionResult::ok(
            format!("Task '{}' moved to {}", task.title, status),
            json!({ "task_id": task.id, "status": status }),
        ))
    }

    async fn update_project(&self, action: &AiAction, user_id: &str) -> Outcome {
        let title = required_title(action)?;
        let status = action
            .data
            .status
            .as_deref()
            .and_then(|s| canonical_value(s, &PROJECT_STATUSES))
            .ok_or_else(|| {
                Failure::new("The action has no valid project status", "missing status")
            })?;

        let project = self
            .store
            .find_accessible_project(user_id, &title)
            .await?
            .ok_or_else(|| {
                Failure::new(
                    format!("Project '{}' not found", title),
                    "no accessible project with that title",
                )
            })?;

        if !self.store.set_project_status(&project.id, status).await? {
            return Err(Failure::new(
                format!("Project '{}' could not be updated", title),
                "project disappeared before update",
            ));
        }

        Ok(ActionResult::ok(
            format!("Project '{}' moved to {}", project.title, status),
            json!({ "project_id": project.id, "status": status }),
        ))
    }
}
