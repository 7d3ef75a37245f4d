use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::provider_factory::ProviderFactory;
use super::types::ChatMessage;
use crate::shared::models::constants::TASK_STATUSES;
use crate::shared::models::{AiSettings, Project, Task};

const MAX_LISTED_OVERDUE: usize = 10;

/// Snapshot of a project that both the prompt and the fallback are built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportFacts {
    pub project_title: String,
    pub project_status: String,
    pub due_date: Option<DateTime<Utc>>,
    pub total_tasks: usize,
    /// One entry per known task status, in workflow order.
    pub status_counts: Vec<(String, usize)>,
    pub overdue_tasks: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectReport {
    pub project_id: String,
    pub content: String,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub facts: ReportFacts,
}

impl ReportFacts {
    pub fn collect(project: &Project, tasks: &[Task], now: DateTime<Utc>) -> Self {
        let status_counts = TASK_STATUSES
            .iter()
            .map(|s| {
                (
                    s.to_string(),
                    tasks.iter().filter(|t| t.status == *s).count(),
                )
            })
            .collect();

        Self {
            project_title: project.title.clone(),
            project_status: project.status.clone(),
            due_date: project.due_date,
            total_tasks: tasks.len(),
            status_counts,
            overdue_tasks: tasks
                .iter()
                .filter(|t| t.is_overdue(now))
                .map(|t| t.title.clone())
                .collect(),
            generated_at: now,
        }
    }

    fn summary_lines(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Проект: «{}» ({})\n", self.project_title, self.project_status));
        match self.due_date {
            Some(due) => out.push_str(&format!("Срок проекта: {}\n", due.format("%d.%m.%Y"))),
            None => out.push_str("Срок проекта: не задан\n"),
        }
        out.push_str(&format!("Всего задач: {}\n", self.total_tasks));
        for (status, count) in &self.status_counts {
            out.push_str(&format!("- {}: {}\n", status, count));
        }
        if self.overdue_tasks.is_empty() {
            out.push_str("Просроченных задач нет\n");
        } else {
            out.push_str(&format!("Просрочено задач: {}\n", self.overdue_tasks.len()));
            for title in self.overdue_tasks.iter().take(MAX_LISTED_OVERDUE) {
                out.push_str(&format!("- «{}»\n", title));
            }
        }
        out
    }
}

pub fn build_report_prompt(facts: &ReportFacts) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "Ты ProjectMind, аналитик проектов. Составь краткий отчёт о состоянии проекта: \
прогресс, риски, просроченные задачи и рекомендации. Не выдумывай данные, которых нет в фактах.",
        ),
        ChatMessage::user(format!(
            "Факты на {}:\n{}",
            facts.generated_at.format("%d.%m.%Y"),
            facts.summary_lines()
        )),
    ]
}

/// Plain report used when the provider cannot be reached.
pub fn fallback_report(facts: &ReportFacts) -> String {
    let done = facts
        .status_counts
        .iter()
        .find(|(s, _)| s == "DONE")
        .map(|(_, c)| *c)
        .unwrap_or(0);
    let progress = if facts.total_tasks == 0 {
        0
    } else {
        done * 100 / facts.total_tasks
    };

    let mut out = format!("Отчёт по проекту «{}»\n\n", facts.project_title);
    out.push_str(&facts.summary_lines());
    out.push_str(&format!("Выполнено: {}%\n", progress));
    out.push_str("\nАвтоматический анализ недоступен, показана сводка по данным проекта.\n");
    out
}

/// Asks the user's provider for a report, degrading to the template on any error.
pub async fn generate_project_report(
    factory: &ProviderFactory,
    settings: &AiSettings,
    project_id: &str,
    facts: ReportFacts,
) -> ProjectReport {
    match factory
        .generate_completion(settings, &build_report_prompt(&facts))
        .await
    {
        Ok(resp) if !resp.content.trim().is_empty() => ProjectReport {
            project_id: project_id.to_string(),
            content: resp.content,
            fallback: false,
            error: None,
            facts,
        },
        outcome => {
            let error = match outcome {
                Err(e) => e.to_string(),
                Ok(_) => "provider returned an empty report".to_string(),
            };
            warn!(project_id = %project_id, "Report generation degraded: {}", error);
            ProjectReport {
                project_id: project_id.to_string(),
                content: fallback_report(&facts),
                fallback: true,
                error: Some(error),
                facts,
            }
        }
    }
}
