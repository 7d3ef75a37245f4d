use chrono::{DateTime, Utc};
use tracing::warn;

use super::types::{ChatMessage, ChatRole};
use crate::shared::models::{ChatMessageRecord, Project};

const MAX_LISTED_PROJECTS: usize = 30;

/// System prompt for chat turns. The confirmation phrases listed here are the
/// ones the action parser recognises, so keep both in step.
pub fn build_system_prompt(
    override_prompt: Option<&str>,
    projects: &[Project],
    now: DateTime<Utc>,
) -> String {
    let mut prompt = String::new();

    match override_prompt.map(str::trim).filter(|p| !p.is_empty()) {
        Some(custom) => {
            prompt.push_str(custom);
            prompt.push_str("\n\n");
        }
        None => {
            prompt.push_str(
                "Ты ProjectMind, ассистент по управлению проектами и задачами. \
Отвечай по-русски, кратко и по делу.\n",
            );
            prompt.push_str(&format!("Текущее время (UTC): {}\n\n", now.to_rfc3339()));
        }
    }

    prompt.push_str("Когда пользователь просит что-то создать или изменить, подтверди действие одной из фраз:\n");
    prompt.push_str("- Проект «Название» создан.\n");
    prompt.push_str("- Задача «Название» добавлена в проект «Проект».\n");
    prompt.push_str("- Задача «Название» выполнена. / переведена в работу. / отправлена на проверку.\n");
    prompt.push_str("- Проект «Название» завершён. / приостановлен. / архивирован. / возобновлён.\n");
    prompt.push_str("Название всегда бери в кавычки «». Приоритет указывай словами (низкий, средний, высокий, срочный), \
срок словами (завтра, через 3 дня, в пятницу) или датой ДД.ММ.ГГГГ, описание после слова «описание:».\n\n");

    if projects.is_empty() {
        prompt.push_str("У пользователя пока нет проектов.\n");
    } else {
        prompt.push_str("Проекты пользователя:\n");
        for project in projects.iter().take(MAX_LISTED_PROJECTS) {
            prompt.push_str(&format!("- «{}» ({})\n", project.title, project.status));
        }
        if projects.len() > MAX_LISTED_PROJECTS {
            prompt.push_str(&format!(
                "…и ещё {}\n",
                projects.len() - MAX_LISTED_PROJECTS
            ));
        }
    }

    prompt
}

/// `[system] + history`, dropping stored rows with an unrecognised role.
pub fn build_conversation(system_prompt: String, history: &[ChatMessageRecord]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(system_prompt));
    for record in history {
        match record.role.parse::<ChatRole>() {
            Ok(role) => messages.push(ChatMessage {
                role,
                content: record.content.clone(),
            }),
            Err(e) => warn!(message_id = %record.id, "Skipping history row: {}", e),
        }
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::actions::{parse_action_from_response, ActionKind};
    use chrono::TimeZone;

    fn project(title: &str) -> Project {
        let now = Utc::now();
        Project {
            id: format!("id-{title}"),
            owner_id: "u1".into(),
            title: title.into(),
            description: None,
            status: "ACTIVE".into(),
            priority: "MEDIUM".into(),
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    #[test]
    fn lists_projects_and_time() {
        let prompt = build_system_prompt(None, &[project("Сайт"), project("CRM")], now());
        assert!(prompt.contains("- «Сайт» (ACTIVE)"));
        assert!(prompt.contains("- «CRM» (ACTIVE)"));
        assert!(prompt.contains("2026-10-16T09:00:00+00:00"));
    }

    #[test]
    fn override_replaces_preamble_but_keeps_phrases() {
        let prompt = build_system_prompt(Some("Custom persona."), &[], now());
        assert!(prompt.starts_with("Custom persona."));
        assert!(!prompt.contains("Ты ProjectMind"));
        assert!(prompt.contains("Проект «Название» создан."));
        assert!(prompt.contains("нет проектов"));
    }

    #[test]
    fn advertised_phrases_are_recognised() {
        let prompt = build_system_prompt(None, &[], now());
        let create_line = prompt
            .lines()
            .find(|l| l.contains("создан."))
            .unwrap();
        let action = parse_action_from_response(create_line).unwrap();
        assert_eq!(action.kind, ActionKind::CreateProject);
    }

    #[test]
    fn conversation_starts_with_system_and_skips_bad_roles() {
        let record = |role: &str, content: &str| ChatMessageRecord {
            id: format!("m-{content}"),
            chat_id: "c1".into(),
            role: role.into(),
            content: content.into(),
            created_at: Utc::now(),
        };
        let history = vec![
            record("user", "Привет"),
            record("tool", "ignored"),
            record("assistant", "Здравствуйте"),
        ];

        let messages = build_conversation("sys".into(), &history);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], ChatMessage::system("sys"));
        assert_eq!(messages[1], ChatMessage::user("Привет"));
        assert_eq!(messages[2], ChatMessage::assistant("Здравствуйте"));
    }
}
