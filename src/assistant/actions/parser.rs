use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::extractors::{
    clean_title, compile, extract_deadline, extract_description, extract_priority,
    extract_project_hint, QUOTED,
};
use super::{ActionData, ActionKind, AiAction};
use crate::shared::models::constants::{
    PROJECT_STATUS_ACTIVE, PROJECT_STATUS_ARCHIVED, PROJECT_STATUS_COMPLETED,
    PROJECT_STATUS_ON_HOLD, TASK_STATUS_DONE, TASK_STATUS_IN_PROGRESS, TASK_STATUS_REVIEW,
};

/// Every recognised phrase is trusted equally; nothing grades the match.
pub const PARSED_ACTION_CONFIDENCE: f32 = 0.9;

struct ActionPattern {
    kind: ActionKind,
    regex: Regex,
    /// Target status for update patterns.
    status: Option<&'static str>,
}

fn pattern(kind: ActionKind, template: &str, status: Option<&'static str>) -> ActionPattern {
    // {Q} marks a quoted title, captured together with its quotes
    ActionPattern {
        kind,
        regex: compile(&format!("(?i){}", template.replace("{Q}", QUOTED))),
        status,
    }
}

// Order matters: the first pattern that matches decides the action.
static PATTERNS: Lazy<Vec<ActionPattern>> = Lazy::new(|| {
    use ActionKind::*;
    vec![
        pattern(CreateProject, r"\bпроект\s*{Q}\s*(?:был\s+|успешно\s+)*создан", None),
        pattern(CreateProject, r"\bсоздал[аи]?\s+(?:для\s+вас\s+)?(?:новый\s+)?проект\s*{Q}", None),
        pattern(CreateProject, r"\bсоздан\s+(?:новый\s+)?проект\s*{Q}", None),
        pattern(
            CreateProject,
            r#"\bпроект\s+(?:под|с)\s+названием\s*["«“„']?([^"«»“”„'\n.,!]+?)["»”“']?\s+(?:был\s+|успешно\s+)*создан"#,
            None,
        ),
        pattern(CreateTask, r"\bзадача\s*{Q}\s*(?:была\s+|успешно\s+)*(?:создана|добавлена)", None),
        pattern(CreateTask, r"\b(?:создал[аи]?|добавил[аи]?)\s+(?:новую\s+)?задачу\s*{Q}", None),
        pattern(CreateTask, r"\b(?:создана|добавлена)\s+(?:новая\s+)?задача\s*{Q}", None),
        pattern(
            UpdateTask,
            r"\bзадача\s*{Q}\s*(?:была\s+|успешно\s+)*(?:выполнена|завершена|закрыта)",
            Some(TASK_STATUS_DONE),
        ),
        pattern(
            UpdateTask,
            r"\bзадача\s*{Q}\s*(?:была\s+)?(?:переведена|взята)\s+в\s+работу",
            Some(TASK_STATUS_IN_PROGRESS),
        ),
        pattern(
            UpdateTask,
            r"\bзадача\s*{Q}\s*(?:была\s+)?(?:отправлена|передана)\s+на\s+(?:проверку|ревью)",
            Some(TASK_STATUS_REVIEW),
        ),
        pattern(
            UpdateProject,
            r"\bпроект\s*{Q}\s*(?:был\s+|успешно\s+)*заверш[её]н",
            Some(PROJECT_STATUS_COMPLETED),
        ),
        pattern(
            UpdateProject,
            r"\bпроект\s*{Q}\s*(?:был\s+)?приостановлен",
            Some(PROJECT_STATUS_ON_HOLD),
        ),
        pattern(
            UpdateProject,
            r"\bпроект\s*{Q}\s*(?:был\s+)?(?:архивирован|перемещ[её]н\s+в\s+архив)",
            Some(PROJECT_STATUS_ARCHIVED),
        ),
        pattern(
            UpdateProject,
            r"\bпроект\s*{Q}\s*(?:был\s+)?возобновл[её]н",
            Some(PROJECT_STATUS_ACTIVE),
        ),
    ]
});

/// Scans an assistant reply for a confirmation phrase and turns it into an
/// action. Returns `None` when no phrase is recognised.
pub fn parse_action_from_response(text: &str) -> Option<AiAction> {
    parse_action_at(text, Utc::now())
}

pub(crate) fn parse_action_at(text: &str, now: DateTime<Utc>) -> Option<AiAction> {
    let (matched, title) = PATTERNS.iter().find_map(|p| {
        let caps = p.regex.captures(text)?;
        let title = clean_title(caps.get(1)?.as_str())?;
        Some((p, title))
    })?;

    let mut data = ActionData {
        title: Some(title),
        status: matched.status.map(str::to_string),
        ..Default::default()
    };

    match matched.kind {
        ActionKind::CreateProject | ActionKind::CreateTask => {
            data.description = extract_description(text);
            data.priority = extract_priority(text).map(str::to_string);
            data.due_date = extract_deadline(text, now);
        }
        _ => {}
    }

    if matches!(matched.kind, ActionKind::CreateTask | ActionKind::UpdateTask) {
        data.project_title = extract_project_hint(text);
    }

    Some(AiAction {
        kind: matched.kind,
        data,
        confidence: PARSED_ACTION_CONFIDENCE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    fn parse(text: &str) -> Option<AiAction> {
        parse_action_at(text, now())
    }

    #[test]
    fn quoted_project_created() {
        let action = parse(r#"Проект "Launch" создан"#).unwrap();
        assert_eq!(action.kind, ActionKind::CreateProject);
        assert_eq!(action.data.title.as_deref(), Some("Launch"));
        assert_eq!(action.confidence, PARSED_ACTION_CONFIDENCE);
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({ "type": "create_project", "data": { "title": "Launch" }, "confidence": 0.9f32 })
        );
    }

    #[test]
    fn text_without_phrase_yields_none() {
        assert!(parse("Привет! Чем могу помочь с вашими проектами?").is_none());
        assert!(parse("Я могу создать проект, если хотите.").is_none());
        assert!(parse("").is_none());
    }

    #[test]
    fn every_create_project_template_is_recognised() {
        let cases = [
            "Готово! Проект «Сайт» успешно создан.",
            "Проект “Сайт” был создан.",
            "Я создал новый проект «Сайт» для вас.",
            "Создала проект 'Сайт'.",
            "Создан новый проект «Сайт».",
            "Проект под названием Сайт успешно создан.",
            "Проект с названием «Сайт» создан",
        ];
        for text in cases {
            let action = parse(text).unwrap_or_else(|| panic!("not recognised: {text}"));
            assert_eq!(action.kind, ActionKind::CreateProject, "{text}");
            assert_eq!(action.data.title.as_deref(), Some("Сайт"), "{text}");
        }
    }

    #[test]
    fn every_create_task_template_is_recognised() {
        let cases = [
            "Задача «Макет» создана.",
            "Задача \"Макет\" была успешно добавлена в проект \"Сайт\".",
            "Я добавил задачу «Макет».",
            "Создала новую задачу «Макет».",
            "Добавлена новая задача «Макет».",
        ];
        for text in cases {
            let action = parse(text).unwrap_or_else(|| panic!("not recognised: {text}"));
            assert_eq!(action.kind, ActionKind::CreateTask, "{text}");
            assert_eq!(action.data.title.as_deref(), Some("Макет"), "{text}");
        }
    }

    #[test]
    fn update_templates_carry_target_status() {
        let cases = [
            ("Задача «Макет» выполнена.", ActionKind::UpdateTask, TASK_STATUS_DONE),
            ("Задача «Макет» переведена в работу.", ActionKind::UpdateTask, TASK_STATUS_IN_PROGRESS),
            ("Задача «Макет» отправлена на проверку.", ActionKind::UpdateTask, TASK_STATUS_REVIEW),
            ("Проект «Сайт» завершён!", ActionKind::UpdateProject, PROJECT_STATUS_COMPLETED),
            ("Проект «Сайт» приостановлен.", ActionKind::UpdateProject, PROJECT_STATUS_ON_HOLD),
            ("Проект «Сайт» перемещен в архив.", ActionKind::UpdateProject, PROJECT_STATUS_ARCHIVED),
            ("Проект «Сайт» возобновлён.", ActionKind::UpdateProject, PROJECT_STATUS_ACTIVE),
        ];
        for (text, kind, status) in cases {
            let action = parse(text).unwrap_or_else(|| panic!("not recognised: {text}"));
            assert_eq!(action.kind, kind, "{text}");
            assert_eq!(action.data.status.as_deref(), Some(status), "{text}");
        }
    }

    #[test]
    fn task_creation_collects_auxiliary_fields() {
        let text = "Задача «Макет» добавлена в проект «Сайт» с высоким приоритетом, \
                    описание: «Главная и каталог». Срок — завтра.";
        let action = parse(text).unwrap();
        assert_eq!(action.kind, ActionKind::CreateTask);
        assert_eq!(action.data.project_title.as_deref(), Some("Сайт"));
        assert_eq!(action.data.priority.as_deref(), Some("HIGH"));
        assert_eq!(action.data.description.as_deref(), Some("Главная и каталог"));
        assert_eq!(action.data.due_date, Some(now() + Duration::days(1)));
    }

    #[test]
    fn first_matching_pattern_wins() {
        // Both a project and a task are confirmed; project patterns come first
        let text = "Задача «Макет» создана, а проект «Сайт» создан ранее.";
        let action = parse(text).unwrap();
        assert_eq!(action.kind, ActionKind::CreateProject);
        assert_eq!(action.data.title.as_deref(), Some("Сайт"));
    }

    #[test]
    fn titles_may_contain_other_quote_marks() {
        let action = parse(r#"Проект "Joe's app" создан"#).unwrap();
        assert_eq!(action.data.title.as_deref(), Some("Joe's app"));

        let action = parse(r#"Задача «Релиз "2.0"» создана"#).unwrap();
        assert_eq!(action.data.title.as_deref(), Some(r#"Релиз "2.0""#));
    }

    #[test]
    fn far_future_deadline_is_kept() {
        let action = parse("Задача «Отчёт» создана, срок 31.12.2099").unwrap();
        assert_eq!(
            action.data.due_date,
            Some(Utc.with_ymd_and_hms(2099, 12, 31, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn update_actions_skip_creation_fields() {
        let action = parse("Задача «Макет» выполнена завтра с высоким приоритетом").unwrap();
        assert!(action.data.due_date.is_none());
        assert!(action.data.priority.is_none());
    }
}
