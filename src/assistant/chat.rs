use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

use super::actions::{parse_action_from_response, ActionExecutor, ActionResult, AiAction};
use super::error::ProviderError;
use super::prompt::{build_conversation, build_system_prompt};
use super::provider_factory::ProviderFactory;
use super::types::CompletionResponse;
use crate::shared::models::{AiSettings, ChatMessageRecord, DatabaseError};
use crate::shared::workspace::WorkspaceStore;

#[derive(Error, Debug)]
pub enum ChatTurnError {
    #[error(transparent)]
    Store(#[from] DatabaseError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug)]
pub struct ChatTurn {
    pub completion: CompletionResponse,
    pub action: Option<AiAction>,
    /// Set only when the reply carried an action and execution was requested.
    pub action_result: Option<ActionResult>,
}

/// Answers one user message: builds the prompt from the user's projects,
/// asks the provider, then parses and optionally runs the confirmed action.
pub struct ChatAssistant {
    factory: ProviderFactory,
    store: Arc<dyn WorkspaceStore>,
    system_prompt_override: Option<String>,
}

impl ChatAssistant {
    pub fn new(
        factory: ProviderFactory,
        store: Arc<dyn WorkspaceStore>,
        system_prompt_override: Option<String>,
    ) -> Self {
        Self {
            factory,
            store,
            system_prompt_override,
        }
    }

    /// `history` already ends with the user's new message.
    pub async fn respond(
        &self,
        user_id: &str,
        settings: &AiSettings,
        history: &[ChatMessageRecord],
        execute_actions: bool,
    ) -> Result<ChatTurn, ChatTurnError> {
        let projects = self.store.list_accessible_projects(user_id).await?;
        let system_prompt =
            build_system_prompt(self.system_prompt_override.as_deref(), &projects, Utc::now());
        let messages = build_conversation(system_prompt, history);

        let completion = self.factory.generate_completion(settings, &messages).await?;

        let action = parse_action_from_response(&completion.content);
        let action_result = match (&action, execute_actions) {
            (Some(action), true) => {
                let executor = ActionExecutor::new(self.store.clone());
                Some(executor.execute_action(action, user_id).await)
            }
            _ => None,
        };

        Ok(ChatTurn {
            completion,
            action,
            action_result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::actions::{ActionKind, MemoryWorkspace};
    use crate::shared::config::BuiltinProviderConfig;
    use crate::shared::models::ProviderKind;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn history(text: &str) -> Vec<ChatMessageRecord> {
        vec![ChatMessageRecord {
            id: "m1".into(),
            chat_id: "c1".into(),
            role: "user".into(),
            content: text.into(),
            created_at: Utc::now(),
        }]
    }

    fn settings(server: &MockServer) -> AiSettings {
        AiSettings {
            provider: ProviderKind::Custom,
            base_url: Some(format!("{}/generate", server.uri())),
            ..AiSettings::defaults_for("u1")
        }
    }

    fn assistant(store: &Arc<MemoryWorkspace>) -> ChatAssistant {
        ChatAssistant::new(
            ProviderFactory::new(reqwest::Client::new(), BuiltinProviderConfig::default()),
            store.clone(),
            None,
        )
    }

    async fn replying(server: &MockServer, reply: &str) {
        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(body_string_contains("Архив 2025"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": reply })))
            .expect(1)
            .mount(server)
            .await;
    }

    fn project_titles(store: &MemoryWorkspace) -> Vec<String> {
        store
            .projects
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.title.clone())
            .collect()
    }

    #[tokio::test]
    async fn confirmed_action_is_executed() {
        let server = MockServer::start().await;
        replying(&server, "Готово! Проект «Сайт» создан.").await;
        let store = Arc::new(MemoryWorkspace::default());
        store.seed_project("u1", "Архив 2025", 60);

        let turn = assistant(&store)
            .respond("u1", &settings(&server), &history("Создай проект Сайт"), true)
            .await
            .unwrap();

        assert_eq!(turn.completion.content, "Готово! Проект «Сайт» создан.");
        assert_eq!(turn.action.unwrap().kind, ActionKind::CreateProject);
        assert!(turn.action_result.unwrap().success);
        assert_eq!(project_titles(&store), vec!["Архив 2025", "Сайт"]);
    }

    #[tokio::test]
    async fn parse_only_turn_writes_nothing() {
        let server = MockServer::start().await;
        replying(&server, "Проект «Сайт» создан.").await;
        let store = Arc::new(MemoryWorkspace::default());
        store.seed_project("u1", "Архив 2025", 60);

        let turn = assistant(&store)
            .respond("u1", &settings(&server), &history("Создай проект Сайт"), false)
            .await
            .unwrap();

        assert_eq!(turn.action.unwrap().data.title.as_deref(), Some("Сайт"));
        assert!(turn.action_result.is_none());
        assert_eq!(project_titles(&store), vec!["Архив 2025"]);
    }

    #[tokio::test]
    async fn provider_failure_is_returned_without_side_effects() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;
        let store = Arc::new(MemoryWorkspace::default());

        let err = assistant(&store)
            .respond("u1", &settings(&server), &history("Создай проект Сайт"), true)
            .await
            .unwrap_err();

        assert!(matches!(err, ChatTurnError::Provider(ProviderError::Status { .. })));
        assert!(err.to_string().contains("down"));
        assert!(project_titles(&store).is_empty());
    }
}
