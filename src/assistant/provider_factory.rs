use reqwest::Client;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::error::{ProviderError, Result};
use super::providers::{AiProvider, AnthropicProvider, GenerationParams, OpenAiCompatibleProvider};
use super::types::{ChatMessage, CompletionResponse, TokenUsage};
use crate::shared::config::BuiltinProviderConfig;
use crate::shared::models::settings::validate_base_url;
use crate::shared::models::{AiSettings, AppState, ProviderKind};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_LOCAL_MODEL: &str = "local-model";
pub const DEFAULT_CUSTOM_MODEL: &str = "default";

pub const PING_MESSAGE: &str =
    "Hello! Reply with one short sentence to confirm the connection works.";
pub const CONNECTION_TEST_TIMEOUT_SECS: u64 = 30;

/// Result of a `test_connection` call, including raw diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub provider: ProviderKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: u128,
}

#[derive(Clone)]
pub struct ProviderFactory {
    http: Client,
    builtin: BuiltinProviderConfig,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn checked_base(raw: &str) -> Result<String> {
    validate_base_url(raw).map_err(ProviderError::InvalidBaseUrl)?;
    Ok(raw.trim().trim_end_matches('/').to_string())
}

impl ProviderFactory {
    pub fn new(http: Client, builtin: BuiltinProviderConfig) -> Self {
        Self { http, builtin }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.http.clone(), state.config.builtin.clone())
    }

    /// Builds the adapter selected by `settings`. Every credential and URL
    /// check happens here, so a misconfigured provider never touches the network.
    pub fn create(&self, settings: &AiSettings) -> Result<Box<dyn AiProvider>> {
        if !settings.enabled {
            return Err(ProviderError::Disabled);
        }

        let model_or = |fallback: &str| {
            non_empty(settings.model.as_deref())
                .unwrap_or(fallback)
                .to_string()
        };
        let params = |model: String| GenerationParams {
            model,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        };
        let user_key = non_empty(settings.api_key.as_deref()).map(str::to_string);
        let base_url = non_empty(settings.base_url.as_deref());

        let provider: Box<dyn AiProvider> = match settings.provider {
            ProviderKind::Builtin => {
                let url = non_empty(self.builtin.url.as_deref()).ok_or(ProviderError::NotConfigured)?;
                let key = non_empty(self.builtin.api_key.as_deref())
                    .ok_or(ProviderError::NotConfigured)?;
                let base = checked_base(url)?;
                Box::new(OpenAiCompatibleProvider::new(
                    ProviderKind::Builtin,
                    self.http.clone(),
                    vec![format!("{}/chat/completions", base)],
                    Some(key.to_string()),
                    params(model_or(&self.builtin.model)),
                ))
            }
            ProviderKind::Local => {
                let base = checked_base(
                    base_url.ok_or(ProviderError::MissingBaseUrl(ProviderKind::Local))?,
                )?;
                Box::new(OpenAiCompatibleProvider::new(
                    ProviderKind::Local,
                    self.http.clone(),
                    vec![
                        format!("{}/v1/chat/completions", base),
                        format!("{}/chat/completions", base),
                    ],
                    user_key,
                    params(model_or(DEFAULT_LOCAL_MODEL)),
                ))
            }
            ProviderKind::OpenAi => {
                let key = user_key.ok_or(ProviderError::MissingApiKey(ProviderKind::OpenAi))?;
                let base = checked_base(base_url.unwrap_or(DEFAULT_OPENAI_BASE_URL))?;
                Box::new(OpenAiCompatibleProvider::new(
                    ProviderKind::OpenAi,
                    self.http.clone(),
                    vec![format!("{}/chat/completions", base)],
                    Some(key),
                    params(model_or(DEFAULT_OPENAI_MODEL)),
                ))
            }
            ProviderKind::Anthropic => {
                let key = user_key.ok_or(ProviderError::MissingApiKey(ProviderKind::Anthropic))?;
                let base = checked_base(base_url.unwrap_or(DEFAULT_ANTHROPIC_BASE_URL))?;
                Box::new(AnthropicProvider::new(
                    self.http.clone(),
                    &base,
                    key,
                    params(model_or(DEFAULT_ANTHROPIC_MODEL)),
                ))
            }
            ProviderKind::Custom => {
                // The custom URL is the full endpoint, used verbatim
                let base = checked_base(
                    base_url.ok_or(ProviderError::MissingBaseUrl(ProviderKind::Custom))?,
                )?;
                Box::new(OpenAiCompatibleProvider::new(
                    ProviderKind::Custom,
                    self.http.clone(),
                    vec![base],
                    user_key,
                    params(model_or(DEFAULT_CUSTOM_MODEL)),
                ))
            }
        };

        Ok(provider)
    }

    pub async fn generate_completion(
        &self,
        settings: &AiSettings,
        messages: &[ChatMessage],
    ) -> Result<CompletionResponse> {
        let provider = self.create(settings)?;
        let started = Instant::now();
        let result = provider.generate_completion(messages).await;
        match &result {
            Ok(resp) => info!(
                provider = %provider.kind(),
                model = %provider.model(),
                duration_ms = %started.elapsed().as_millis(),
                chars = resp.content.chars().count(),
                "Completion received"
            ),
            Err(e) => warn!(
                provider = %provider.kind(),
                model = %provider.model(),
                duration_ms = %started.elapsed().as_millis(),
                "Completion failed: {}",
                e
            ),
        }
        result
    }

    /// Sends a fixed ping message and reports the outcome instead of failing.
    pub async fn test_connection(&self, settings: &AiSettings) -> ConnectionTestResult {
        let started = Instant::now();
        let ping = [ChatMessage::user(PING_MESSAGE)];

        let outcome = match self.create(settings) {
            Ok(provider) => {
                match tokio::time::timeout(
                    Duration::from_secs(CONNECTION_TEST_TIMEOUT_SECS),
                    provider.generate_completion(&ping),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(settings.provider, CONNECTION_TEST_TIMEOUT_SECS)),
                }
            }
            Err(e) => Err(e),
        };
        let latency_ms = started.elapsed().as_millis();

        match outcome {
            Ok(resp) => ConnectionTestResult {
                success: true,
                provider: settings.provider,
                message: format!("Connected to {} provider", settings.provider),
                model: resp.model,
                response: Some(resp.content.chars().take(200).collect()),
                usage: resp.usage,
                error: None,
                latency_ms,
            },
            Err(e) => ConnectionTestResult {
                success: false,
                provider: settings.provider,
                message: format!("Connection to {} provider failed", settings.provider),
                model: None,
                response: None,
                usage: None,
                error: Some(e.to_string()),
                latency_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(provider: ProviderKind) -> AiSettings {
        AiSettings {
            provider,
            ..AiSettings::defaults_for("u1")
        }
    }

    fn factory() -> ProviderFactory {
        ProviderFactory::new(Client::new(), BuiltinProviderConfig::default())
    }

    #[test]
    fn every_variant_rejects_missing_credentials_before_io() {
        let f = factory();
        let expectations = [
            (ProviderKind::Builtin, "Built-in AI provider is not configured on this server"),
            (ProviderKind::Local, "local provider requires a base URL"),
            (ProviderKind::OpenAi, "openai provider requires an API key"),
            (ProviderKind::Anthropic, "anthropic provider requires an API key"),
            (ProviderKind::Custom, "custom provider requires a base URL"),
        ];
        for (kind, message) in expectations {
            let err = f.create(&settings(kind)).err().expect("must be rejected");
            assert!(
                matches!(
                    err,
                    ProviderError::NotConfigured
                        | ProviderError::MissingApiKey(_)
                        | ProviderError::MissingBaseUrl(_)
                ),
                "{kind}: {err}"
            );
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let mut s = settings(ProviderKind::OpenAi);
        s.api_key = Some("   ".into());
        assert!(matches!(
            factory().create(&s).err(),
            Some(ProviderError::MissingApiKey(ProviderKind::OpenAi))
        ));
    }

    #[test]
    fn disabled_settings_are_rejected() {
        let mut s = settings(ProviderKind::OpenAi);
        s.api_key = Some("sk".into());
        s.enabled = false;
        assert!(matches!(factory().create(&s).err(), Some(ProviderError::Disabled)));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let mut s = settings(ProviderKind::Local);
        s.base_url = Some("localhost:1234".into());
        assert!(matches!(
            factory().create(&s).err(),
            Some(ProviderError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn model_defaults_per_provider() {
        let f = ProviderFactory::new(
            Client::new(),
            BuiltinProviderConfig {
                url: Some("http://llm.internal".into()),
                api_key: Some("server".into()),
                model: "house-model".into(),
            },
        );

        assert_eq!(f.create(&settings(ProviderKind::Builtin)).unwrap().model(), "house-model");

        let mut s = settings(ProviderKind::OpenAi);
        s.api_key = Some("sk".into());
        assert_eq!(f.create(&s).unwrap().model(), DEFAULT_OPENAI_MODEL);

        let mut s = settings(ProviderKind::Anthropic);
        s.api_key = Some("sk-ant".into());
        assert_eq!(f.create(&s).unwrap().model(), DEFAULT_ANTHROPIC_MODEL);

        let mut s = settings(ProviderKind::Local);
        s.base_url = Some("http://localhost:1234".into());
        s.model = Some("qwen2.5".into());
        let p = f.create(&s).unwrap();
        assert_eq!(p.model(), "qwen2.5");
        assert_eq!(p.kind(), ProviderKind::Local);
    }

    #[tokio::test]
    async fn builtin_uses_server_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer server-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "builtin ok" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let f = ProviderFactory::new(
            Client::new(),
            BuiltinProviderConfig {
                url: Some(format!("{}/v1", server.uri())),
                api_key: Some("server-key".into()),
                model: "house-model".into(),
            },
        );
        let mut s = settings(ProviderKind::Builtin);
        // A user key must not leak into builtin requests
        s.api_key = Some("user-key".into());

        let resp = f
            .generate_completion(&s, &[ChatMessage::user("hi")])
            .await
            .unwrap();
        assert_eq!(resp.content, "builtin ok");
    }

    #[tokio::test]
    async fn test_connection_reports_success_with_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gpt-4o-mini-2024-07-18",
                "choices": [{ "message": { "content": "Connection works." } }],
                "usage": { "prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12 }
            })))
            .mount(&server)
            .await;

        let mut s = settings(ProviderKind::OpenAi);
        s.api_key = Some("sk".into());
        s.base_url = Some(server.uri());

        let result = factory().test_connection(&s).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.model.as_deref(), Some("gpt-4o-mini-2024-07-18"));
        assert_eq!(result.response.as_deref(), Some("Connection works."));
        assert_eq!(result.usage.unwrap().total_tokens, Some(12));
    }

    #[tokio::test]
    async fn test_connection_reports_configuration_failure() {
        let result = factory().test_connection(&settings(ProviderKind::Custom)).await;
        assert!(!result.success);
        assert_eq!(result.provider, ProviderKind::Custom);
        assert_eq!(result.error.as_deref(), Some("custom provider requires a base URL"));
    }
}
