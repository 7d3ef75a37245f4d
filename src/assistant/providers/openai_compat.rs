use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{error_body, AiProvider, GenerationParams};
use crate::assistant::error::{ProviderError, Result};
use crate::assistant::types::{ChatMessage, CompletionResponse, TokenUsage};
use crate::shared::models::ProviderKind;

/// Speaks the OpenAI chat-completions wire format. Serves the builtin,
/// local, openai and custom providers; they differ only in endpoints and auth.
pub struct OpenAiCompatibleProvider {
    kind: ProviderKind,
    http: Client,
    /// Tried in order; the first successful response wins.
    endpoints: Vec<String>,
    api_key: Option<String>,
    params: GenerationParams,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
    stream: bool,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        kind: ProviderKind,
        http: Client,
        endpoints: Vec<String>,
        api_key: Option<String>,
        params: GenerationParams,
    ) -> Self {
        Self {
            kind,
            http,
            endpoints,
            api_key,
            params,
        }
    }

    async fn post(&self, url: &str, body: &ChatRequest<'_>) -> Result<CompletionResponse> {
        debug!(provider = %self.kind, endpoint = %url, model = %self.params.model, "Sending chat completion");

        let mut request = self.http.post(url).json(body);
        if let Some(key) = self.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await.map_err(|source| ProviderError::Request {
            provider: self.kind,
            source,
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(ProviderError::Status {
                provider: self.kind,
                status,
                body: error_body(resp).await,
            });
        }

        let raw: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse {
                provider: self.kind,
                message: format!("invalid JSON: {}", e),
            })?;

        let content = extract_content(&raw).ok_or_else(|| ProviderError::InvalidResponse {
            provider: self.kind,
            message: "no message content in response".to_string(),
        })?;

        Ok(CompletionResponse {
            content,
            model: raw
                .get("model")
                .and_then(|m| m.as_str())
                .map(|m| m.to_string()),
            usage: extract_usage(&raw),
        })
    }
}

#[async_trait]
impl AiProvider for OpenAiCompatibleProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> &str {
        &self.params.model
    }

    async fn generate_completion(&self, messages: &[ChatMessage]) -> Result<CompletionResponse> {
        let wire: Vec<ChatRequestMessage> = messages
            .iter()
            .filter(|m| !m.content.trim().is_empty())
            .map(|m| ChatRequestMessage {
                role: m.role.as_str(),
                content: m.content.trim(),
            })
            .collect();

        if wire.is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: self.kind,
                message: "no messages provided".to_string(),
            });
        }

        let body = ChatRequest {
            model: &self.params.model,
            messages: wire,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            stream: false,
        };

        if self.endpoints.len() == 1 {
            return self.post(&self.endpoints[0], &body).await;
        }

        let mut failures = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            match self.post(endpoint, &body).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    warn!(provider = %self.kind, endpoint = %endpoint, "Endpoint failed: {}", e);
                    failures.push(format!("{}: {}", endpoint, e));
                }
            }
        }
        Err(ProviderError::AllEndpointsFailed(failures))
    }
}

fn non_blank(v: &Value) -> Option<String> {
    v.as_str()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
}

/// Pulls the reply text out of the response shapes seen in the wild:
/// OpenAI chat, legacy completions, Ollama-style and bare `content`/`response`.
pub(crate) fn extract_content(raw: &Value) -> Option<String> {
    let choice = raw.get("choices").and_then(|c| c.get(0));
    choice
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(non_blank)
        .or_else(|| choice.and_then(|c| c.get("text")).and_then(non_blank))
        .or_else(|| {
            raw.get("message")
                .and_then(|m| m.get("content"))
                .and_then(non_blank)
        })
        .or_else(|| raw.get("content").and_then(non_blank))
        .or_else(|| raw.get("response").and_then(non_blank))
}

fn extract_usage(raw: &Value) -> Option<TokenUsage> {
    let usage = raw.get("usage")?;
    Some(TokenUsage {
        prompt_tokens: usage.get("prompt_tokens").and_then(|v| v.as_i64()),
        completion_tokens: usage.get("completion_tokens").and_then(|v| v.as_i64()),
        total_tokens: usage.get("total_tokens").and_then(|v| v.as_i64()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(model: &str) -> GenerationParams {
        GenerationParams {
            model: model.to_string(),
            max_tokens: 256,
            temperature: 0.2,
        }
    }

    fn chat_ok(content: &str) -> Value {
        json!({
            "model": "served-model",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
        })
    }

    #[test]
    fn extract_content_handles_alternative_shapes() {
        assert_eq!(extract_content(&chat_ok("hi")).as_deref(), Some("hi"));
        assert_eq!(
            extract_content(&json!({ "choices": [{ "text": "legacy" }] })).as_deref(),
            Some("legacy")
        );
        assert_eq!(
            extract_content(&json!({ "message": { "content": "ollama" } })).as_deref(),
            Some("ollama")
        );
        assert_eq!(
            extract_content(&json!({ "content": "bare" })).as_deref(),
            Some("bare")
        );
        assert_eq!(
            extract_content(&json!({ "response": "generate" })).as_deref(),
            Some("generate")
        );
        assert_eq!(extract_content(&json!({ "content": "   " })), None);
        assert_eq!(extract_content(&json!({ "error": "nope" })), None);
    }

    #[tokio::test]
    async fn sends_bearer_key_and_settings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 256,
                "temperature": 0.2,
                "stream": false,
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": "hello" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_ok("Hi there")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(
            ProviderKind::OpenAi,
            Client::new(),
            vec![format!("{}/v1/chat/completions", server.uri())],
            Some("sk-test".into()),
            params("gpt-4o-mini"),
        );
        let resp = provider
            .generate_completion(&[
                ChatMessage::system("be brief"),
                ChatMessage::user("hello"),
                ChatMessage::assistant("   "),
            ])
            .await
            .unwrap();

        assert_eq!(resp.content, "Hi there");
        assert_eq!(resp.model.as_deref(), Some("served-model"));
        assert_eq!(resp.usage.unwrap().total_tokens, Some(15));
    }

    #[tokio::test]
    async fn falls_back_to_second_endpoint_and_stops_at_first_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_ok("local reply")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(
            ProviderKind::Local,
            Client::new(),
            vec![
                format!("{}/v1/chat/completions", server.uri()),
                format!("{}/chat/completions", server.uri()),
            ],
            None,
            params("local-model"),
        );
        let resp = provider
            .generate_completion(&[ChatMessage::user("ping")])
            .await
            .unwrap();
        assert_eq!(resp.content, "local reply");
    }

    #[tokio::test]
    async fn first_endpoint_success_skips_the_rest() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_ok("first")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_ok("second")))
            .expect(0)
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(
            ProviderKind::Local,
            Client::new(),
            vec![
                format!("{}/v1/chat/completions", server.uri()),
                format!("{}/chat/completions", server.uri()),
            ],
            None,
            params("local-model"),
        );
        let resp = provider
            .generate_completion(&[ChatMessage::user("ping")])
            .await
            .unwrap();
        assert_eq!(resp.content, "first");
    }

    #[tokio::test]
    async fn every_endpoint_failing_reports_each_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("loading model"))
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(
            ProviderKind::Local,
            Client::new(),
            vec![
                format!("{}/v1/chat/completions", server.uri()),
                format!("{}/chat/completions", server.uri()),
            ],
            None,
            params("local-model"),
        );
        let err = provider
            .generate_completion(&[ChatMessage::user("ping")])
            .await
            .unwrap_err();
        match err {
            ProviderError::AllEndpointsFailed(failures) => {
                assert_eq!(failures.len(), 2);
                assert!(failures[0].contains("loading model"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn non_success_status_surfaces_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(
            ProviderKind::Custom,
            Client::new(),
            vec![format!("{}/hook", server.uri())],
            Some("k".into()),
            params("default"),
        );
        let err = provider
            .generate_completion(&[ChatMessage::user("ping")])
            .await
            .unwrap_err();
        match err {
            ProviderError::Status { status, body, .. } => {
                assert_eq!(status.as_u16(), 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn custom_endpoint_accepts_plain_response_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "response": "custom ok" })),
            )
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(
            ProviderKind::Custom,
            Client::new(),
            vec![format!("{}/api/generate", server.uri())],
            None,
            params("default"),
        );
        let resp = provider
            .generate_completion(&[ChatMessage::user("ping")])
            .await
            .unwrap();
        assert_eq!(resp.content, "custom ok");
        assert!(resp.model.is_none());
        assert!(resp.usage.is_none());
    }

    #[tokio::test]
    async fn blank_history_is_rejected_without_io() {
        let provider = OpenAiCompatibleProvider::new(
            ProviderKind::OpenAi,
            Client::new(),
            vec!["http://127.0.0.1:9/unused".into()],
            Some("k".into()),
            params("m"),
        );
        let err = provider
            .generate_completion(&[ChatMessage::user("  ")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse { .. }));
    }
}
