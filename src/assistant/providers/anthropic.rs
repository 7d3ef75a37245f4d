use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{error_body, AiProvider, GenerationParams};
use crate::assistant::error::{ProviderError, Result};
use crate::assistant::types::{ChatMessage, ChatRole, CompletionResponse, TokenUsage};
use crate::shared::models::ProviderKind;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The Messages API rejects anything above this.
const MAX_TEMPERATURE: f64 = 1.0;

pub struct AnthropicProvider {
    http: Client,
    url: String,
    api_key: String,
    params: GenerationParams,
}

#[derive(Debug, Serialize)]
struct MessagesRequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<MessagesRequestMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    input_tokens: Option<i64>,
    output_tokens: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

impl AnthropicProvider {
    /// `base_url` is the API root; `/v1/messages` is appended.
    pub fn new(http: Client, base_url: &str, api_key: String, params: GenerationParams) -> Self {
        Self {
            http,
            url: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            api_key,
            params,
        }
    }
}

#[async_trait]
impl AiProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.params.model
    }

    async fn generate_completion(&self, messages: &[ChatMessage]) -> Result<CompletionResponse> {
        // The Messages API takes system text as a top-level field
        let system_parts: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.trim())
            .filter(|c| !c.is_empty())
            .collect();
        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        let conversation: Vec<MessagesRequestMessage> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System && !m.content.trim().is_empty())
            .map(|m| MessagesRequestMessage {
                role: m.role.as_str(),
                content: m.content.trim(),
            })
            .collect();

        if conversation.is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: ProviderKind::Anthropic,
                message: "no user or assistant messages provided".to_string(),
            });
        }

        let body = MessagesRequest {
            model: &self.params.model,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature.clamp(0.0, MAX_TEMPERATURE),
            system,
            messages: conversation,
        };

        tracing::debug!(provider = "anthropic", endpoint = %self.url, model = %self.params.model, "Sending messages request");

        let resp = self
            .http
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                provider: ProviderKind::Anthropic,
                source,
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(ProviderError::Status {
                provider: ProviderKind::Anthropic,
                status,
                body: error_body(resp).await,
            });
        }

        let parsed: MessagesResponse =
            resp.json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    provider: ProviderKind::Anthropic,
                    message: format!("invalid JSON: {}", e),
                })?;

        let content: String = parsed
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if content.trim().is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: ProviderKind::Anthropic,
                message: "no text blocks in response".to_string(),
            });
        }

        Ok(CompletionResponse {
            content,
            model: parsed.model,
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: match (u.input_tokens, u.output_tokens) {
                    (Some(i), Some(o)) => Some(i + o),
                    _ => None,
                },
            }),
        })
    }
}
