mod anthropic;
mod openai_compat;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatibleProvider;

use async_trait::async_trait;

use super::error::Result;
use super::types::{ChatMessage, CompletionResponse};
use crate::shared::models::ProviderKind;

/// Per-request generation knobs taken from the user's settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn model(&self) -> &str;

    async fn generate_completion(&self, messages: &[ChatMessage]) -> Result<CompletionResponse>;
}

/// Reads an error body without letting a read failure mask the status.
pub(crate) async fn error_body(resp: reqwest::Response) -> String {
    let text = resp
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read response>".to_string());
    if text.chars().count() > 500 {
        let truncated: String = text.chars().take(500).collect();
        format!("{}…", truncated)
    } else {
        text
    }
}
