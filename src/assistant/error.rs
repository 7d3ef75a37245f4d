use thiserror::Error;

use crate::shared::models::ProviderKind;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("AI assistant is disabled in settings")]
    Disabled,

    #[error("{0} provider requires an API key")]
    MissingApiKey(ProviderKind),

    #[error("{0} provider requires a base URL")]
    MissingBaseUrl(ProviderKind),

    #[error("{0}")]
    InvalidBaseUrl(String),

    #[error("Built-in AI provider is not configured on this server")]
    NotConfigured,

    #[error("{provider} request failed: {source}")]
    Request {
        provider: ProviderKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} responded {status}: {body}")]
    Status {
        provider: ProviderKind,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{provider} returned an unusable response: {message}")]
    InvalidResponse {
        provider: ProviderKind,
        message: String,
    },

    #[error("{0} did not answer within {1} seconds")]
    Timeout(ProviderKind, u64),

    #[error("Local server unreachable at every endpoint: {}", .0.join("; "))]
    AllEndpointsFailed(Vec<String>),
}

pub type Result<T> = std::result::Result<T, ProviderError>;
