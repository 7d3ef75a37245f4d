use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const MAX_TOKENS_LIMIT: u32 = 32_000;

/// The five chat-completion backends a user can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Builtin,
    Local,
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Custom,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Builtin,
        ProviderKind::Local,
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Builtin => "builtin",
            ProviderKind::Local => "local",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "builtin" | "built-in" | "sdk" => Ok(ProviderKind::Builtin),
            "local" => Ok(ProviderKind::Local),
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "custom" => Ok(ProviderKind::Custom),
            other => Err(format!(
                "Unknown AI provider '{}' (expected one of: {})",
                other,
                ProviderKind::ALL.map(|k| k.as_str()).join(", ")
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSettings {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_enabled() -> bool {
    true
}

/// Settings as returned to clients; the key never leaves the server in full.
#[derive(Debug, Clone, Serialize)]
pub struct AiSettingsView {
    pub provider: ProviderKind,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub has_api_key: bool,
    pub max_tokens: u32,
    pub temperature: f64,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAiSettingsRequest {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// `None` keeps the stored key, an empty string clears it.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", prefix, suffix)
}

/// Accepts only absolute http(s) URLs.
pub fn validate_base_url(raw: &str) -> Result<url::Url, String> {
    let parsed =
        url::Url::parse(raw.trim()).map_err(|e| format!("Invalid base URL '{}': {}", raw, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(format!(
            "Invalid base URL '{}': unsupported scheme '{}'",
            raw, other
        )),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AiSettings {
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            provider: ProviderKind::Builtin,
            base_url: None,
            model: None,
            api_key: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            enabled: true,
        }
    }

    pub fn view(&self) -> AiSettingsView {
        AiSettingsView {
            provider: self.provider,
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.as_deref().map(mask_api_key),
            has_api_key: self.api_key.as_deref().map(|k| !k.is_empty()).unwrap_or(false),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            enabled: self.enabled,
        }
    }

    pub async fn find_for_user(
        pool: &sqlx::MySqlPool,
        user_id: &str,
    ) -> Result<Option<AiSettings>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT user_id, provider, base_url, model, api_key, max_tokens, temperature, enabled
            FROM ai_settings
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|r| {
            let provider: String = r.get("provider");
            let max_tokens: i32 = r.get("max_tokens");
            AiSettings {
                user_id: r.get("user_id"),
                provider: provider.parse().unwrap_or_else(|e| {
                    tracing::warn!(user_id = %user_id, "{}; falling back to builtin", e);
                    ProviderKind::Builtin
                }),
                base_url: r.get("base_url"),
                model: r.get("model"),
                api_key: r.get("api_key"),
                max_tokens: u32::try_from(max_tokens).unwrap_or(DEFAULT_MAX_TOKENS),
                temperature: r.get("temperature"),
                enabled: r.get("enabled"),
            }
        }))
    }

    pub async fn load_or_default(
        pool: &sqlx::MySqlPool,
        user_id: &str,
    ) -> Result<AiSettings, sqlx::Error> {
        Ok(Self::find_for_user(pool, user_id)
            .await?
            .unwrap_or_else(|| Self::defaults_for(user_id)))
    }

    pub async fn upsert(&self, pool: &sqlx::MySqlPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO ai_settings (user_id, provider, base_url, model, api_key, max_tokens, temperature, enabled, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                provider = VALUES(provider),
                base_url = VALUES(base_url),
                model = VALUES(model),
                api_key = VALUES(api_key),
                max_tokens = VALUES(max_tokens),
                temperature = VALUES(temperature),
                enabled = VALUES(enabled),
                updated_at = VALUES(updated_at)
            "#,
        )
        .bind(&self.user_id)
        .bind(self.provider.as_str())
        .bind(&self.base_url)
        .bind(&self.model)
        .bind(&self.api_key)
        .bind(self.max_tokens as i32)
        .bind(self.temperature)
        .bind(self.enabled)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(())
    }
}

impl UpdateAiSettingsRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(p) = &self.provider {
            p.parse::<ProviderKind>()?;
        }
        if let Some(max) = self.max_tokens {
            if max == 0 || max > MAX_TOKENS_LIMIT {
                return Err(format!(
                    "max_tokens must be between 1 and {}",
                    MAX_TOKENS_LIMIT
                ));
            }
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err("temperature must be between 0.0 and 2.0".to_string());
            }
        }
        if let Some(url) = self.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            validate_base_url(url)?;
        }
        Ok(())
    }

    /// Merges the request over `current`. Call `validate` first.
    ///
    /// A stored key never follows the settings to a different provider or
    /// endpoint; it has to be supplied again alongside such a change.
    pub fn apply(self, mut current: AiSettings) -> AiSettings {
        let previous_provider = current.provider;
        let previous_base_url = current.base_url.clone();

        if let Some(p) = self.provider.as_deref().and_then(|p| p.parse().ok()) {
            current.provider = p;
        }
        if self.base_url.is_some() {
            current.base_url = non_empty(self.base_url).map(|u| u.trim_end_matches('/').to_string());
        }
        let retargeted =
            current.provider != previous_provider || current.base_url != previous_base_url;
        if retargeted && self.api_key.is_none() {
            current.api_key = None;
        }
        if self.model.is_some() {
            current.model = non_empty(self.model);
        }
        if self.api_key.is_some() {
            current.api_key = non_empty(self.api_key);
        }
        if let Some(m) = self.max_tokens {
            current.max_tokens = m;
        }
        if let Some(t) = self.temperature {
            current.temperature = t;
        }
        if let Some(e) = self.enabled {
            current.enabled = e;
        }
        current
    }
}
