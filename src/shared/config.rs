use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::Deserialize;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_BUILTIN_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMindConfig {
    #[serde(default)]
    pub builtin: BuiltinProviderConfig,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Replaces the assistant's default system prompt when set.
    #[serde(default)]
    pub system_prompt_override: Option<String>,
}

/// Server-side credentials for the `builtin` provider. Users selecting it
/// never supply their own key.
#[derive(Debug, Clone, Deserialize)]
pub struct BuiltinProviderConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_builtin_model")]
    pub model: String,
}

impl Default for BuiltinProviderConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            model: default_builtin_model(),
        }
    }
}

impl Default for ProjectMindConfig {
    fn default() -> Self {
        Self {
            builtin: BuiltinProviderConfig::default(),
            request_timeout_secs: default_request_timeout(),
            system_prompt_override: None,
        }
    }
}

impl BuiltinProviderConfig {
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().map(|u| !u.is_empty()).unwrap_or(false)
            && self.api_key.as_deref().map(|k| !k.is_empty()).unwrap_or(false)
    }
}

impl ProjectMindConfig {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config at {}: {}", path.display(), e))?;
        let mut config: ProjectMindConfig = serde_json::from_str(&data)
            .map_err(|e| anyhow!("Failed to parse config JSON at {}: {}", path.display(), e))?;
        config.normalize();
        Ok(config)
    }

    /// Loads the config file if present, falling back to defaults, then
    /// applies `PROJECTMIND_BUILTIN_*` environment overrides.
    pub fn load(path: Option<PathBuf>) -> Result<(Self, PathBuf)> {
        let path = path.unwrap_or_else(resolve_config_path);
        let mut config = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            tracing::info!(
                "No config file at {}, using built-in defaults",
                path.display()
            );
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.normalize();
        Ok((config, path))
    }

    fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PROJECTMIND_BUILTIN_URL") {
            self.builtin.url = Some(url);
        }
        if let Some(key) = lookup("PROJECTMIND_BUILTIN_API_KEY") {
            self.builtin.api_key = Some(key);
        }
        if let Some(model) = lookup("PROJECTMIND_BUILTIN_MODEL") {
            self.builtin.model = model;
        }
    }

    fn normalize(&mut self) {
        self.builtin.url = self
            .builtin
            .url
            .as_ref()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        self.builtin.api_key = self
            .builtin
            .api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self.builtin.model = self.builtin.model.trim().to_string();
        if self.builtin.model.is_empty() {
            self.builtin.model = default_builtin_model();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout();
        }
        self.system_prompt_override = self
            .system_prompt_override
            .take()
            .filter(|p| !p.trim().is_empty());
    }
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_builtin_model() -> String {
    DEFAULT_BUILTIN_MODEL.to_string()
}

pub fn resolve_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("PROJECTMIND_CONFIG_PATH") {
        return expand_path(path);
    }

    default_config_path()
}

pub fn expand_path(input: String) -> PathBuf {
    if let Some(stripped) = input.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    } else if let Some(stripped) = input.strip_prefix("~\\") {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(input)
}

fn default_config_path() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".projectmind")
        .join("projectmind.json")
}

fn home_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        std::env::var_os("USERPROFILE").map(PathBuf::from)
    } else {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn load_from_path_trims_and_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projectmind.json");
        fs::write(
            &path,
            r#"{
                "builtin": { "url": " https://llm.internal/v1/ ", "api_key": "  ", "model": "" },
                "request_timeout_secs": 0
            }"#,
        )
        .unwrap();

        let config = ProjectMindConfig::load_from_path(&path).unwrap();
        assert_eq!(config.builtin.url.as_deref(), Some("https://llm.internal/v1"));
        assert!(config.builtin.api_key.is_none());
        assert_eq!(config.builtin.model, DEFAULT_BUILTIN_MODEL);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert!(!config.builtin.is_configured());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, path) =
            ProjectMindConfig::load(Some(dir.path().join("absent.json"))).unwrap();
        assert!(path.ends_with("absent.json"));
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = ProjectMindConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config JSON"));
    }

    #[test]
    fn env_overrides_configure_builtin_provider() {
        let env: HashMap<&str, &str> = [
            ("PROJECTMIND_BUILTIN_URL", "http://127.0.0.1:8080/"),
            ("PROJECTMIND_BUILTIN_API_KEY", "server-key"),
        ]
        .into_iter()
        .collect();

        let mut config = ProjectMindConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        config.normalize();

        assert!(config.builtin.is_configured());
        assert_eq!(config.builtin.url.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(config.builtin.model, DEFAULT_BUILTIN_MODEL);
    }

    #[test]
    fn expand_path_keeps_plain_paths() {
        assert_eq!(
            expand_path("/etc/projectmind.json".to_string()),
            PathBuf::from("/etc/projectmind.json")
        );
    }
}
