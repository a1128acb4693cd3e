use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::core::annotate::DEFAULT_MAX_DIFF_CHARS;

/// Keys in the YAML file are the same names the CI action takes as inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "anthropic_api_key", default)]
    pub anthropic_key: Option<String>,

    #[serde(rename = "openai_api_key", default)]
    pub openai_key: Option<String>,

    #[serde(default = "default_provider")]
    pub default_provider: String,

    #[serde(default = "default_claude_model")]
    pub claude_model: String,

    #[serde(default = "default_codex_model")]
    pub codex_model: String,

    #[serde(default = "default_platform")]
    pub platform: String,

    #[serde(default)]
    pub platform_token: Option<String>,

    #[serde(default)]
    pub platform_url: String,

    #[serde(default)]
    pub context_files: Vec<String>,

    #[serde(default)]
    pub jira_url: Option<String>,

    #[serde(default)]
    pub jira_email: Option<String>,

    #[serde(rename = "jira_api_token", default)]
    pub jira_token: Option<String>,

    #[serde(default)]
    pub jira_project_key: Option<String>,

    #[serde(default = "default_max_diff_chars")]
    pub max_diff_chars: usize,

    pub anthropic_base_url: Option<String>,
    pub openai_base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraSettings {
    pub url: String,
    pub email: String,
    pub token: String,
    pub project_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anthropic_key: None,
            openai_key: None,
            default_provider: default_provider(),
            claude_model: default_claude_model(),
            codex_model: default_codex_model(),
            platform: default_platform(),
            platform_token: None,
            platform_url: String::new(),
            context_files: Vec::new(),
            jira_url: None,
            jira_email: None,
            jira_token: None,
            jira_project_key: None,
            max_diff_chars: default_max_diff_chars(),
            anthropic_base_url: None,
            openai_base_url: None,
        }
    }
}

impl Config {
    /// Defaults, then the YAML file (explicit path or the usual locations),
    /// then the process environment.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match explicit_path {
            Some(path) => Self::from_file(path)?,
            None => match Self::find_config_file() {
                Some(path) => Self::from_file(&path)?,
                None => Config::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.normalize();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    fn find_config_file() -> Option<PathBuf> {
        let local = [".mention-review.yml", ".mention-review.yaml"]
            .into_iter()
            .map(PathBuf::from)
            .find(|p| p.exists());
        if local.is_some() {
            return local;
        }

        dirs::home_dir()
            .map(|home| home.join(".mention-review.yml"))
            .filter(|p| p.exists())
    }

    /// Overrides fields from the environment. For an input `name` the first
    /// non-empty of `INPUT_NAME`, `NAME` and `name` is used.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let input = |name: &str, legacy: &[&str]| -> Option<String> {
            let upper = name.to_uppercase();
            let mut keys = vec![format!("INPUT_{}", upper), upper, name.to_string()];
            keys.extend(legacy.iter().map(|k| k.to_string()));
            keys.iter()
                .filter_map(|key| lookup(key.as_str()))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        if let Some(v) = input("anthropic_api_key", &[]) {
            self.anthropic_key = Some(v);
        }
        if let Some(v) = input("openai_api_key", &[]) {
            self.openai_key = Some(v);
        }
        if let Some(v) = input("default_provider", &[]) {
            self.default_provider = v.to_lowercase();
        }
        if let Some(v) = input("claude_model", &[]) {
            self.claude_model = v;
        }
        if let Some(v) = input("codex_model", &[]) {
            self.codex_model = v;
        }
        if let Some(v) = input("platform", &[]) {
            self.platform = v.to_lowercase();
        }
        if let Some(v) = input("platform_token", &["INPUT_FORGEJO_TOKEN", "FORGEJO_TOKEN"]) {
            self.platform_token = Some(v);
        }
        if let Some(v) = input("platform_url", &["INPUT_FORGEJO_URL", "FORGEJO_URL"]) {
            self.platform_url = v;
        }
        if let Some(v) = input("context_files", &[]) {
            self.context_files = v.split(',').map(str::to_string).collect();
        }
        if let Some(v) = input("jira_url", &[]) {
            self.jira_url = Some(v);
        }
        if let Some(v) = input("jira_email", &[]) {
            self.jira_email = Some(v);
        }
        if let Some(v) = input("jira_api_token", &[]) {
            self.jira_token = Some(v);
        }
        if let Some(v) = input("jira_project_key", &[]) {
            self.jira_project_key = Some(v);
        }
        if let Some(v) = input("max_diff_chars", &[]) {
            match v.parse() {
                Ok(limit) => self.max_diff_chars = limit,
                Err(_) => warn!("Ignoring invalid max_diff_chars value {:?}", v),
            }
        }
        if let Some(v) = input("anthropic_base_url", &[]) {
            self.anthropic_base_url = Some(v);
        }
        if let Some(v) = input("openai_base_url", &[]) {
            self.openai_base_url = Some(v);
        }
    }

    pub fn normalize(&mut self) {
        self.platform_url = self.platform_url.trim_end_matches('/').to_string();
        if let Some(url) = self.jira_url.as_mut() {
            *url = url.trim_end_matches('/').to_string();
        }
        self.context_files = self
            .context_files
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
    }

    /// Ticket lookups are enabled only when url, email and token are all set.
    pub fn jira(&self) -> Option<JiraSettings> {
        let url = self.jira_url.clone().filter(|v| !v.is_empty())?;
        let email = self.jira_email.clone().filter(|v| !v.is_empty())?;
        let token = self.jira_token.clone().filter(|v| !v.is_empty())?;
        Some(JiraSettings {
            url,
            email,
            token,
            project_key: self.jira_project_key.clone().filter(|v| !v.is_empty()),
        })
    }
}

fn default_provider() -> String {
    "claude".to_string()
}

fn default_claude_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_codex_model() -> String {
    "gpt-4o".to_string()
}

fn default_platform() -> String {
    "forgejo".to_string()
}

fn default_max_diff_chars() -> usize {
    DEFAULT_MAX_DIFF_CHARS
}
