use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use crate::adapters::llm::{send_with_retry, LLMRequest, LLMResponse, ModelConfig, ReviewProvider, Usage};
use crate::config::Config;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct CodexProvider {
    client: Client,
    config: ModelConfig,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
    usage: Option<OpenAIUsage>,
    #[serde(default)]
    model: String,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

impl CodexProvider {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let base_url = config.base_url.clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(ModelConfig {
            model_name: config.codex_model.clone(),
            api_key: config.openai_key.clone(),
            base_url: config.openai_base_url.clone(),
            temperature: Some(0.2),
            ..ModelConfig::default()
        })
    }

    fn api_key(&self) -> Result<&str> {
        self.config.api_key.as_deref()
            .filter(|k| !k.is_empty())
            .context("openai_api_key is required to use Codex")
    }
}

#[async_trait]
impl ReviewProvider for CodexProvider {
    fn name(&self) -> &str {
        "codex"
    }

    fn display_name(&self) -> &str {
        "🤖 Codex"
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }

    fn validate_config(&self) -> Result<()> {
        self.api_key().map(|_| ())
    }

    async fn complete(&self, request: LLMRequest) -> Result<LLMResponse> {
        let api_key = self.api_key()?;
        let messages = vec![
            Message {
                role: "system".to_string(),
                content: Some(request.system_prompt),
            },
            Message {
                role: "user".to_string(),
                content: Some(request.user_prompt),
            },
        ];

        let openai_request = OpenAIRequest {
            model: self.config.model_name.clone(),
            messages,
            temperature: self.config.temperature.unwrap_or(0.2),
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = send_with_retry("OpenAI", || {
            self.client
                .post(&url)
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&openai_request)
        })
        .await
        .context("Failed to send request to OpenAI")?;

        let openai_response: OpenAIResponse = response.json().await
            .context("Failed to parse OpenAI response")?;

        let content = openai_response.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("OpenAI response contained no message content")?;

        Ok(LLMResponse {
            content,
            model: openai_response.model,
            usage: openai_response.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}
