use crate::adapters::llm::{
    send_with_retry, LLMRequest, LLMResponse, ModelConfig, ReviewProvider, Usage,
};
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

pub struct ClaudeProvider {
    client: Client,
    config: ModelConfig,
    base_url: String,
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    system: String,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<Content>,
    #[serde(default)]
    model: String,
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    text: String,
    #[serde(rename = "type", default)]
    content_type: String,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: usize,
    output_tokens: usize,
}

impl ClaudeProvider {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
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
            model_name: config.claude_model.clone(),
            api_key: config.anthropic_key.clone(),
            base_url: config.anthropic_base_url.clone(),
            ..ModelConfig::default()
        })
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .context("anthropic_api_key is required to use Claude")
    }
}

#[async_trait]
impl ReviewProvider for ClaudeProvider {
    fn name(&self) -> &str {
        "claude"
    }

    fn display_name(&self) -> &str {
        "🧠 Claude"
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }

    fn validate_config(&self) -> Result<()> {
        self.api_key().map(|_| ())
    }

    async fn complete(&self, request: LLMRequest) -> Result<LLMResponse> {
        let api_key = self.api_key()?;
        let anthropic_request = AnthropicRequest {
            model: self.config.model_name.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.user_prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system: request.system_prompt,
        };

        let url = format!("{}/messages", self.base_url);
        let response = send_with_retry("Claude", || {
            self.client
                .post(&url)
                .header("x-api-key", api_key)
                .header("anthropic-version", "2023-06-01")
                .header("Content-Type", "application/json")
                .json(&anthropic_request)
        })
        .await
        .context("Failed to send request to Anthropic")?;

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        let content = anthropic_response
            .content
            .iter()
            .find(|c| c.content_type == "text")
            .map(|c| c.text.clone())
            .context("Anthropic response contained no text content")?;

        Ok(LLMResponse {
            content,
            model: anthropic_response.model,
            usage: anthropic_response.usage.map(|u| Usage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn provider(base_url: &str, api_key: Option<&str>) -> ClaudeProvider {
        ClaudeProvider::new(ModelConfig {
            model_name: "claude-sonnet-4-5-20250929".to_string(),
            api_key: api_key.map(str::to_string),
            base_url: Some(base_url.to_string()),
            ..ModelConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn review_sends_context_and_diff() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", "2023-06-01")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({
                    "model": "claude-sonnet-4-5-20250929",
                    "max_tokens": 4096
                })),
                Matcher::Regex(r"Project Context:\\n\\nARCH\.md content".to_string()),
                Matcher::Regex(r"Pull Request Diff:\\n```\\ndiff body\\n```".to_string()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "content": [{"type": "text", "text": "{\"summary\":\"ok\",\"comments\":[]}"}],
                    "model": "claude-sonnet-4-5-20250929",
                    "usage": {"input_tokens": 10, "output_tokens": 5}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let raw = provider(&server.url(), Some("test-key"))
            .review("diff body", Some("please focus on tests"), Some("ARCH.md content"), None)
            .await
            .unwrap();

        assert_eq!(raw, "{\"summary\":\"ok\",\"comments\":[]}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let err = provider("http://127.0.0.1:9", None)
            .review("diff", Some("msg"), Some("ctx"), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("anthropic_api_key is required"));
    }

    #[tokio::test]
    async fn client_errors_are_reported_with_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(401)
            .with_body("invalid x-api-key")
            .create_async()
            .await;

        let err = provider(&server.url(), Some("bad"))
            .follow_up("diff", "thread", "why?", None)
            .await
            .unwrap_err();
        let chain = format!("{:#}", err);
        assert!(chain.contains("Claude API error (401): invalid x-api-key"));
    }
}
