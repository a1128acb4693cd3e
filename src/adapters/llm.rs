use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::core::prompt::{
    build_follow_up_message, build_review_prompt, build_user_message, FOLLOWUP_PROMPT,
};

pub const DEFAULT_MAX_TOKENS: usize = 4096;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_name: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: "gpt-4o".to_string(),
            api_key: None,
            base_url: None,
            temperature: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMRequest {
    pub system_prompt: String,
    pub user_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub model: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// An LLM backend that can answer review requests. Implementations supply the
/// transport (`complete`); prompt assembly is shared.
#[async_trait]
pub trait ReviewProvider: Send + Sync {
    /// Registry name, e.g. `claude`.
    fn name(&self) -> &str;

    /// Label used in posted comments, e.g. `🧠 Claude`.
    fn display_name(&self) -> &str;

    fn model_name(&self) -> &str;

    /// Fails when credentials this provider needs are missing.
    fn validate_config(&self) -> Result<()>;

    async fn complete(&self, request: LLMRequest) -> Result<LLMResponse>;

    /// Asks for a JSON review of the annotated diff; the answer may be fenced.
    async fn review(
        &self,
        diff: &str,
        user_message: Option<&str>,
        context: Option<&str>,
        ticket_description: Option<&str>,
    ) -> Result<String> {
        self.validate_config()?;
        let request = LLMRequest {
            system_prompt: build_review_prompt(ticket_description),
            user_prompt: build_user_message(diff, user_message, context),
        };
        let response = self.complete(request).await?;
        log_usage(self.name(), &response);
        Ok(response.content)
    }

    /// Asks for a plain markdown answer to a reply in a review thread.
    async fn follow_up(
        &self,
        diff: &str,
        thread_history: &str,
        user_message: &str,
        context: Option<&str>,
    ) -> Result<String> {
        self.validate_config()?;
        let request = LLMRequest {
            system_prompt: FOLLOWUP_PROMPT.to_string(),
            user_prompt: build_follow_up_message(diff, thread_history, user_message, context),
        };
        let response = self.complete(request).await?;
        log_usage(self.name(), &response);
        Ok(response.content)
    }
}

fn log_usage(provider: &str, response: &LLMResponse) {
    if let Some(usage) = &response.usage {
        tracing::debug!(
            "{} ({}) used {} prompt + {} completion tokens",
            provider,
            response.model,
            usage.prompt_tokens,
            usage.completion_tokens
        );
    }
}

const MAX_RETRIES: usize = 2;
const BASE_DELAY_MS: u64 = 250;

/// Sends a request, retrying transport errors and 429/5xx responses with a
/// linear back-off. `api` names the service in the final error.
pub(crate) async fn send_with_retry<F>(api: &str, mut make_request: F) -> Result<reqwest::Response>
where
    F: FnMut() -> reqwest::RequestBuilder,
{
    for attempt in 0..=MAX_RETRIES {
        match make_request().send().await {
            Ok(response) => {
                if response.status().is_success() {
                    return Ok(response);
                }

                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                if is_retryable_status(status) && attempt < MAX_RETRIES {
                    tracing::warn!("{} returned {}, retrying", api, status);
                    sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1))).await;
                    continue;
                }

                anyhow::bail!("{} API error ({}): {}", api, status.as_u16(), body);
            }
            Err(err) => {
                if attempt < MAX_RETRIES {
                    sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1))).await;
                    continue;
                }
                return Err(err.into());
            }
        }
    }

    anyhow::bail!("{} request failed after retries", api);
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
