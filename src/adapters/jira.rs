use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::JiraSettings;

/// Where ticket descriptions for acceptance-criteria checks come from.
#[async_trait]
pub trait TicketSource: Send + Sync {
    async fn ticket_description(&self, ticket_key: &str) -> Result<String>;
}

pub struct JiraClient {
    client: Client,
    base_url: String,
    email: String,
    token: String,
}

#[derive(Debug, Deserialize)]
pub struct JiraIssue {
    #[serde(default)]
    pub fields: JiraFields,
}

#[derive(Debug, Default, Deserialize)]
pub struct JiraFields {
    #[serde(default)]
    pub description: Option<String>,
}

impl JiraClient {
    pub fn new(settings: &JiraSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            email: settings.email.clone(),
            token: settings.token.clone(),
        })
    }

    pub async fn get_issue(&self, ticket_key: &str) -> Result<JiraIssue> {
        let url = format!("{}/rest/api/2/issue/{}", self.base_url, ticket_key);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.email, Some(&self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to reach Jira for {}", ticket_key))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Jira API error ({}): Failed to fetch {}",
                response.status().as_u16(),
                ticket_key
            );
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse Jira issue {}", ticket_key))
    }
}

#[async_trait]
impl TicketSource for JiraClient {
    async fn ticket_description(&self, ticket_key: &str) -> Result<String> {
        let issue = self.get_issue(ticket_key).await?;
        Ok(issue.fields.description.unwrap_or_default())
    }
}
