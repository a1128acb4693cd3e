use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::core::PrComment;
use crate::platforms::event::{parse_comment_event, CommentContext, WebhookEvent};
use crate::platforms::{InlineComment, PlatformClient, PullRef, PullRequestInfo};

pub struct ForgejoClient {
    client: Client,
    api_url: String,
    token: String,
}

#[derive(Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

#[derive(Serialize)]
struct ReviewRequest<'a> {
    event: &'static str,
    body: &'static str,
    comments: Vec<ReviewRequestComment<'a>>,
}

#[derive(Serialize)]
struct ReviewRequestComment<'a> {
    path: &'a str,
    new_position: u64,
    body: &'a str,
}

#[derive(Serialize)]
struct ReactionBody<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct PullReview {
    id: u64,
}

impl ForgejoClient {
    /// `url` is the instance root; the REST API lives under `/api/v1`.
    pub fn new(url: &str, token: &str) -> Result<Self> {
        if url.trim().is_empty() {
            anyhow::bail!("platform_url is required for the forgejo platform");
        }
        if token.trim().is_empty() {
            anyhow::bail!("platform_token is required for the forgejo platform");
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_url: format!("{}/api/v1", url.trim_end_matches('/')),
            token: token.to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_url, path))
            .header("Authorization", format!("token {}", self.token))
    }

    async fn send(&self, method: Method, path: &str, builder: RequestBuilder) -> Result<Response> {
        debug!("Forgejo {} {}", method, path);
        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to reach Forgejo for {} {}", method, path))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Forgejo API {} {} failed ({}): {}",
                method,
                path,
                status.as_u16(),
                body
            );
        }
        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let builder = self
            .request(Method::GET, path)
            .header("Accept", "application/json");
        self.send(Method::GET, path, builder)
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse Forgejo response for {}", path))
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let builder = self.request(Method::POST, path).json(body);
        self.send(Method::POST, path, builder).await?;
        Ok(())
    }

    fn repo_path(pr: &PullRef) -> String {
        format!("/repos/{}/{}", pr.owner, pr.repo)
    }
}

#[async_trait]
impl PlatformClient for ForgejoClient {
    fn platform_name(&self) -> &str {
        "forgejo"
    }

    fn parse_event_context(
        &self,
        event: &WebhookEvent,
        env: &HashMap<String, String>,
    ) -> Option<CommentContext> {
        parse_comment_event(event, env)
    }

    async fn get_pr_diff(&self, pr: &PullRef) -> Result<String> {
        let path = format!("{}/pulls/{}.diff", Self::repo_path(pr), pr.number);
        let builder = self.request(Method::GET, &path);
        self.send(Method::GET, &path, builder)
            .await?
            .text()
            .await
            .context("Failed to read PR diff")
    }

    async fn get_pr_info(&self, pr: &PullRef) -> Result<PullRequestInfo> {
        let path = format!("{}/pulls/{}", Self::repo_path(pr), pr.number);
        self.get_json(&path).await
    }

    async fn create_comment(&self, pr: &PullRef, body: &str) -> Result<()> {
        let path = format!("{}/issues/{}/comments", Self::repo_path(pr), pr.number);
        self.post_json(&path, &CommentBody { body }).await
    }

    async fn create_review_comment(&self, pr: &PullRef, comment: &InlineComment) -> Result<()> {
        let path = format!("{}/pulls/{}/reviews", Self::repo_path(pr), pr.number);
        let review = ReviewRequest {
            event: "COMMENT",
            body: "",
            comments: vec![ReviewRequestComment {
                path: &comment.path,
                new_position: comment.line,
                body: &comment.body,
            }],
        };
        self.post_json(&path, &review).await
    }

    async fn add_reaction(&self, pr: &PullRef, comment_id: u64, reaction: &str) -> Result<()> {
        let path = format!("{}/issues/comments/{}/reactions", Self::repo_path(pr), comment_id);
        self.post_json(&path, &ReactionBody { content: reaction }).await
    }

    async fn get_review_comments(&self, pr: &PullRef) -> Result<Vec<PrComment>> {
        let reviews_path = format!("{}/pulls/{}/reviews", Self::repo_path(pr), pr.number);
        let reviews: Vec<PullReview> = self.get_json(&reviews_path).await?;

        let mut comments = Vec::new();
        for review in reviews {
            let path = format!("{}/{}/comments", reviews_path, review.id);
            let mut batch: Vec<PrComment> = self.get_json(&path).await?;
            comments.append(&mut batch);
        }
        Ok(comments)
    }
}
