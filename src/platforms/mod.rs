pub mod event;
pub mod forgejo;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::PrComment;

pub use event::{CommentContext, WebhookEvent};
pub use forgejo::ForgejoClient;

/// Identifies one pull request on a platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl std::fmt::Display for PullRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref", default)]
    pub ref_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PullRequestInfo {
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub head: Option<BranchRef>,
}

impl PullRequestInfo {
    pub fn branch(&self) -> &str {
        self.head.as_ref().map(|h| h.ref_name.as_str()).unwrap_or("")
    }
}

/// A comment anchored to a line of the pull-request diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineComment {
    pub body: String,
    pub path: String,
    pub line: u64,
}

/// Everything the review pipeline needs from a code-hosting platform.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    fn platform_name(&self) -> &str;

    /// Extracts the triggering comment and its pull request, or `None` when
    /// the event is not a comment on a pull request.
    fn parse_event_context(
        &self,
        event: &WebhookEvent,
        env: &HashMap<String, String>,
    ) -> Option<CommentContext>;

    async fn get_pr_diff(&self, pr: &PullRef) -> Result<String>;
    async fn get_pr_info(&self, pr: &PullRef) -> Result<PullRequestInfo>;
    async fn create_comment(&self, pr: &PullRef, body: &str) -> Result<()>;
    async fn create_review_comment(&self, pr: &PullRef, comment: &InlineComment) -> Result<()>;
    async fn add_reaction(&self, pr: &PullRef, comment_id: u64, reaction: &str) -> Result<()>;
    /// All inline review comments on the pull request, across every review.
    async fn get_review_comments(&self, pr: &PullRef) -> Result<Vec<PrComment>>;
}
