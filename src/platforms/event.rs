use serde::Deserialize;
use std::collections::HashMap;

use crate::core::PrComment;
use crate::platforms::PullRef;

/// The subset of an `issue_comment` / `pull_request_review_comment` webhook
/// payload the reviewer reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub issue: Option<EventIssue>,
    #[serde(default)]
    pub pull_request: Option<EventPullRequest>,
    #[serde(default)]
    pub comment: Option<PrComment>,
    #[serde(default)]
    pub repository: Option<EventRepository>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventIssue {
    #[serde(default)]
    pub number: Option<u64>,
    /// Present only when the issue is a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPullRequest {
    #[serde(default)]
    pub number: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventRepository {
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentContext {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
    pub comment: PrComment,
}

impl CommentContext {
    pub fn pull_ref(&self) -> PullRef {
        PullRef {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            number: self.pr_number,
        }
    }

    /// Path and diff line when the comment was left inside a review thread.
    pub fn thread_anchor(&self) -> Option<(&str, u64)> {
        match (self.comment.path.as_deref(), self.comment.position) {
            (Some(path), Some(line)) if !path.is_empty() => Some((path, line)),
            _ => None,
        }
    }
}

/// Resolves the pull request and comment an event refers to. The repository
/// comes from `GITHUB_REPOSITORY` when set, otherwise from the payload.
pub fn parse_comment_event(
    event: &WebhookEvent,
    env: &HashMap<String, String>,
) -> Option<CommentContext> {
    let on_issue_pr = event
        .issue
        .as_ref()
        .map_or(false, |issue| issue.pull_request.is_some());
    if !on_issue_pr && event.pull_request.is_none() {
        return None;
    }

    let comment = event.comment.clone()?;

    let full_name = env
        .get("GITHUB_REPOSITORY")
        .filter(|v| !v.is_empty())
        .cloned()
        .or_else(|| event.repository.as_ref()?.full_name.clone())?;
    let (owner, repo) = full_name.split_once('/')?;
    if owner.is_empty() || repo.is_empty() {
        return None;
    }

    let pr_number = event
        .issue
        .as_ref()
        .and_then(|issue| issue.number)
        .or_else(|| event.pull_request.as_ref()?.number)?;

    Some(CommentContext {
        owner: owner.to_string(),
        repo: repo.to_string(),
        pr_number,
        comment,
    })
}
