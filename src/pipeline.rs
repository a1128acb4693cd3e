use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::adapters::TicketSource;
use crate::config::Config;
use crate::core::conversation::{build_thread_from_comments, thread_has_ai_comment};
use crate::core::formatter::{
    build_empty_diff_reply, build_follow_up_reply, build_raw_fallback_comment,
    build_summary_comment, format_inline_comment, SummaryInput,
};
use crate::core::ticket::extract_ticket_key;
use crate::core::{
    annotate_diff, parse_review_response, truncate_diff, ContextFetcher, InlinePosting,
    LoadedContext, Trigger, TriggerDetector,
};
use crate::platforms::{CommentContext, InlineComment, PlatformClient, PullRef, WebhookEvent};
use crate::registry::ProviderRegistry;

/// What handling one event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(String),
    EmptyDiff,
    Reviewed { comments: usize, inline_posted: usize },
    RawFallback,
    FollowUp,
}

struct TicketContext {
    key: String,
    description: String,
}

pub struct Pipeline {
    config: Config,
    platform: Box<dyn PlatformClient>,
    providers: ProviderRegistry,
    tickets: Option<Box<dyn TicketSource>>,
    detector: TriggerDetector,
    context: ContextFetcher,
}

impl Pipeline {
    pub fn new(
        config: Config,
        platform: Box<dyn PlatformClient>,
        providers: ProviderRegistry,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        let detector = TriggerDetector::new(providers.names());
        Self {
            config,
            platform,
            providers,
            tickets: None,
            detector,
            context: ContextFetcher::new(work_dir),
        }
    }

    pub fn with_ticket_source(mut self, tickets: Box<dyn TicketSource>) -> Self {
        self.tickets = Some(tickets);
        self
    }

    pub async fn handle_event(
        &self,
        event: &WebhookEvent,
        env: &HashMap<String, String>,
    ) -> Result<Outcome> {
        let ctx = match self.platform.parse_event_context(event, env) {
            Some(ctx) => ctx,
            None => return Ok(skip("Not a PR comment event")),
        };

        let trigger = match self.detector.detect(&ctx.comment.body) {
            Some(trigger) => trigger,
            None => return Ok(skip("No provider mention found")),
        };

        match ctx.thread_anchor() {
            Some((path, line)) => self.handle_follow_up(&ctx, trigger, path, line).await,
            None => self.handle_review(&ctx, trigger).await,
        }
    }

    async fn handle_review(&self, ctx: &CommentContext, trigger: Trigger) -> Result<Outcome> {
        let pr = ctx.pull_ref();
        info!("Triggered by @{} in comment #{} on {}", trigger.provider, ctx.comment.id, pr);
        self.react(&pr, ctx.comment.id, "eyes").await;

        info!("Fetching diff for {}", pr);
        let raw_diff = self.platform.get_pr_diff(&pr).await?;
        if raw_diff.trim().is_empty() {
            self.platform
                .create_comment(&pr, &build_empty_diff_reply(&ctx.comment.user.login))
                .await?;
            return Ok(Outcome::EmptyDiff);
        }
        let diff = self.prepare_diff(&raw_diff);
        let loaded = self.context.load(&self.config.context_files).await;
        let ticket = self.ticket_context(&pr).await?;

        let provider = self.providers.create(&trigger.provider, &self.config)?;
        info!("Calling {} ({}) for review", provider.name(), provider.model_name());
        let raw = provider
            .review(
                &diff,
                non_empty(&trigger.message),
                context_text(&loaded),
                ticket.as_ref().map(|t| t.description.as_str()),
            )
            .await
            .with_context(|| format!("{} review failed", provider.name()))?;

        let review = match parse_review_response(&raw) {
            Ok(review) => review,
            Err(err) => {
                warn!("Failed to parse AI response ({}), posting as plain comment", err);
                self.platform
                    .create_comment(&pr, &build_raw_fallback_comment(provider.name(), &raw))
                    .await?;
                self.react(&pr, ctx.comment.id, "rocket").await;
                return Ok(Outcome::RawFallback);
            }
        };

        let inline = self.post_inline_comments(&pr, &review).await;

        let summary = build_summary_comment(&SummaryInput {
            provider_name: provider.display_name(),
            review: &review,
            trigger_user: &ctx.comment.user.login,
            inline: &inline,
            context_files: Some(&loaded.status),
            acceptance_criteria: review.acceptance_criteria(),
            jira_ticket: ticket.as_ref().map(|t| t.key.as_str()),
        });
        self.platform.create_comment(&pr, &summary).await?;
        self.react(&pr, ctx.comment.id, "rocket").await;

        info!(
            "Review complete: {} comment(s), {} inline",
            review.comments().len(),
            inline.count()
        );
        Ok(Outcome::Reviewed {
            comments: review.comments().len(),
            inline_posted: inline.count(),
        })
    }

    async fn handle_follow_up(
        &self,
        ctx: &CommentContext,
        trigger: Trigger,
        path: &str,
        line: u64,
    ) -> Result<Outcome> {
        let pr = ctx.pull_ref();
        let comments = self.platform.get_review_comments(&pr).await?;
        if !thread_has_ai_comment(&comments, path, line) {
            return Ok(skip("Thread has no AI review comment"));
        }

        info!("Follow-up for {}:{} on {} via {}", path, line, pr, trigger.provider);
        self.react(&pr, ctx.comment.id, "eyes").await;

        let raw_diff = self.platform.get_pr_diff(&pr).await?;
        let diff = self.prepare_diff(&raw_diff);
        let loaded = self.context.load(&self.config.context_files).await;
        let thread = build_thread_from_comments(&comments, path, line, ctx.comment.id);

        let provider = self.providers.create(&trigger.provider, &self.config)?;
        let answer = provider
            .follow_up(&diff, &thread, &trigger.message, context_text(&loaded))
            .await
            .with_context(|| format!("{} follow-up failed", provider.name()))?;

        let reply = InlineComment {
            body: build_follow_up_reply(provider.display_name(), &answer),
            path: path.to_string(),
            line,
        };
        self.platform.create_review_comment(&pr, &reply).await?;
        self.react(&pr, ctx.comment.id, "rocket").await;

        info!("Follow-up reply posted");
        Ok(Outcome::FollowUp)
    }

    fn prepare_diff(&self, raw_diff: &str) -> String {
        let annotated = annotate_diff(raw_diff);
        debug!("Annotated diff is {} chars", annotated.chars().count());
        truncate_diff(&annotated, self.config.max_diff_chars)
    }

    /// Posts each comment in order; failures only leave the index unmarked so
    /// the comment shows up in the summary instead.
    async fn post_inline_comments(
        &self,
        pr: &PullRef,
        review: &crate::core::Review,
    ) -> InlinePosting {
        let mut inline = InlinePosting::new();
        for (index, comment) in review.comments().iter().enumerate() {
            let line = match comment.line {
                Some(line) => line,
                None => continue,
            };
            let inline_comment = InlineComment {
                body: format_inline_comment(comment),
                path: comment.path.clone(),
                line,
            };
            match self.platform.create_review_comment(pr, &inline_comment).await {
                Ok(()) => inline.mark_posted(index),
                Err(err) => warn!("Inline comment on {}:{} failed: {:#}", comment.path, line, err),
            }
        }
        inline
    }

    async fn ticket_context(&self, pr: &PullRef) -> Result<Option<TicketContext>> {
        let tickets = match self.tickets.as_ref() {
            Some(tickets) => tickets,
            None => return Ok(None),
        };

        let info = self.platform.get_pr_info(pr).await?;
        let prefix = self.config.jira_project_key.as_deref();
        let key = match extract_ticket_key(&info.title, prefix)
            .or_else(|| extract_ticket_key(info.branch(), prefix))
        {
            Some(key) => key,
            None => {
                debug!("No ticket key in PR title or branch");
                return Ok(None);
            }
        };

        match tickets.ticket_description(&key).await {
            Ok(description) if !description.trim().is_empty() => {
                info!("Checking acceptance criteria from {}", key);
                Ok(Some(TicketContext { key, description }))
            }
            Ok(_) => {
                debug!("Ticket {} has no description", key);
                Ok(None)
            }
            Err(err) => {
                warn!("Could not fetch ticket {}: {:#}", key, err);
                Ok(None)
            }
        }
    }

    async fn react(&self, pr: &PullRef, comment_id: u64, reaction: &str) {
        if let Err(err) = self.platform.add_reaction(pr, comment_id, reaction).await {
            warn!("Could not add {} reaction: {:#}", reaction, err);
        }
    }
}

fn skip(reason: &str) -> Outcome {
    info!("{}, skipping", reason);
    Outcome::Skipped(reason.to_string())
}

fn non_empty(text: &str) -> Option<&str> {
    Some(text).filter(|t| !t.trim().is_empty())
}

fn context_text(loaded: &LoadedContext) -> Option<&str> {
    non_empty(&loaded.content)
}
