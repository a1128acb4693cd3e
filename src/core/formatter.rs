use crate::core::context::ContextFileStatus;
use crate::core::review::{
    AcceptanceCriterion, CriterionStatus, InlinePosting, Review, ReviewComment, Severity,
};

pub const GENERIC_ICON: &str = "💬";

pub fn severity_icon(severity: Option<&str>) -> &'static str {
    match severity.and_then(Severity::from_label) {
        Some(Severity::Critical) => "🔴",
        Some(Severity::Warning) => "🟡",
        Some(Severity::Suggestion) => "🔵",
        Some(Severity::Praise) => "🟢",
        None => GENERIC_ICON,
    }
}

/// Body of an inline comment; the heading is what thread detection keys on.
pub fn format_inline_comment(comment: &ReviewComment) -> String {
    let label = comment
        .severity
        .as_deref()
        .map(str::to_uppercase)
        .unwrap_or_else(|| "UNKNOWN".to_string());
    format!(
        "{} **{}**: {}",
        severity_icon(comment.severity.as_deref()),
        label,
        comment.message
    )
}

pub fn format_fallback_comment(comment: &ReviewComment) -> String {
    let line = comment
        .line
        .map(|l| l.to_string())
        .unwrap_or_else(|| "?".to_string());
    format!(
        "{} **`{}:{}`** — {}",
        severity_icon(comment.severity.as_deref()),
        comment.path,
        line,
        comment.message
    )
}

pub struct SummaryInput<'a> {
    pub provider_name: &'a str,
    pub review: &'a Review,
    pub trigger_user: &'a str,
    pub inline: &'a InlinePosting,
    pub context_files: Option<&'a ContextFileStatus>,
    pub acceptance_criteria: &'a [AcceptanceCriterion],
    pub jira_ticket: Option<&'a str>,
}

pub fn build_summary_comment(input: &SummaryInput<'_>) -> String {
    let mut body = format!(
        "### {} Code Review\n\n{}\n\n",
        input.provider_name, input.review.summary
    );

    let comments = input.review.comments();
    if comments.is_empty() {
        body.push_str("✅ No issues found. The code looks good!\n");
    } else {
        body.push_str(&format!("**Found {} comment(s):**\n\n", comments.len()));
        for (index, comment) in comments.iter().enumerate() {
            if !input.inline.is_posted(index) {
                body.push_str(&format_fallback_comment(comment));
                body.push_str("\n\n");
            }
        }
        if input.inline.count() > 0 {
            body.push_str(&format!(
                "\n_{} inline comment(s) posted on the diff._\n",
                input.inline.count()
            ));
        }
    }

    body.push_str(&format_acceptance_criteria(
        input.acceptance_criteria,
        input.jira_ticket,
    ));
    body.push_str(&format_context_files(input.context_files));

    body.push_str(&format!(
        "\n---\n_Triggered by @{} • Provider: {}_",
        input.trigger_user, input.provider_name
    ));
    body
}

fn format_acceptance_criteria(criteria: &[AcceptanceCriterion], ticket: Option<&str>) -> String {
    if criteria.is_empty() {
        return String::new();
    }

    let mut section = String::from("\n**Acceptance Criteria**");
    if let Some(ticket) = ticket {
        section.push_str(&format!(" (`{}`)", ticket));
    }
    section.push_str("\n\n");

    for criterion in criteria {
        let icon = match criterion.status {
            CriterionStatus::Met => "✅",
            CriterionStatus::NotMet => "❌",
            CriterionStatus::Unclear => "❓",
        };
        section.push_str(&format!("- {} {}", icon, criterion.criterion));
        if let Some(comment) = criterion.comment.as_deref().filter(|c| !c.is_empty()) {
            section.push_str(&format!(" — {}", comment));
        }
        section.push('\n');
    }
    section
}

fn format_context_files(status: Option<&ContextFileStatus>) -> String {
    let status = match status {
        Some(status) if !status.requested_files.is_empty() => status,
        _ => return "\n_No Context Files included._\n".to_string(),
    };

    format!(
        "\n**Context Files**\n- Requested: {}\n- Included ({}): {}\n- Could not include ({}): {}\n",
        file_list(&status.requested_files),
        status.included_files.len(),
        file_list(&status.included_files),
        status.missing_files.len(),
        file_list(&status.missing_files),
    )
}

fn file_list(files: &[String]) -> String {
    if files.is_empty() {
        return "none".to_string();
    }
    files
        .iter()
        .map(|f| format!("`{}`", f))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_follow_up_reply(provider_name: &str, response_text: &str) -> String {
    format!("{}\n\n---\n_— {}_", response_text, provider_name)
}

/// Posted instead of a summary when the provider answer is not a JSON review.
pub fn build_raw_fallback_comment(provider: &str, raw_response: &str) -> String {
    format!("### 🤖 AI Code Review ({})\n\n{}", provider, raw_response)
}

pub fn build_empty_diff_reply(trigger_user: &str) -> String {
    format!(
        "👀 @{} I couldn't find any code changes to review in this PR.",
        trigger_user
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(path: &str, line: u64, severity: &str, message: &str) -> ReviewComment {
        ReviewComment {
            path: path.to_string(),
            line: Some(line),
            severity: Some(severity.to_string()),
            message: message.to_string(),
        }
    }

    fn review(summary: &str, comments: Option<Vec<ReviewComment>>) -> Review {
        Review {
            summary: summary.to_string(),
            comments,
            acceptance_criteria: None,
        }
    }

    fn summary_for(review: &Review, inline: &InlinePosting, context: Option<&ContextFileStatus>) -> String {
        build_summary_comment(&SummaryInput {
            provider_name: "Claude",
            review,
            trigger_user: "alice",
            inline,
            context_files: context,
            acceptance_criteria: review.acceptance_criteria(),
            jira_ticket: None,
        })
    }

    #[test]
    fn icons_per_severity() {
        assert_eq!(severity_icon(Some("critical")), "\u{1F534}");
        assert_eq!(severity_icon(Some("warning")), "\u{1F7E1}");
        assert_eq!(severity_icon(Some("suggestion")), "\u{1F535}");
        assert_eq!(severity_icon(Some("praise")), "\u{1F7E2}");
        assert_eq!(severity_icon(Some("unknown")), "\u{1F4AC}");
        assert_eq!(severity_icon(None), "\u{1F4AC}");
    }

    #[test]
    fn inline_comment_format() {
        let c = comment("a.rs", 1, "warning", "Check this");
        assert_eq!(format_inline_comment(&c), "🟡 **WARNING**: Check this");
    }

    #[test]
    fn inline_comment_without_severity() {
        let c = ReviewComment {
            message: "Something".to_string(),
            ..Default::default()
        };
        assert_eq!(format_inline_comment(&c), "💬 **UNKNOWN**: Something");
    }

    #[test]
    fn inline_comment_is_recognised_as_ai_comment() {
        let c = comment("a.rs", 1, "praise", "Nice");
        assert!(crate::core::conversation::is_ai_review_comment(&format_inline_comment(&c)));
    }

    #[test]
    fn fallback_comment_format() {
        let c = comment("src/foo.js", 42, "critical", "Bug here");
        assert_eq!(format_fallback_comment(&c), "🔴 **`src/foo.js:42`** — Bug here");
    }

    #[test]
    fn summary_without_comments() {
        let review = review("LGTM", Some(vec![]));
        let body = summary_for(&review, &InlinePosting::new(), None);
        assert!(body.starts_with("### Claude Code Review\n\nLGTM\n\n"));
        assert!(body.contains("No issues found"));
        assert!(body.contains("No Context Files included"));
        assert!(body.ends_with("\n---\n_Triggered by @alice • Provider: Claude_"));
    }

    #[test]
    fn summary_treats_missing_comments_as_none() {
        let review = review("LGTM", None);
        let body = summary_for(&review, &InlinePosting::new(), None);
        assert!(body.contains("No issues found"));
    }

    #[test]
    fn summary_lists_every_comment_when_nothing_posted_inline() {
        let review = review("Found issues", Some(vec![comment("a.js", 1, "warning", "Bad")]));
        let body = summary_for(&review, &InlinePosting::new(), None);
        assert!(body.contains("**Found 1 comment(s):**\n\n🟡 **`a.js:1`** — Bad\n\n"));
        assert!(!body.contains("inline comment(s) posted"));
    }

    #[test]
    fn summary_omits_inline_posted_comments() {
        let review = review(
            "Review",
            Some(vec![
                comment("a.js", 1, "warning", "x"),
                comment("b.js", 2, "critical", "y"),
            ]),
        );
        let inline: InlinePosting = [0].into_iter().collect();
        let body = summary_for(&review, &inline, None);

        assert!(body.contains("**Found 2 comment(s):**"));
        assert!(body.contains("b.js:2"));
        assert!(!body.contains("a.js:1"));
        assert!(body.contains("\n_1 inline comment(s) posted on the diff._\n"));
    }

    #[test]
    fn summary_with_context_files() {
        let status = ContextFileStatus {
            requested_files: vec!["ARCH.md".into(), "MISSING.md".into()],
            included_files: vec!["ARCH.md".into()],
            missing_files: vec!["MISSING.md".into()],
        };
        let review = review("LGTM", Some(vec![]));
        let body = summary_for(&review, &InlinePosting::new(), Some(&status));

        assert!(body.contains("**Context Files**"));
        assert!(body.contains("Requested: `ARCH.md`, `MISSING.md`"));
        assert!(body.contains("Included (1): `ARCH.md`"));
        assert!(body.contains("Could not include (1): `MISSING.md`"));
        assert!(!body.contains("No Context Files included"));
    }

    #[test]
    fn summary_with_empty_context_request() {
        let review = review("LGTM", Some(vec![]));
        let body = summary_for(&review, &InlinePosting::new(), Some(&ContextFileStatus::default()));
        assert!(body.contains("No Context Files included"));
    }

    #[test]
    fn acceptance_criteria_section() {
        let mut review = review("Done", Some(vec![]));
        review.acceptance_criteria = Some(vec![
            AcceptanceCriterion {
                criterion: "Login form".into(),
                status: CriterionStatus::Met,
                comment: Some("present".into()),
            },
            AcceptanceCriterion {
                criterion: "Password reset".into(),
                status: CriterionStatus::NotMet,
                comment: None,
            },
        ]);
        let body = build_summary_comment(&SummaryInput {
            provider_name: "Claude",
            review: &review,
            trigger_user: "bob",
            inline: &InlinePosting::new(),
            context_files: None,
            acceptance_criteria: review.acceptance_criteria(),
            jira_ticket: Some("PROJ-7"),
        });

        assert!(body.contains("**Acceptance Criteria** (`PROJ-7`)"));
        assert!(body.contains("- ✅ Login form — present\n"));
        assert!(body.contains("- ❌ Password reset\n"));
        let criteria_at = body.find("Acceptance Criteria").unwrap();
        let context_at = body.find("No Context Files").unwrap();
        assert!(criteria_at < context_at);
    }

    #[test]
    fn no_acceptance_section_without_criteria() {
        let review = review("Done", Some(vec![]));
        let body = summary_for(&review, &InlinePosting::new(), None);
        assert!(!body.contains("Acceptance Criteria"));
    }

    #[test]
    fn follow_up_reply_puts_footer_last() {
        let reply = build_follow_up_reply("🤖 Codex", "My answer");
        assert_eq!(reply, "My answer\n\n---\n_— 🤖 Codex_");
    }

    #[test]
    fn raw_fallback_and_empty_diff_bodies() {
        assert_eq!(
            build_raw_fallback_comment("claude", "plain text"),
            "### 🤖 AI Code Review (claude)\n\nplain text"
        );
        assert!(build_empty_diff_reply("dave").starts_with("👀 @dave "));
    }
}
