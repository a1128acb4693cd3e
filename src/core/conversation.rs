use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Matches the heading every inline review comment posted by this bot starts with.
static AI_INLINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:🔴|🟡|🔵|🟢) \*\*(CRITICAL|WARNING|SUGGESTION|PRAISE)\*\*:").unwrap()
});

pub const MAX_THREAD_ENTRIES: usize = 10;
pub const AI_REVIEWER_LABEL: &str = "AI Reviewer";
const ENTRY_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentUser {
    #[serde(default)]
    pub login: String,
}

/// A pull-request comment: the one that triggered a run, or an entry of the
/// platform's review-comment listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrComment {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub path: Option<String>,
    /// Line in the diff the comment is anchored to.
    #[serde(default)]
    pub position: Option<u64>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub user: CommentUser,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub pull_request_review_id: Option<u64>,
}

impl PrComment {
    fn is_at(&self, path: &str, line: u64) -> bool {
        self.path.as_deref() == Some(path) && self.position == Some(line)
    }

    fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.created_at).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadEntry {
    pub label: String,
    pub body: String,
    pub timestamp: String,
}

impl ThreadEntry {
    fn render(&self) -> String {
        format!("**{}:**\n{}", self.label, self.body)
    }
}

pub fn is_ai_review_comment(body: &str) -> bool {
    AI_INLINE_PATTERN.is_match(body)
}

pub fn find_thread_ai_comment<'a>(
    comments: &'a [PrComment],
    path: &str,
    line: u64,
) -> Option<&'a PrComment> {
    comments
        .iter()
        .find(|c| c.is_at(path, line) && is_ai_review_comment(&c.body))
}

/// True when the thread at `(path, line)` already holds a comment this bot
/// posted. Replies in any other thread are never answered.
pub fn thread_has_ai_comment(comments: &[PrComment], path: &str, line: u64) -> bool {
    find_thread_ai_comment(comments, path, line).is_some()
}

/// Chronological history of the thread at `(path, line)`, without the
/// comment being answered, capped at the latest [`MAX_THREAD_ENTRIES`].
/// Comments whose timestamp does not parse sort before all others.
pub fn thread_entries(
    comments: &[PrComment],
    path: &str,
    line: u64,
    exclude_id: u64,
) -> Vec<ThreadEntry> {
    let mut thread: Vec<&PrComment> = comments
        .iter()
        .filter(|c| c.is_at(path, line) && c.id != exclude_id)
        .collect();
    thread.sort_by_key(|c| c.timestamp());

    let skip = thread.len().saturating_sub(MAX_THREAD_ENTRIES);
    thread
        .into_iter()
        .skip(skip)
        .map(|c| ThreadEntry {
            label: if is_ai_review_comment(&c.body) {
                AI_REVIEWER_LABEL.to_string()
            } else {
                format!("@{}", c.user.login)
            },
            body: c.body.clone(),
            timestamp: c.created_at.clone(),
        })
        .collect()
}

pub fn build_thread_from_comments(
    comments: &[PrComment],
    path: &str,
    line: u64,
    exclude_id: u64,
) -> String {
    thread_entries(comments, path, line, exclude_id)
        .iter()
        .map(ThreadEntry::render)
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: u64, path: &str, position: u64, body: &str, login: &str, at: &str) -> PrComment {
        PrComment {
            id,
            path: Some(path.to_string()),
            position: Some(position),
            body: body.to_string(),
            user: CommentUser {
                login: login.to_string(),
            },
            created_at: at.to_string(),
            pull_request_review_id: Some(1),
        }
    }

    #[test]
    fn recognises_each_severity_heading() {
        assert!(is_ai_review_comment("🔴 **CRITICAL**: SQL injection vulnerability"));
        assert!(is_ai_review_comment("🟡 **WARNING**: Missing null check"));
        assert!(is_ai_review_comment("🔵 **SUGGESTION**: Consider using a map here"));
        assert!(is_ai_review_comment("🟢 **PRAISE**: Great error handling"));
    }

    #[test]
    fn rejects_other_bodies() {
        assert!(!is_ai_review_comment("This looks fine to me"));
        assert!(!is_ai_review_comment(""));
        assert!(!is_ai_review_comment("**CRITICAL**: missing the emoji"));
        assert!(!is_ai_review_comment("quoting: 🔴 **CRITICAL**: not at start"));
        assert!(!is_ai_review_comment("💬 **UNKNOWN**: generic icon"));
    }

    #[test]
    fn thread_ownership_requires_ai_comment_at_exact_anchor() {
        let ai = comment(1, "src/foo.js", 10, "🔴 **CRITICAL**: Bug here", "bot", "2025-01-01T00:00:00Z");
        assert!(thread_has_ai_comment(&[ai.clone()], "src/foo.js", 10));
        assert!(!thread_has_ai_comment(&[ai.clone()], "src/bar.js", 10));
        assert!(!thread_has_ai_comment(&[ai], "src/foo.js", 20));
        assert!(!thread_has_ai_comment(&[], "src/foo.js", 10));

        let human = comment(2, "src/foo.js", 10, "Just a regular comment", "alice", "2025-01-01T00:00:00Z");
        assert!(!thread_has_ai_comment(&[human], "src/foo.js", 10));
    }

    #[test]
    fn find_returns_the_ai_comment() {
        let comments = vec![
            comment(1, "src/foo.js", 10, "question", "alice", "2025-01-01T00:00:00Z"),
            comment(2, "src/foo.js", 10, "🟡 **WARNING**: Check", "bot", "2025-01-01T00:00:00Z"),
        ];
        assert_eq!(find_thread_ai_comment(&comments, "src/foo.js", 10).unwrap().id, 2);
    }

    #[test]
    fn builds_labelled_thread() {
        let comments = vec![
            comment(1, "src/foo.js", 10, "🔴 **CRITICAL**: Bug", "bot", "2025-01-01T00:00:00Z"),
            comment(2, "src/foo.js", 10, "Can you explain?", "alice", "2025-01-01T01:00:00Z"),
        ];
        let thread = build_thread_from_comments(&comments, "src/foo.js", 10, 999);
        assert_eq!(
            thread,
            "**AI Reviewer:**\n🔴 **CRITICAL**: Bug\n\n---\n\n**@alice:**\nCan you explain?"
        );
    }

    #[test]
    fn excludes_current_comment_and_other_anchors() {
        let comments = vec![
            comment(1, "src/foo.js", 10, "🔴 **CRITICAL**: Bug", "bot", "2025-01-01T00:00:00Z"),
            comment(2, "src/foo.js", 10, "Current message", "alice", "2025-01-01T01:00:00Z"),
            comment(3, "src/bar.js", 10, "Different file", "alice", "2025-01-01T01:00:00Z"),
            comment(4, "src/foo.js", 20, "Different line", "alice", "2025-01-01T01:00:00Z"),
        ];
        let thread = build_thread_from_comments(&comments, "src/foo.js", 10, 2);
        assert!(thread.contains("CRITICAL"));
        assert!(!thread.contains("Current message"));
        assert!(!thread.contains("Different file"));
        assert!(!thread.contains("Different line"));
    }

    #[test]
    fn keeps_only_latest_entries() {
        let comments: Vec<_> = (0..MAX_THREAD_ENTRIES as u64 + 5)
            .map(|i| {
                comment(i, "src/foo.js", 10, &format!("Comment {}", i), "user",
                    &format!("2025-01-01T{:02}:00:00Z", i))
            })
            .collect();

        let entries = thread_entries(&comments, "src/foo.js", 10, 999);
        assert_eq!(entries.len(), MAX_THREAD_ENTRIES);
        assert_eq!(entries[0].body, "Comment 5");
        assert_eq!(entries[MAX_THREAD_ENTRIES - 1].body, "Comment 14");

        let rendered = build_thread_from_comments(&comments, "src/foo.js", 10, 999);
        assert_eq!(rendered.split(ENTRY_SEPARATOR).count(), MAX_THREAD_ENTRIES);
    }

    #[test]
    fn sorts_chronologically_across_offsets() {
        let comments = vec![
            comment(2, "src/foo.js", 10, "Second", "alice", "2025-01-01T02:00:00Z"),
            comment(1, "src/foo.js", 10, "First", "bob", "2025-01-01T03:00:00+02:00"),
        ];
        let entries = thread_entries(&comments, "src/foo.js", 10, 999);
        assert_eq!(entries[0].body, "First");
        assert_eq!(entries[0].label, "@bob");
        assert_eq!(entries[1].body, "Second");
    }

    #[test]
    fn empty_when_nothing_matches() {
        let comments = vec![comment(1, "src/bar.js", 20, "Not matching", "alice", "2025-01-01T00:00:00Z")];
        assert_eq!(build_thread_from_comments(&comments, "src/foo.js", 10, 999), "");
    }

    #[test]
    fn parses_platform_payload() {
        let json = r#"[{"id": 7, "path": "a.rs", "position": 3, "body": "hi",
            "user": {"login": "alice", "id": 4}, "created_at": "2025-01-01T00:00:00Z",
            "pull_request_review_id": 9, "diff_hunk": "@@ -1 +1 @@"}]"#;
        let comments: Vec<PrComment> = serde_json::from_str(json).unwrap();
        assert_eq!(comments[0].position, Some(3));
        assert_eq!(comments[0].user.login, "alice");
        assert_eq!(comments[0].pull_request_review_id, Some(9));
    }
}
