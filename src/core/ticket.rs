use once_cell::sync::Lazy;
use regex::Regex;

static ANY_TICKET_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z][A-Z0-9]+-\d+").unwrap());

/// First Jira-style key (`PROJ-123`) in a PR title or branch name. With a
/// project prefix only keys of that project match.
pub fn extract_ticket_key(text: &str, prefix: Option<&str>) -> Option<String> {
    if text.is_empty() {
        return None;
    }

    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => {
            let pattern = Regex::new(&format!(r"{}-\d+", regex::escape(prefix))).ok()?;
            pattern.find(text).map(|m| m.as_str().to_string())
        }
        None => ANY_TICKET_KEY.find(text).map(|m| m.as_str().to_string()),
    }
}
