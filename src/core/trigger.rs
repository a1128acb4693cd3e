use regex::Regex;
use serde::{Deserialize, Serialize};

/// Provider names in precedence order. When a comment mentions several,
/// the earliest entry here wins regardless of where it appears in the text.
pub const DEFAULT_TRIGGER_NAMES: &[&str] = &["claude", "codex"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub provider: String,
    pub message: String,
}

struct Mention {
    provider: String,
    pattern: Regex,
}

pub struct TriggerDetector {
    mentions: Vec<Mention>,
}

impl TriggerDetector {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mentions = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref().to_lowercase();
                // ASCII word boundary: `@claudeé` still triggers.
                let pattern = Regex::new(&format!(r"(?i)@{}(?-u:\b)", regex::escape(&name)))
                    .expect("mention pattern");
                Mention {
                    provider: name,
                    pattern,
                }
            })
            .collect();

        Self { mentions }
    }

    pub fn detect(&self, body: &str) -> Option<Trigger> {
        if body.is_empty() {
            return None;
        }

        self.mentions.iter().find_map(|mention| {
            if !mention.pattern.is_match(body) {
                return None;
            }
            // Only the first occurrence is removed; the gap it leaves is kept.
            let message = mention.pattern.replace(body, "").trim().to_string();
            Some(Trigger {
                provider: mention.provider.clone(),
                message,
            })
        })
    }
}

impl Default for TriggerDetector {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGGER_NAMES)
    }
}
