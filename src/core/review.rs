use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;

static JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```json\s*").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Warning,
    Suggestion,
    Praise,
}

impl Severity {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "critical" => Some(Self::Critical),
            "warning" => Some(Self::Warning),
            "suggestion" => Some(Self::Suggestion),
            "praise" => Some(Self::Praise),
            _ => None,
        }
    }
}

/// One finding as returned by the provider. Severity stays the raw string so
/// unknown values still render verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewComment {
    #[serde(default, deserialize_with = "lenient_text")]
    pub path: String,
    #[serde(default, deserialize_with = "lenient_line")]
    pub line: Option<u64>,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub severity: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionStatus {
    Met,
    NotMet,
    #[serde(other)]
    Unclear,
}

impl Default for CriterionStatus {
    fn default() -> Self {
        Self::Unclear
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceCriterion {
    #[serde(default, deserialize_with = "lenient_text")]
    pub criterion: String,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: CriterionStatus,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub comment: Option<String>,
}

/// Every field is read leniently: model output is trusted to be a JSON
/// object and nothing more.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default, deserialize_with = "lenient_text")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub comments: Option<Vec<ReviewComment>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub acceptance_criteria: Option<Vec<AcceptanceCriterion>>,
}

impl Review {
    pub fn comments(&self) -> &[ReviewComment] {
        self.comments.as_deref().unwrap_or_default()
    }

    pub fn acceptance_criteria(&self) -> &[AcceptanceCriterion] {
        self.acceptance_criteria.as_deref().unwrap_or_default()
    }
}

fn text_of(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(text_of(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_opt_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(text_of(Value::deserialize(deserializer)?))
}

/// Numbers and numeric strings (`"12"`) are line numbers; anything else is none.
fn lenient_line<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_status<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<CriterionStatus, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if s == "met" => CriterionStatus::Met,
        Value::String(s) if s == "not_met" => CriterionStatus::NotMet,
        _ => CriterionStatus::Unclear,
    })
}

/// A non-array reads as absent; elements that are not objects are dropped.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        _ => None,
    })
}

#[derive(Debug, Error)]
pub enum ReviewParseError {
    #[error("review response is not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),
    #[error("review response JSON is {0}, not an object")]
    Shape(&'static str),
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parses a provider answer into a [`Review`], tolerating markdown fences
/// anywhere in the text. Only a top-level non-object is rejected once the
/// text is valid JSON.
pub fn parse_review_response(raw: &str) -> Result<Review, ReviewParseError> {
    let without_json_fence = JSON_FENCE.replace_all(raw, "");
    let cleaned = without_json_fence.replace("```", "");

    let value: Value = serde_json::from_str(cleaned.trim()).map_err(ReviewParseError::Syntax)?;
    if !value.is_object() {
        return Err(ReviewParseError::Shape(kind_of(&value)));
    }
    serde_json::from_value(value).map_err(ReviewParseError::Syntax)
}

/// Which of a review's comments (by index) made it onto the diff as inline
/// comments. Filled in by the posting loop, read by the summary formatter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlinePosting {
    posted: BTreeSet<usize>,
}

impl InlinePosting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_posted(&mut self, index: usize) {
        self.posted.insert(index);
    }

    pub fn is_posted(&self, index: usize) -> bool {
        self.posted.contains(&index)
    }

    pub fn count(&self) -> usize {
        self.posted.len()
    }
}

impl FromIterator<usize> for InlinePosting {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            posted: iter.into_iter().collect(),
        }
    }
}
