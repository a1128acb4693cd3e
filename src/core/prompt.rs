pub const REVIEW_PROMPT: &str = r#"You are an expert code reviewer. Review the following pull request diff and provide constructive feedback.

Your review should:
- Identify bugs, security issues, and potential problems
- Suggest improvements for readability and maintainability
- Point out missing error handling or edge cases
- Praise good patterns where appropriate
- Be concise and actionable

Respond in the following JSON format:
{
  "summary": "Brief overall assessment",
  "comments": [
    {
      "path": "filename",
      "line": <line_number_in_new_file>,
      "severity": "critical|warning|suggestion|praise",
      "message": "Your comment"
    }
  ]
}

IMPORTANT: Each line in the diff is prefixed with [L<number>] showing the actual line number in the new file.
Use EXACTLY the number from the [L<number>] prefix for the "line" field. Do not calculate line numbers yourself.

Only return valid JSON. No markdown fences."#;

pub const FOLLOWUP_PROMPT: &str = r#"You are an expert code reviewer responding to a follow-up question in a review comment thread on a specific file and line.

Context: You previously left an inline review comment on a pull request. The developer is now replying to your comment with a question or request.

Your response should:
- Address the user's specific question or request directly
- Reference the specific code being discussed (the diff and file context are provided)
- Be helpful, concise, and conversational
- Use markdown formatting for readability
- If asked to clarify, provide more detail, examples, or alternative approaches

Respond in plain markdown text. Do NOT use JSON format."#;

const ACCEPTANCE_CRITERIA_PROMPT: &str = r#"The following is the Jira ticket description for this PR. Read it carefully and identify any requirements or acceptance criteria described in it, then assess whether the code changes satisfy them.

Jira Ticket Description:
{ticket}

Add an "acceptance_criteria" array to your JSON response with each requirement you identified:
{
  "acceptance_criteria": [
    { "criterion": "short description of the requirement", "status": "met|not_met|unclear", "comment": "brief explanation" }
  ]
}"#;

/// System prompt for a new review; asks for acceptance-criteria checks when a
/// ticket description is known.
pub fn build_review_prompt(ticket_description: Option<&str>) -> String {
    match ticket_description.filter(|t| !t.trim().is_empty()) {
        Some(ticket) => format!(
            "{}\n\n{}",
            REVIEW_PROMPT,
            ACCEPTANCE_CRITERIA_PROMPT.replace("{ticket}", ticket)
        ),
        None => REVIEW_PROMPT.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn context_block(context: Option<&str>) -> String {
    non_empty(context)
        .map(|c| format!("Project Context:\n\n{}\n\n", c))
        .unwrap_or_default()
}

fn diff_block(diff: &str) -> String {
    format!("Pull Request Diff:\n```\n{}\n```", diff)
}

pub fn build_user_message(diff: &str, user_message: Option<&str>, context: Option<&str>) -> String {
    let request = non_empty(user_message)
        .map(|m| format!("User request: {}\n\n", m))
        .unwrap_or_default();
    format!("{}{}{}", request, context_block(context), diff_block(diff))
}

pub fn build_follow_up_message(
    diff: &str,
    thread_history: &str,
    user_message: &str,
    context: Option<&str>,
) -> String {
    let thread = if thread_history.is_empty() {
        String::new()
    } else {
        format!("Review Thread:\n\n{}\n\n", thread_history)
    };
    format!(
        "{}{}\n\n{}User's follow-up:\n{}",
        context_block(context),
        diff_block(diff),
        thread,
        user_message
    )
}
