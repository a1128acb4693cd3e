pub mod anthropic;
pub mod jira;
pub mod llm;
pub mod openai;

pub use anthropic::ClaudeProvider;
pub use jira::{JiraClient, TicketSource};
pub use llm::ReviewProvider;
pub use openai::CodexProvider;
