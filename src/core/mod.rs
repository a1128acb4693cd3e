pub mod annotate;
pub mod context;
pub mod conversation;
pub mod formatter;
pub mod prompt;
pub mod review;
pub mod ticket;
pub mod trigger;

pub use annotate::{annotate_diff, truncate_diff};
pub use context::{ContextFetcher, LoadedContext};
pub use conversation::PrComment;
pub use review::{parse_review_response, InlinePosting, Review};
pub use trigger::{Trigger, TriggerDetector};
