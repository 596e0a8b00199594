//! Generation API plumbing: wire types, client trait, retry schedules.

mod client;
mod retry;
mod types;

pub use client::{GenerationClient, OpenRouterClient};
pub use retry::{RetrySchedule, CHAT_RETRY_SCHEDULE, SUMMARY_RETRY_SCHEDULE};
pub use types::{
    ChatMessage, ChatRole, Completion, CompletionRequest, TokenUsage, DEFAULT_TEMPERATURE,
};
