//! # recap-core
//!
//! Resilient dual-summary generation for videos, with a context-aware
//! follow-up chat, built on the OpenRouter API.
//!
//! ## Core Components
//!
//! - **Orchestrator**: Drives a summarization run producing a short and a
//!   detailed summary, retrying whichever is missing on a fixed ladder
//! - **Session**: Observable run state for presentation layers
//! - **Chat**: Follow-up conversation grounded in the loaded video, with
//!   token-pressure history trimming
//! - **Catalog**: Static model metadata (context windows, pricing)
//! - **Transcript**: Caption scraping and video id extraction
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use recap_core::{OpenRouterClient, SummaryOrchestrator, SummaryRequest, YouTubeTranscript};
//!
//! let orchestrator = SummaryOrchestrator::new(
//!     Arc::new(OpenRouterClient::new()),
//!     Arc::new(YouTubeTranscript::new()),
//! );
//! let mut states = orchestrator.subscribe();
//!
//! orchestrator.summarize(SummaryRequest::new(
//!     "https://youtu.be/dQw4w9WgXcQ",
//!     "openai/gpt-4o-mini",
//!     "sk-or-...",
//! ));
//! while let Ok(state) = states.recv().await {
//!     println!("{state:?}");
//!     if state.is_terminal() {
//!         break;
//!     }
//! }
//! ```

pub mod catalog;
pub mod chat;
pub mod context;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod prefs;
pub mod session;
pub mod transcript;

// Re-exports for convenience
pub use catalog::{lookup, ModelInfo, MODELS};
pub use chat::ChatSession;
pub use context::{History, HistoryEntry, VideoContext};
pub use error::{Error, Result};
pub use llm::{
    ChatMessage, ChatRole, Completion, GenerationClient, OpenRouterClient, RetrySchedule,
    TokenUsage, CHAT_RETRY_SCHEDULE, SUMMARY_RETRY_SCHEDULE,
};
pub use orchestrator::{SummaryOrchestrator, SummaryRequest};
pub use prefs::Preferences;
pub use session::{SessionState, StateChannel};
pub use transcript::{extract_video_id, TranscriptSource, YouTubeTranscript};
