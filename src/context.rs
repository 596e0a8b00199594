//! Conversation history and shared video context.
//!
//! `History` is append-only except for [`History::trim`], the bulk eviction
//! that keeps a growing conversation inside a model's context window:
//! the oldest entries are dropped outright and a further prefix of the
//! survivors is flagged retired (excluded from prompts, kept for display).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fraction of the context window that triggers a trim.
pub const CONTEXT_THRESHOLD: f64 = 0.8;

/// Fraction of recent history kept in prompts and across a trim.
pub const KEEP_FRACTION: f64 = 0.7;

/// Fraction used to compute how many survivors are flagged retired.
pub const RETIRE_FRACTION: f64 = 0.3;

/// Document-derived framing shared between the summarization run and chat.
///
/// Written by the orchestrator task, read when a chat turn builds its system
/// message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoContext {
    /// Raw transcript of the loaded video.
    pub transcript: Option<String>,
    /// Best known detailed summary.
    pub detailed_summary: Option<String>,
}

impl VideoContext {
    /// Render the framing block embedded into the chat system message.
    ///
    /// Empty when no video has been loaded; the surrounding instructions
    /// tell the model how to respond in that case.
    pub fn context_block(&self) -> String {
        if self.transcript.is_none() && self.detailed_summary.is_none() {
            return String::new();
        }

        let mut block = String::from("=== VIDEO CONTEXT ===\n");
        if let Some(summary) = &self.detailed_summary {
            block.push_str("\n## Detailed Summary\n");
            block.push_str(summary);
            block.push_str("\n\n");
        }
        if let Some(transcript) = &self.transcript {
            block.push_str("\n## Full Transcript\n");
            block.push_str(transcript);
            block.push_str("\n\n");
        }
        block.push_str("=== END OF VIDEO CONTEXT ===\n\n");
        block
    }

    pub fn clear(&mut self) {
        self.transcript = None;
        self.detailed_summary = None;
    }
}

/// One conversation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub content: String,
    pub from_user: bool,
    /// Excluded from future prompts but retained for display.
    pub retired: bool,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    fn new(content: impl Into<String>, from_user: bool) -> Self {
        Self {
            content: content.into(),
            from_user,
            retired: false,
            timestamp: Utc::now(),
        }
    }
}

/// Ordered conversation history with retire/evict bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.entries.push(HistoryEntry::new(content, true));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.entries.push(HistoryEntry::new(content, false));
    }

    /// All entries, retired included, in original order.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries still eligible for prompts.
    pub fn active_len(&self) -> usize {
        self.entries.iter().filter(|e| !e.retired).count()
    }

    /// The slice of history included in the next prompt: the most recent
    /// `floor(len * 0.7)` entries, minus retired ones, in original order.
    pub fn prompt_window(&self) -> Vec<&HistoryEntry> {
        let keep = self.entries.len() * 7 / 10;
        let start = self.entries.len() - keep;
        self.entries[start..].iter().filter(|e| !e.retired).collect()
    }

    /// Evict the oldest entries down to `floor(len * 0.7)` survivors and
    /// flag the oldest `floor(evicted * 0.3)` survivors as retired.
    ///
    /// Returns the number of entries evicted.
    pub fn trim(&mut self) -> usize {
        let len = self.entries.len();
        let keep = len * 7 / 10;
        if keep >= len {
            return 0;
        }

        let evicted = len - keep;
        self.entries.drain(..evicted);

        let retire = evicted * 3 / 10;
        for entry in self.entries.iter_mut().take(retire) {
            entry.retired = true;
        }

        evicted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
