//! Observable state of a summarization run.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// State of the current summarization run, published to observers.
///
/// `Retrying` carries whichever summaries have already succeeded so a
/// presentation layer never loses earlier work while the rest is retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No active or completed run.
    Idle,
    /// A run is in flight with no partial result yet.
    Loading,
    /// At least one summary is still missing and scheduled for retry.
    Retrying {
        message: String,
        /// 1-based attempt number for display.
        attempt: u32,
        retrying_short: bool,
        retrying_detailed: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        short_summary: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detailed_summary: Option<String>,
    },
    /// Terminal: both summaries present.
    Success {
        short_summary: String,
        detailed_summary: String,
    },
    /// Terminal: retries exhausted or a fatal failure.
    Error { message: String },
}

impl SessionState {
    /// Whether the state ends a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Error { .. })
    }
}

/// Broadcast channel for state transitions with a current-state snapshot.
#[derive(Debug, Clone)]
pub struct StateChannel {
    sender: broadcast::Sender<SessionState>,
    current: Arc<Mutex<SessionState>>,
}

impl StateChannel {
    /// Create a channel retaining up to `capacity` undelivered transitions
    /// per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            current: Arc::new(Mutex::new(SessionState::Idle)),
        }
    }

    /// Publish a transition to all subscribers.
    pub fn publish(&self, state: SessionState) {
        if let Ok(mut current) = self.current.lock() {
            *current = state.clone();
        }
        // Send fails only when nobody is subscribed, which is fine.
        let _ = self.sender.send(state);
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionState> {
        self.sender.subscribe()
    }

    /// Snapshot of the most recently published state.
    pub fn current(&self) -> SessionState {
        self.current
            .lock()
            .map(|s| s.clone())
            .unwrap_or(SessionState::Idle)
    }
}

impl Default for StateChannel {
    fn default() -> Self {
        Self::new(32)
    }
}
