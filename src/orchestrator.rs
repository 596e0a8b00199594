//! The summarization run: dual-artifact generation with scheduled retries.
//!
//! A run produces two independent artifacts from one transcript, a short
//! bullet summary and a detailed summary. Both are requested concurrently;
//! whichever fails is re-requested on the retry ladder while successes are
//! kept and never regenerated. Observers follow the run through
//! [`SessionState`] transitions.

use std::sync::{Arc, Mutex};

use futures::future::join;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::context::VideoContext;
use crate::error::{Error, Result};
use crate::llm::{ChatMessage, GenerationClient, SUMMARY_RETRY_SCHEDULE};
use crate::session::{SessionState, StateChannel};
use crate::transcript::TranscriptSource;

/// Which of the two summaries a generation call produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SummaryKind {
    Short,
    Detailed,
}

impl SummaryKind {
    fn prompt(self, transcript: &str) -> String {
        match self {
            Self::Short => format!(
                "Summarize this YouTube video transcript in 3-4 bullet points, \
                 focusing on the main ideas:\n{transcript}"
            ),
            Self::Detailed => format!(
                "Provide a detailed summary of this YouTube video transcript, \
                 including key points, examples, and important details:\n{transcript}"
            ),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Short => "short summary",
            Self::Detailed => "detailed summary",
        }
    }
}

/// Immutable parameters of one summarization run.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub video_url: String,
    pub model: String,
    pub api_key: String,
}

impl SummaryRequest {
    pub fn new(
        video_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            video_url: video_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }
}

/// Progress of one artifact within a run.
#[derive(Debug, Default)]
enum ArtifactState {
    /// Not committed and not currently requested.
    #[default]
    Idle,
    /// A generation call for the given 1-based chance number is in flight.
    InFlight { attempt: u32 },
    /// Committed text. A slot commits at most once per run; committed text
    /// is never replaced or cleared by a later failure.
    Committed(String),
}

#[derive(Debug, Default)]
struct ArtifactSlot {
    state: ArtifactState,
    last_error: Option<Error>,
}

impl ArtifactSlot {
    fn is_committed(&self) -> bool {
        matches!(self.state, ArtifactState::Committed(_))
    }

    fn text(&self) -> Option<&str> {
        match &self.state {
            ArtifactState::Committed(text) => Some(text),
            _ => None,
        }
    }

    /// Mark the slot in flight for `attempt`; no-op once committed.
    fn begin(&mut self, attempt: u32) {
        if !self.is_committed() {
            self.state = ArtifactState::InFlight { attempt };
        }
    }

    fn commit(&mut self, text: String) {
        self.state = ArtifactState::Committed(text);
        self.last_error = None;
    }

    /// Record the failure and return the slot to `Idle` for the next rung.
    fn fail(&mut self, error: Error) {
        self.state = ArtifactState::Idle;
        self.last_error = Some(error);
    }
}

/// Both artifact slots of a run.
#[derive(Debug, Default)]
struct ArtifactSet {
    short: ArtifactSlot,
    detailed: ArtifactSlot,
}

impl ArtifactSet {
    fn complete(&self) -> bool {
        self.short.is_committed() && self.detailed.is_committed()
    }

    fn missing_label(&self) -> &'static str {
        match (self.short.is_committed(), self.detailed.is_committed()) {
            (false, false) => "short summary and detailed summary",
            (false, true) => "short summary",
            (true, false) => "detailed summary",
            (true, true) => "summaries",
        }
    }
}

/// Drives summarization runs and publishes their state.
///
/// Starting a run while another is in flight aborts the old one first, so
/// observers only ever see transitions from the most recent request.
pub struct SummaryOrchestrator {
    client: Arc<dyn GenerationClient>,
    transcripts: Arc<dyn TranscriptSource>,
    states: StateChannel,
    video_ctx: Arc<Mutex<VideoContext>>,
    job: Mutex<Option<JoinHandle<()>>>,
}

impl SummaryOrchestrator {
    pub fn new(client: Arc<dyn GenerationClient>, transcripts: Arc<dyn TranscriptSource>) -> Self {
        Self {
            client,
            transcripts,
            states: StateChannel::default(),
            video_ctx: Arc::new(Mutex::new(VideoContext::default())),
            job: Mutex::new(None),
        }
    }

    /// Subscribe to run state transitions.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionState> {
        self.states.subscribe()
    }

    /// Snapshot of the most recent run state.
    pub fn state(&self) -> SessionState {
        self.states.current()
    }

    /// Shared video context, for wiring into a chat session.
    pub fn video_context(&self) -> Arc<Mutex<VideoContext>> {
        Arc::clone(&self.video_ctx)
    }

    /// Start a summarization run, superseding any run in flight.
    ///
    /// Publishes `Loading` immediately and drives the rest of the run on a
    /// spawned task. Must be called within a tokio runtime.
    pub fn summarize(&self, request: SummaryRequest) {
        self.abort_current();
        self.states.publish(SessionState::Loading);

        let run = Run {
            id: Uuid::new_v4(),
            request,
            client: Arc::clone(&self.client),
            transcripts: Arc::clone(&self.transcripts),
            states: self.states.clone(),
            video_ctx: Arc::clone(&self.video_ctx),
        };
        let handle = tokio::spawn(async move { run.execute().await });

        if let Ok(mut job) = self.job.lock() {
            *job = Some(handle);
        }
    }

    /// Abort any run in flight, drop the loaded video context, and return
    /// to `Idle`.
    pub fn clear_video_context(&self) {
        self.abort_current();
        if let Ok(mut ctx) = self.video_ctx.lock() {
            ctx.clear();
        }
        self.states.publish(SessionState::Idle);
    }

    fn abort_current(&self) {
        if let Ok(mut job) = self.job.lock() {
            if let Some(handle) = job.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for SummaryOrchestrator {
    fn drop(&mut self) {
        self.abort_current();
    }
}

/// State owned by one spawned run task.
struct Run {
    id: Uuid,
    request: SummaryRequest,
    client: Arc<dyn GenerationClient>,
    transcripts: Arc<dyn TranscriptSource>,
    states: StateChannel,
    video_ctx: Arc<Mutex<VideoContext>>,
}

impl Run {
    async fn execute(self) {
        debug!(run = %self.id, url = %self.request.video_url, model = %self.request.model, "Run started");

        let transcript = match self.transcripts.fetch(&self.request.video_url).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) | Err(Error::TranscriptUnavailable(_)) => {
                self.states.publish(SessionState::Error {
                    message: "No transcript available for this video".to_string(),
                });
                return;
            }
            Err(e) => {
                error!(run = %self.id, error = %e, "Transcript fetch failed");
                self.states.publish(SessionState::Error {
                    message: format!("Failed to get video transcript: {}", e.user_message()),
                });
                return;
            }
        };

        // A new video invalidates whatever the previous run left behind.
        if let Ok(mut ctx) = self.video_ctx.lock() {
            ctx.transcript = Some(transcript.clone());
            ctx.detailed_summary = None;
        }

        let mut artifacts = ArtifactSet::default();
        self.attempt(&mut artifacts, &transcript, 1).await;

        for retry in 0..SUMMARY_RETRY_SCHEDULE.attempts() {
            if artifacts.complete() {
                break;
            }

            self.states.publish(SessionState::Retrying {
                message: retry_message(retry as u32, &artifacts),
                attempt: (retry + 1) as u32,
                retrying_short: !artifacts.short.is_committed(),
                retrying_detailed: !artifacts.detailed.is_committed(),
                short_summary: artifacts.short.text().map(String::from),
                detailed_summary: artifacts.detailed.text().map(String::from),
            });

            if let Some(delay) = SUMMARY_RETRY_SCHEDULE.delay(retry) {
                tokio::time::sleep(delay).await;
            }

            self.attempt(&mut artifacts, &transcript, retry as u32 + 2)
                .await;
        }

        let missing = artifacts.missing_label();
        let ArtifactSet { short, detailed } = artifacts;
        match (short.state, detailed.state) {
            (ArtifactState::Committed(short_summary), ArtifactState::Committed(detailed_summary)) => {
                debug!(run = %self.id, "Run succeeded");
                self.states.publish(SessionState::Success {
                    short_summary,
                    detailed_summary,
                });
            }
            _ => {
                error!(run = %self.id, missing, "Run exhausted retries");
                self.states.publish(SessionState::Error {
                    message: format!("Failed to generate {missing} after multiple retries"),
                });
            }
        }
    }

    /// Issue generation calls for whichever slots are not committed,
    /// concurrently, and fold the outcomes back into the slots.
    /// `attempt` is the 1-based chance number (initial call is 1).
    async fn attempt(&self, artifacts: &mut ArtifactSet, transcript: &str, attempt: u32) {
        artifacts.short.begin(attempt);
        artifacts.detailed.begin(attempt);
        let short_pending = matches!(artifacts.short.state, ArtifactState::InFlight { .. });
        let detailed_pending = matches!(artifacts.detailed.state, ArtifactState::InFlight { .. });

        let short_fut = async {
            if short_pending {
                Some(self.generate(SummaryKind::Short, transcript).await)
            } else {
                None
            }
        };
        let detailed_fut = async {
            if detailed_pending {
                Some(self.generate(SummaryKind::Detailed, transcript).await)
            } else {
                None
            }
        };
        let (short, detailed) = join(short_fut, detailed_fut).await;

        match short {
            Some(Ok(text)) => artifacts.short.commit(text),
            Some(Err(e)) => {
                warn!(run = %self.id, kind = SummaryKind::Short.label(), attempt, error = %e, "Generation failed");
                artifacts.short.fail(e);
            }
            None => {}
        }

        match detailed {
            Some(Ok(text)) => {
                if let Ok(mut ctx) = self.video_ctx.lock() {
                    ctx.detailed_summary = Some(text.clone());
                }
                artifacts.detailed.commit(text);
            }
            Some(Err(e)) => {
                warn!(run = %self.id, kind = SummaryKind::Detailed.label(), attempt, error = %e, "Generation failed");
                artifacts.detailed.fail(e);
            }
            None => {}
        }
    }

    async fn generate(&self, kind: SummaryKind, transcript: &str) -> Result<String> {
        let messages = vec![ChatMessage::user(kind.prompt(transcript))];
        let completion = self
            .client
            .complete(&self.request.model, messages, &self.request.api_key)
            .await?;
        Ok(completion.text)
    }
}

/// Status line for a `Retrying` transition. `completed_retries` is zero
/// right after the initial attempt, then counts finished retry rounds.
fn retry_message(completed_retries: u32, artifacts: &ArtifactSet) -> String {
    let detail = |slot: &ArtifactSlot| {
        slot.last_error
            .as_ref()
            .map(Error::user_message)
            .unwrap_or_else(|| "unknown error".to_string())
    };
    let short_missing = !artifacts.short.is_committed();
    let detailed_missing = !artifacts.detailed.is_committed();

    if completed_retries == 0 {
        match (short_missing, detailed_missing) {
            (true, true) => "Failed to generate summaries. Retrying...".to_string(),
            (true, false) => format!(
                "Failed to get short summary: {}. Retrying...",
                detail(&artifacts.short)
            ),
            _ => format!(
                "Failed to get detailed summary: {}. Retrying...",
                detail(&artifacts.detailed)
            ),
        }
    } else {
        match (short_missing, detailed_missing) {
            (true, true) => {
                format!("Retry #{completed_retries} failed for both summaries. Retrying...")
            }
            (true, false) => format!(
                "Retry #{completed_retries} failed for short summary: {}. Retrying...",
                detail(&artifacts.short)
            ),
            _ => format!(
                "Retry #{completed_retries} failed for detailed summary: {}. Retrying...",
                detail(&artifacts.detailed)
            ),
        }
    }
}
