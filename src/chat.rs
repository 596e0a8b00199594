//! Follow-up conversation grounded in the loaded video context.
//!
//! Each turn rebuilds the outgoing message list from scratch: a system
//! message carrying the video framing, the recent slice of history, then
//! the new user message. Token pressure from the previous response decides
//! whether history is trimmed before the turn is recorded.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::catalog;
use crate::context::{History, VideoContext, CONTEXT_THRESHOLD};
use crate::error::{Error, Result};
use crate::llm::{ChatMessage, GenerationClient, CHAT_RETRY_SCHEDULE};

const SYSTEM_TEMPLATE_HEAD: &str =
    "You are a helpful AI assistant discussing a video. Base your responses on the following context:";

const SYSTEM_TEMPLATE_TAIL: &str = "Instructions:
1. If video context is provided above:
   - Use it to give detailed and accurate responses
   - Reference specific parts of the video when relevant
   - Be clear about which part of the video you're discussing
2. If no video context is provided:
   - Inform the user that no video has been loaded yet
   - Suggest loading a video to get better answers
3. Keep responses clear and well-structured:
   - Break down complex explanations into points
   - Use examples from the video when possible
   - Highlight key concepts or timestamps
4. Always be clear about whether you're using video context in your response
5. If asked about something not in the video:
   - Clearly state that it's not covered in the video
   - Provide a general answer if possible
6. Format code examples properly if discussing programming topics";

/// A chat conversation sharing the orchestrator's video context.
pub struct ChatSession {
    client: Arc<dyn GenerationClient>,
    video_ctx: Arc<Mutex<VideoContext>>,
    history: History,
    model: Option<String>,
    api_key: Option<String>,
    last_total_tokens: u64,
    usage: watch::Sender<Option<String>>,
}

impl ChatSession {
    pub fn new(client: Arc<dyn GenerationClient>, video_ctx: Arc<Mutex<VideoContext>>) -> Self {
        let (usage, _) = watch::channel(None);
        Self {
            client,
            video_ctx,
            history: History::new(),
            model: None,
            api_key: None,
            last_total_tokens: 0,
            usage,
        }
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = Some(model.into());
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.api_key = Some(api_key.into());
    }

    /// Full conversation history, retired entries included.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Display line for the previous response's token usage.
    pub fn usage_note(&self) -> Option<String> {
        self.usage.borrow().clone()
    }

    /// Watch channel carrying the token usage display line.
    pub fn usage_updates(&self) -> watch::Receiver<Option<String>> {
        self.usage.subscribe()
    }

    /// Total token count reported by the previous response.
    pub fn last_total_tokens(&self) -> u64 {
        self.last_total_tokens
    }

    /// Send one user message and return the assistant's reply.
    ///
    /// Configuration problems fail before the turn is recorded. Transient
    /// API failures are retried on the chat ladder; non-retryable ones
    /// surface immediately.
    pub async fn send(&mut self, message: impl Into<String>) -> Result<String> {
        let message = message.into();
        let model = self
            .model
            .clone()
            .ok_or(Error::MissingConfig("model"))?;
        let api_key = self
            .api_key
            .clone()
            .ok_or(Error::MissingConfig("API key"))?;
        let info = catalog::lookup(&model).ok_or_else(|| Error::UnknownModel(model.clone()))?;

        // Trim against the window before this turn enters history.
        if self.last_total_tokens as f64 > info.context_length as f64 * CONTEXT_THRESHOLD {
            let evicted = self.history.trim();
            if evicted > 0 {
                debug!(
                    evicted,
                    tokens = self.last_total_tokens,
                    context_length = info.context_length,
                    "Trimmed chat history"
                );
            }
        }

        let mut messages = vec![ChatMessage::system(self.system_message())];
        for entry in self.history.prompt_window() {
            messages.push(if entry.from_user {
                ChatMessage::user(entry.content.clone())
            } else {
                ChatMessage::assistant(entry.content.clone())
            });
        }
        messages.push(ChatMessage::user(message.clone()));
        self.history.push_user(message);

        let attempts = CHAT_RETRY_SCHEDULE.attempts() as u32;
        let mut last_error: Option<Error> = None;

        for attempt in 0..attempts {
            match self
                .client
                .complete(&model, messages.clone(), &api_key)
                .await
            {
                Ok(completion) => {
                    if let Some(usage) = completion.usage {
                        self.last_total_tokens = usage.total_tokens;
                        self.usage
                            .send_replace(Some(format!("Last message tokens: {}", usage.total_tokens)));
                    }
                    self.history.push_assistant(completion.text.clone());
                    return Ok(completion.text);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt + 1 < attempts {
                        if let Some(delay) = CHAT_RETRY_SCHEDULE.delay(attempt as usize) {
                            warn!(
                                attempt = attempt + 1,
                                error = %e,
                                delay_secs = delay.as_secs(),
                                "Chat attempt failed, retrying"
                            );
                            last_error = Some(e);
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                    last_error = Some(e);
                    break;
                }
            }
        }

        Err(Error::RetriesExhausted {
            attempts,
            message: last_error
                .map(|e| e.user_message())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    /// Drop the conversation and its token bookkeeping. The shared video
    /// context is untouched; that belongs to the orchestrator.
    pub fn clear_conversation(&mut self) {
        self.history.clear();
        self.last_total_tokens = 0;
        self.usage.send_replace(None);
    }

    fn system_message(&self) -> String {
        let context = self
            .video_ctx
            .lock()
            .map(|ctx| ctx.context_block())
            .unwrap_or_default();
        format!("{SYSTEM_TEMPLATE_HEAD}\n\n{context}\n{SYSTEM_TEMPLATE_TAIL}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatRole, Completion, TokenUsage};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MockClient {
        responses: Mutex<VecDeque<Result<Completion>>>,
        calls: AtomicUsize,
        last_request: Mutex<Vec<ChatMessage>>,
    }

    impl MockClient {
        fn new(responses: Vec<Result<Completion>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerationClient for MockClient {
        async fn complete(
            &self,
            _model: &str,
            messages: Vec<ChatMessage>,
            _api_key: &str,
        ) -> Result<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = messages;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(Error::EmptyCompletion))
        }
    }

    fn reply(text: &str, prompt: u64, completion: u64) -> Result<Completion> {
        Ok(Completion {
            text: text.to_string(),
            usage: Some(TokenUsage::new(prompt, completion)),
        })
    }

    fn server_error() -> Result<Completion> {
        Err(Error::Api {
            code: 503,
            message: "overloaded".into(),
            provider: None,
        })
    }

    fn session(client: Arc<MockClient>) -> ChatSession {
        let mut session = ChatSession::new(client, Arc::new(Mutex::new(VideoContext::default())));
        session.set_model("openai/gpt-4o-mini");
        session.set_api_key("sk-test");
        session
    }

    #[tokio::test]
    async fn test_send_requires_model() {
        let client = MockClient::new(vec![]);
        let mut session = ChatSession::new(
            Arc::clone(&client) as Arc<dyn GenerationClient>,
            Arc::new(Mutex::new(VideoContext::default())),
        );
        session.set_api_key("sk-test");

        let err = session.send("hello").await.unwrap_err();
        assert!(matches!(err, Error::MissingConfig("model")));
        // Config failures never record the turn.
        assert!(session.history().is_empty());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_send_requires_api_key() {
        let client = MockClient::new(vec![]);
        let mut session = ChatSession::new(client, Arc::new(Mutex::new(VideoContext::default())));
        session.set_model("openai/gpt-4o-mini");

        let err = session.send("hello").await.unwrap_err();
        assert!(matches!(err, Error::MissingConfig("API key")));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_send_rejects_unknown_model() {
        let client = MockClient::new(vec![]);
        let mut session = session(client);
        session.set_model("nobody/no-such-model");

        let err = session.send("hello").await.unwrap_err();
        assert!(matches!(err, Error::UnknownModel(_)));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_send_success_records_turn() {
        let client = MockClient::new(vec![reply("hi there", 100, 23)]);
        let mut session = session(Arc::clone(&client));

        let answer = session.send("hello").await.unwrap();
        assert_eq!(answer, "hi there");
        assert_eq!(session.history().len(), 2);
        assert!(session.history().entries()[0].from_user);
        assert!(!session.history().entries()[1].from_user);
        assert_eq!(session.last_total_tokens(), 123);
        assert_eq!(
            session.usage_note(),
            Some("Last message tokens: 123".to_string())
        );
    }

    #[tokio::test]
    async fn test_usage_updates_observed_through_watch() {
        let client = MockClient::new(vec![reply("hi", 100, 23)]);
        let mut session = session(client);
        let mut updates = session.usage_updates();

        session.send("hello").await.unwrap();

        assert!(updates.has_changed().unwrap());
        assert_eq!(
            *updates.borrow_and_update(),
            Some("Last message tokens: 123".to_string())
        );
    }

    #[tokio::test]
    async fn test_system_message_carries_video_context() {
        let client = MockClient::new(vec![reply("about the video", 10, 5)]);
        let ctx = Arc::new(Mutex::new(VideoContext {
            transcript: Some("the words".into()),
            detailed_summary: Some("the summary".into()),
        }));
        let mut session = ChatSession::new(Arc::clone(&client) as Arc<dyn GenerationClient>, ctx);
        session.set_model("openai/gpt-4o-mini");
        session.set_api_key("sk-test");

        session.send("what is this about?").await.unwrap();

        let request = client.last_request.lock().unwrap().clone();
        assert_eq!(request[0].role, ChatRole::System);
        assert!(request[0].content.contains("=== VIDEO CONTEXT ==="));
        assert!(request[0].content.contains("## Detailed Summary\nthe summary"));
        let last = request.last().unwrap();
        assert_eq!(last.role, ChatRole::User);
        assert_eq!(last.content, "what is this about?");
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_walk_the_ladder() {
        let client = MockClient::new(vec![
            server_error(),
            server_error(),
            server_error(),
            reply("finally", 50, 10),
        ]);
        let mut session = session(Arc::clone(&client));

        let start = tokio::time::Instant::now();
        let answer = session.send("hello").await.unwrap();

        assert_eq!(answer, "finally");
        assert_eq!(client.calls.load(Ordering::SeqCst), 4);
        // Waited out the 2s, 5s, and 10s rungs.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(17));
        assert!(elapsed < Duration::from_secs(47));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_fails_fast() {
        let client = MockClient::new(vec![Err(Error::Api {
            code: 401,
            message: "bad key".into(),
            provider: None,
        })]);
        let mut session = session(Arc::clone(&client));

        let start = tokio::time::Instant::now();
        let err = session.send("hello").await.unwrap_err();

        assert!(matches!(err, Error::Api { code: 401, .. }));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        // The user's turn stays recorded even when the reply failed.
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_after_five_attempts() {
        let client = MockClient::new((0..5).map(|_| server_error()).collect());
        let mut session = session(Arc::clone(&client));

        let start = tokio::time::Instant::now();
        let err = session.send("hello").await.unwrap_err();

        match err {
            Error::RetriesExhausted { attempts, message } => {
                assert_eq!(attempts, 5);
                assert!(message.contains("unavailable"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(client.calls.load(Ordering::SeqCst), 5);
        // Four sleeps: 2 + 5 + 10 + 30 seconds.
        assert!(start.elapsed() >= Duration::from_secs(47));
    }

    #[tokio::test]
    async fn test_trim_fires_on_token_pressure() {
        // Model with an 8192-token window. Usage stays low until the tenth
        // response reports 7000 tokens, past the 80% threshold.
        let mut responses: Vec<Result<Completion>> = (0..9)
            .map(|i| reply(&format!("answer {i}"), 600, 100))
            .collect();
        responses.push(reply("answer 9", 6000, 1000));
        responses.push(reply("final", 600, 100));
        let client = MockClient::new(responses);
        let mut session = session(Arc::clone(&client));
        session.set_model("meta-llama/llama-3.1-405b-instruct:free");

        for i in 0..10 {
            session.send(format!("question {i}")).await.unwrap();
        }
        assert_eq!(session.history().len(), 20);

        // The 11th turn trims 20 entries down to 14 (one retired) before
        // recording itself.
        session.send("question 10").await.unwrap();
        assert_eq!(session.history().len(), 16);
        assert_eq!(session.history().active_len(), 15);
        assert!(session.history().entries()[0].retired);

        // Outgoing request: system + 9-entry window + the new user message.
        assert_eq!(client.last_request.lock().unwrap().len(), 11);
    }

    #[tokio::test]
    async fn test_trim_of_ten_messages_retires_none() {
        // Five low-usage turns build a 10-entry history; the fifth response
        // pushes usage past the threshold, so the sixth turn trims 10 down
        // to 7 with nothing retired before recording itself.
        let mut responses: Vec<Result<Completion>> = (0..4)
            .map(|i| reply(&format!("reply {i}"), 600, 100))
            .collect();
        responses.push(reply("reply 4", 6000, 1000));
        responses.push(reply("reply 5", 600, 100));
        let client = MockClient::new(responses);
        let mut session = session(Arc::clone(&client));
        session.set_model("meta-llama/llama-3.1-405b-instruct:free");

        for i in 0..5 {
            session.send(format!("question {i}")).await.unwrap();
        }
        assert_eq!(session.history().len(), 10);

        session.send("question 5").await.unwrap();
        assert_eq!(session.history().len(), 9);
        assert_eq!(session.history().active_len(), 9);
        assert_eq!(session.history().entries()[0].content, "reply 1");

        // Outgoing request: system + 4-entry window + the new user message.
        assert_eq!(client.last_request.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_clear_conversation_resets_bookkeeping() {
        let client = MockClient::new(vec![reply("hi", 100, 23)]);
        let mut session = session(client);

        session.send("hello").await.unwrap();
        assert!(!session.history().is_empty());

        session.clear_conversation();
        assert!(session.history().is_empty());
        assert_eq!(session.last_total_tokens(), 0);
        assert!(session.usage_note().is_none());
    }
}
