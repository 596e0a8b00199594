//! Generation client trait and the OpenRouter implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{Error, Result};

use super::types::{ChatMessage, Completion, CompletionRequest, TokenUsage};

/// Single-shot "produce text for a prompt under a model" operation.
///
/// Implementations report failures through [`Error`]; retry-worthiness is
/// answered by [`Error::is_retryable`], callers decide whether and when to
/// re-issue.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Request one completion for the given message list.
    async fn complete(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        api_key: &str,
    ) -> Result<Completion>;
}

/// Client for the OpenRouter chat completions API.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: Client,
    base_url: String,
    referer: String,
    app_title: String,
}

impl OpenRouterClient {
    const DEFAULT_BASE_URL: &'static str = "https://openrouter.ai/api/v1";
    const DEFAULT_TIMEOUT_SECS: u64 = 120;

    pub fn new() -> Self {
        Self {
            http: build_http_client(Self::DEFAULT_TIMEOUT_SECS),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            referer: "https://github.com/recap-ai/recap".to_string(),
            app_title: "Recap".to_string(),
        }
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the `HTTP-Referer` / `X-Title` attribution headers.
    pub fn with_app(mut self, referer: impl Into<String>, title: impl Into<String>) -> Self {
        self.referer = referer.into();
        self.app_title = title.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.http = build_http_client(secs);
        self
    }
}

impl Default for OpenRouterClient {
    fn default() -> Self {
        Self::new()
    }
}

fn build_http_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

#[async_trait]
impl GenerationClient for OpenRouterClient {
    async fn complete(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        api_key: &str,
    ) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = CompletionRequest::new(model, messages);

        debug!(model, message_count = request.messages.len(), "Sending completion request");

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.app_title)
            .json(&request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        let completion = parse_completion(status, &body);
        match &completion {
            Ok(c) => {
                if let Some(usage) = c.usage {
                    debug!(
                        prompt = usage.prompt_tokens,
                        completion = usage.completion_tokens,
                        total = usage.total_tokens,
                        "Completion received"
                    );
                }
            }
            Err(e) => error!(status, error = %e, "Completion request failed"),
        }

        completion
    }
}

// OpenRouter wire types. Errors can arrive embedded in a 200 body, so the
// response shape carries both branches.

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Option<Vec<ApiChoice>>,
    #[serde(default)]
    usage: Option<TokenUsage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    metadata: Option<ApiErrorMetadata>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorMetadata {
    #[serde(default)]
    provider_name: Option<String>,
}

/// Turn an HTTP status plus response body into a [`Completion`].
fn parse_completion(status: u16, body: &str) -> Result<Completion> {
    let parsed: ApiResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) if (200..300).contains(&status) => return Err(Error::Json(e)),
        Err(_) => {
            return Err(Error::Api {
                code: status,
                message: body.trim().to_string(),
                provider: None,
            })
        }
    };

    if let Some(err) = parsed.error {
        return Err(Error::Api {
            code: err.code.unwrap_or(status),
            message: err.message.unwrap_or_else(|| "Unknown error".to_string()),
            provider: err.metadata.and_then(|m| m.provider_name),
        });
    }

    if !(200..300).contains(&status) {
        return Err(Error::Api {
            code: status,
            message: body.trim().to_string(),
            provider: None,
        });
    }

    let text = parsed
        .choices
        .and_then(|choices| choices.into_iter().next())
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .ok_or(Error::EmptyCompletion)?;

    Ok(Completion {
        text,
        usage: parsed.usage,
    })
}
