//! Error types for recap-core.

use thiserror::Error;

/// Result type alias using recap-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during summarization and chat operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No caption text could be resolved for a video.
    #[error("no transcript available: {0}")]
    TranscriptUnavailable(String),

    /// Error reported by the generation API, either as an HTTP status or
    /// embedded in the response body.
    #[error("API error (status {code}): {message}")]
    Api {
        code: u16,
        message: String,
        /// Upstream provider that produced the error, when reported.
        provider: Option<String>,
    },

    /// Transport-level request failure.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response contained no completion choices.
    #[error("response contained no completion text")]
    EmptyCompletion,

    /// A required configuration value is absent.
    #[error("no {0} configured")]
    MissingConfig(&'static str),

    /// Model id not present in the catalog.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// Preferences storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// A chat retry ladder was exhausted without a successful response.
    #[error("failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },
}

impl Error {
    /// Whether a failed call is worth re-issuing.
    ///
    /// Rate limits and server-side errors are transient; auth, validation,
    /// and parse failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { code, .. } => matches!(*code, 408 | 429) || (500..=599).contains(code),
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::TranscriptUnavailable(_)
            | Self::Json(_)
            | Self::EmptyCompletion
            | Self::MissingConfig(_)
            | Self::UnknownModel(_)
            | Self::Storage(_)
            | Self::RetriesExhausted { .. } => false,
        }
    }

    /// Short human-readable message suitable for direct display.
    ///
    /// Internal detail (status codes, provider names) stays in `Display`;
    /// this mapping only distinguishes the classes a user can act on.
    pub fn user_message(&self) -> String {
        match self {
            Self::TranscriptUnavailable(_) => {
                "No transcript available for this video".to_string()
            }
            Self::Api { code, message, .. } => friendly_api_message(*code, message),
            Self::Request(e) if e.is_timeout() => {
                "The request timed out. Please try again.".to_string()
            }
            Self::Request(_) => {
                "Could not reach the service. Please check your connection.".to_string()
            }
            Self::Json(_) | Self::EmptyCompletion => {
                "The service returned an unexpected response. Please try again.".to_string()
            }
            Self::MissingConfig(what) => format!("No {what} configured"),
            Self::UnknownModel(id) => format!("Model information not found for {id}"),
            Self::Storage(_) => "Could not access saved settings.".to_string(),
            Self::RetriesExhausted { attempts, message } => {
                format!("Failed after {attempts} attempts: {message}")
            }
        }
    }
}

/// User-friendly wording for API error codes.
fn friendly_api_message(code: u16, message: &str) -> String {
    let lower = message.to_lowercase();
    match code {
        429 => "You've made too many requests. Please wait a moment and try again.".to_string(),
        400 => "Oops! Something went wrong with the input. Please check and try again.".to_string(),
        401 | 403 => "Access denied. Please ensure your API key is valid.".to_string(),
        402 => "Your subscription or credits have expired. Please update your payment information."
            .to_string(),
        404 => "The requested resource could not be found. Please check and try again.".to_string(),
        409 => "This action cannot be completed due to a conflict. Please check your request."
            .to_string(),
        418 => "Request rate exceeded. Please slow down and try again soon.".to_string(),
        422 => "The request could not be processed. Please review your input.".to_string(),
        500 => "The service is temporarily unavailable. Please try again later.".to_string(),
        502..=504 => "The server is currently unavailable. Please try again after some time."
            .to_string(),
        _ if lower.contains("rate limit") => {
            "You've made too many requests. Please wait a moment and try again.".to_string()
        }
        _ if lower.contains("api key") => {
            "Access denied. Please ensure your API key is valid.".to_string()
        }
        _ if lower.contains("context length") => {
            "The conversation is too long. Some older messages will be removed to continue."
                .to_string()
        }
        _ => format!("An error occurred: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_api_codes() {
        for code in [408, 429, 500, 502, 503, 504, 599] {
            let err = Error::Api {
                code,
                message: "boom".into(),
                provider: None,
            };
            assert!(err.is_retryable(), "code {code} should be retryable");
        }

        for code in [400, 401, 402, 403, 404, 409, 418, 422] {
            let err = Error::Api {
                code,
                message: "boom".into(),
                provider: None,
            };
            assert!(!err.is_retryable(), "code {code} should not be retryable");
        }
    }

    #[test]
    fn test_non_retryable_variants() {
        assert!(!Error::TranscriptUnavailable("x".into()).is_retryable());
        assert!(!Error::MissingConfig("API key").is_retryable());
        assert!(!Error::UnknownModel("m".into()).is_retryable());
        assert!(!Error::EmptyCompletion.is_retryable());
    }

    #[test]
    fn test_user_message_classes() {
        let rate_limited = Error::Api {
            code: 429,
            message: "slow down".into(),
            provider: Some("novita".into()),
        };
        assert!(rate_limited.user_message().contains("too many requests"));

        let auth = Error::Api {
            code: 401,
            message: "bad key".into(),
            provider: None,
        };
        assert!(auth.user_message().contains("API key"));

        let generic = Error::Api {
            code: 451,
            message: "blocked".into(),
            provider: None,
        };
        assert_eq!(generic.user_message(), "An error occurred: blocked");
    }

    #[test]
    fn test_user_message_keyword_fallbacks() {
        let err = Error::Api {
            code: 0,
            message: "provider Rate Limit reached".into(),
            provider: None,
        };
        assert!(err.user_message().contains("too many requests"));

        let err = Error::Api {
            code: 0,
            message: "maximum context length exceeded".into(),
            provider: None,
        };
        assert!(err.user_message().contains("too long"));
    }

    #[test]
    fn test_exhausted_message_names_attempts() {
        let err = Error::RetriesExhausted {
            attempts: 5,
            message: "server error".into(),
        };
        assert_eq!(
            err.user_message(),
            "Failed after 5 attempts: server error"
        );
    }
}
