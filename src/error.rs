//! Provider error types.
//!
//! Timeouts and API failures are surfaced to the caller unchanged; the
//! provider performs no retries. Discovery and hook failures never appear
//! here, they are absorbed where they happen.

use async_openai::error::OpenAIError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The network call exceeded the configured timeout.
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: f64 },

    /// Transport or protocol failure from the inference server.
    #[error("API call failed: {0}")]
    Api(#[from] OpenAIError),

    /// Raw HTTP client failure (connectivity probes, client construction).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered 2xx but the payload was not usable.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Short machine-readable tag, used in logs and hook payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Timeout { .. } => "timeout",
            ProviderError::Api(_) => "api",
            ProviderError::Http(_) => "http",
            ProviderError::MalformedResponse(_) => "malformed_response",
        }
    }

    /// Whether a caller could reasonably retry the same request.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ProviderError::Timeout { .. } => true,
            ProviderError::Api(OpenAIError::Reqwest(_)) => true,
            ProviderError::Http(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = ProviderError::Timeout { seconds: 30.0 };
        assert_eq!(err.kind(), "timeout");
        assert!(err.is_recoverable());

        let err = ProviderError::MalformedResponse("no choices".to_string());
        assert_eq!(err.kind(), "malformed_response");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_timeout_message_includes_duration() {
        let err = ProviderError::Timeout { seconds: 2.5 };
        assert!(err.to_string().contains("2.5"));
    }
}
