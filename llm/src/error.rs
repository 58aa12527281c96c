use crate::Provider;
use thiserror::Error;

/// Errors that can occur when calling a backend.
///
/// None of these are retried by the client; callers decide what a failure means.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key not configured for {provider} (set {var})")]
    NoApiKey { provider: Provider, var: &'static str },

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{provider} returned no text content")]
    EmptyResponse { provider: Provider },
}

impl LlmError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Network(format!("request timed out: {err}"))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LlmError::NoApiKey {
            provider: Provider::OpenAi,
            var: "OPENAI_API_KEY",
        };
        assert_eq!(
            err.to_string(),
            "API key not configured for openai (set OPENAI_API_KEY)"
        );

        let err = LlmError::Api {
            status: 529,
            message: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "API error (status 529): overloaded");
    }
}
