//! Minimal chat clients for the Anthropic Messages API and the OpenAI Chat Completions API.
//!
//! Both clients implement [`Backend`], a single text-in, text-out capability:
//! given a system prompt and a user/assistant transcript, return the reply text.
//! Failures are reported as [`LlmError`] and never retried here.

mod anthropic;
mod error;
mod message;
mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use anthropic::Anthropic;
pub use error::LlmError;
pub use message::{Message, Role};
pub use openai::OpenAi;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A text-generation backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Generate a reply to the conversation in `request`.
    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError>;

    /// Which provider serves this backend.
    fn provider(&self) -> Provider;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;
}

/// A single generation request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub max_tokens: usize,
}

impl GenerateRequest {
    /// Create a request with the given system prompt and transcript.
    pub fn new(system: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            system: system.into(),
            messages,
            max_tokens: 1000,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    /// Environment variable holding the provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::OpenAi => write!(f, "openai"),
        }
    }
}

impl FromStr for Provider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" | "chatgpt" => Ok(Provider::OpenAi),
            other => Err(LlmError::Config(format!("unknown provider: {other}"))),
        }
    }
}

/// Build a backend for `provider`, reading its API key from the environment.
pub fn from_env(provider: Provider, model: impl Into<String>) -> Result<Box<dyn Backend>, LlmError> {
    let backend: Box<dyn Backend> = match provider {
        Provider::Anthropic => Box::new(Anthropic::from_env(model)?),
        Provider::OpenAi => Box::new(OpenAi::from_env(model)?),
    };
    Ok(backend)
}

fn read_api_key(provider: Provider) -> Result<String, LlmError> {
    let var = provider.api_key_var();
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(LlmError::NoApiKey { provider, var }),
    }
}

fn http_client() -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {e}")))
}
