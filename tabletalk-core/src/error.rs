//! Errors from the orchestration core.

use crate::agents::AgentRole;
use llm::LlmError;
use thiserror::Error;

/// Errors from campaign, session and turn operations.
///
/// Malformed agent output is not an error: the turn controller recovers it locally.
#[derive(Debug, Error)]
pub enum Error {
    /// A backend call failed. Fatal to the run and never retried.
    #[error("{role} invocation failed: {source}")]
    Invocation {
        role: AgentRole,
        #[source]
        source: LlmError,
    },

    #[error("Could not set up the {role} backend: {source}")]
    Backend {
        role: AgentRole,
        #[source]
        source: LlmError,
    },

    #[error("Log write failed: {0}")]
    Log(#[source] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A controller was driven out of order, e.g. advanced while awaiting a decision.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for orchestration operations.
pub type Result<T> = std::result::Result<T, Error>;
