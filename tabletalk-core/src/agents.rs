//! Agent invocation: maps (role, history) to a reply through a configured backend.
//!
//! Holds no conversation state. Histories are owned by the controllers and passed in.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::history::ConversationHistory;
use crate::prompts::{self, Prompts};
use llm::{Backend, GenerateRequest, Message};
use std::fmt;

/// Token limit for the PL's character sheet.
const CHARACTER_SHEET_TOKENS: usize = 800;

/// Token limit for the PL's next-session hook.
const HOOK_TOKENS: usize = 500;

/// Token limit for end-of-campaign feedback.
const FEEDBACK_TOKENS: usize = 1000;

const PING_PROMPT: &str = "Reply with the single word: connected";

/// The two roles at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    GameMaster,
    Player,
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRole::GameMaster => write!(f, "GM"),
            AgentRole::Player => write!(f, "PL"),
        }
    }
}

/// Both agents, their prompts, and per-role token limits.
pub struct Agents {
    gm: Box<dyn Backend>,
    pl: Box<dyn Backend>,
    prompts: Prompts,
    gm_max_tokens: usize,
    pl_max_tokens: usize,
}

impl Agents {
    /// Create agents over the given backends.
    pub fn new(gm: Box<dyn Backend>, pl: Box<dyn Backend>, prompts: Prompts) -> Self {
        Self {
            gm,
            pl,
            prompts,
            gm_max_tokens: 2000,
            pl_max_tokens: 500,
        }
    }

    /// Create agents from configuration, reading API keys from the environment.
    pub fn from_config(config: &Config, prompts: Prompts) -> Result<Self> {
        let gm = llm::from_env(config.gm.provider, &config.gm.model).map_err(|source| {
            Error::Backend {
                role: AgentRole::GameMaster,
                source,
            }
        })?;
        let pl = llm::from_env(config.pl.provider, &config.pl.model).map_err(|source| {
            Error::Backend {
                role: AgentRole::Player,
                source,
            }
        })?;

        Ok(Self::new(gm, pl, prompts).with_max_tokens(config.gm.max_tokens, config.pl.max_tokens))
    }

    /// Set in-session token limits for the GM and PL.
    pub fn with_max_tokens(mut self, gm: usize, pl: usize) -> Self {
        self.gm_max_tokens = gm;
        self.pl_max_tokens = pl;
        self
    }

    pub fn backend(&self, role: AgentRole) -> &dyn Backend {
        match role {
            AgentRole::GameMaster => self.gm.as_ref(),
            AgentRole::Player => self.pl.as_ref(),
        }
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    /// GM narration over its history.
    pub async fn narrate(&self, gm_history: &ConversationHistory) -> Result<String> {
        self.invoke(
            AgentRole::GameMaster,
            &self.prompts.gm_system,
            gm_history.to_vec(),
            self.gm_max_tokens,
        )
        .await
    }

    /// PL in-character reply over its history.
    pub async fn act(&self, pl_history: &ConversationHistory) -> Result<String> {
        self.invoke(
            AgentRole::Player,
            &self.prompts.pl_system,
            pl_history.to_vec(),
            self.pl_max_tokens,
        )
        .await
    }

    /// PL authors a character and opening situation. One-shot: no history.
    pub async fn author_character(&self, scenario: &str) -> Result<String> {
        self.invoke(
            AgentRole::Player,
            &self.prompts.pl_character,
            vec![Message::user(prompts::character_request(scenario))],
            CHARACTER_SHEET_TOKENS,
        )
        .await
    }

    /// PL reflects on the session's closing narration and proposes a hook. One-shot.
    pub async fn propose_hook(&self, final_gm_text: &str) -> Result<String> {
        self.invoke(
            AgentRole::Player,
            &self.prompts.pl_system,
            vec![Message::user(prompts::hook_request(final_gm_text))],
            HOOK_TOKENS,
        )
        .await
    }

    /// Out-of-character feedback from `role` over its own full history.
    ///
    /// The request is appended to a copy; the caller's history is left untouched.
    pub async fn feedback(&self, role: AgentRole, history: &ConversationHistory) -> Result<String> {
        let mut messages = history.to_vec();
        messages.push(Message::user(prompts::feedback_request(
            role == AgentRole::GameMaster,
        )));
        let system = match role {
            AgentRole::GameMaster => &self.prompts.gm_system,
            AgentRole::Player => &self.prompts.pl_system,
        };
        self.invoke(role, system, messages, FEEDBACK_TOKENS).await
    }

    /// Minimal round trip to check that a backend is reachable.
    pub async fn ping(&self, role: AgentRole) -> Result<String> {
        self.invoke(role, "", vec![Message::user(PING_PROMPT)], 20)
            .await
    }

    async fn invoke(
        &self,
        role: AgentRole,
        system: &str,
        messages: Vec<Message>,
        max_tokens: usize,
    ) -> Result<String> {
        let backend = self.backend(role);
        tracing::debug!(
            %role,
            provider = %backend.provider(),
            model = backend.model(),
            messages = messages.len(),
            "invoking agent"
        );

        let request = GenerateRequest::new(system, messages).with_max_tokens(max_tokens);
        backend
            .generate(request)
            .await
            .map_err(|source| Error::Invocation { role, source })
    }
}
