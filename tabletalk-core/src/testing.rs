//! Test doubles for driving campaigns without network access.
//!
//! - [`ScriptedBackend`] replays queued replies and records every request
//! - [`ScriptedSupervisor`] replays queued human decisions and records what it was shown

use crate::agents::Agents;
use crate::error::Result;
use crate::prompts::Prompts;
use crate::session::SessionResult;
use crate::supervisor::{SessionDecision, SheetDecision, Supervisor, TurnDecision, TurnReport};
use async_trait::async_trait;
use llm::{Backend, GenerateRequest, LlmError, Provider};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A backend that returns scripted replies in order.
///
/// Clones share one script, so a test can keep a handle after boxing a clone into
/// [`Agents`]. Once the script runs out every call fails with a network error.
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
    provider: Provider,
    model: String,
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<std::result::Result<String, LlmError>>,
    requests: Vec<GenerateRequest>,
}

impl ScriptedBackend {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let script = Script {
            replies: replies.into_iter().map(|r| Ok(r.into())).collect(),
            requests: Vec::new(),
        };
        Self {
            script: Arc::new(Mutex::new(script)),
            provider: Provider::Anthropic,
            model: "scripted".to_string(),
        }
    }

    pub fn with_model(mut self, provider: Provider, model: impl Into<String>) -> Self {
        self.provider = provider;
        self.model = model.into();
        self
    }

    /// Queue another reply.
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock().replies.push_back(Ok(reply.into()));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: LlmError) {
        self.lock().replies.push_back(Err(error));
    }

    /// Number of generate calls so far.
    pub fn calls(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.lock().requests.clone()
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.lock().requests.last().cloned()
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lock().replies.len()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn generate(&self, request: GenerateRequest) -> std::result::Result<String, LlmError> {
        let mut script = self.lock();
        script.requests.push(request);
        script
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Network("script exhausted".to_string())))
    }

    fn provider(&self) -> Provider {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Agents over two scripted backends with the default prompts.
pub fn scripted_agents(gm: &ScriptedBackend, pl: &ScriptedBackend) -> Agents {
    Agents::new(Box::new(gm.clone()), Box::new(pl.clone()), Prompts::default())
}

/// A supervisor that replays queued decisions.
///
/// When a queue runs dry it accepts the sheet, continues turns and ends the campaign.
#[derive(Debug, Default)]
pub struct ScriptedSupervisor {
    sheet_decisions: VecDeque<SheetDecision>,
    turn_decisions: VecDeque<TurnDecision>,
    session_decisions: VecDeque<SessionDecision>,
    sheets: Vec<String>,
    turns: Vec<TurnReport>,
    hooks: Vec<String>,
}

impl ScriptedSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet_decisions(mut self, decisions: impl IntoIterator<Item = SheetDecision>) -> Self {
        self.sheet_decisions.extend(decisions);
        self
    }

    pub fn with_turn_decisions(mut self, decisions: impl IntoIterator<Item = TurnDecision>) -> Self {
        self.turn_decisions.extend(decisions);
        self
    }

    pub fn with_session_decisions(
        mut self,
        decisions: impl IntoIterator<Item = SessionDecision>,
    ) -> Self {
        self.session_decisions.extend(decisions);
        self
    }

    /// Sheets shown at the character review checkpoint.
    pub fn sheets(&self) -> &[String] {
        &self.sheets
    }

    /// Reports shown at the post-turn checkpoint.
    pub fn turns(&self) -> &[TurnReport] {
        &self.turns
    }

    /// Hooks shown at the post-session checkpoint.
    pub fn hooks(&self) -> &[String] {
        &self.hooks
    }
}

#[async_trait]
impl Supervisor for ScriptedSupervisor {
    async fn review_sheet(&mut self, _attempt: u32, sheet: &str) -> Result<SheetDecision> {
        self.sheets.push(sheet.to_string());
        Ok(self.sheet_decisions.pop_front().unwrap_or(SheetDecision::Accept))
    }

    async fn after_turn(&mut self, report: &TurnReport) -> Result<TurnDecision> {
        self.turns.push(report.clone());
        Ok(self.turn_decisions.pop_front().unwrap_or(TurnDecision::Continue))
    }

    async fn after_session(
        &mut self,
        _session: u32,
        _result: &SessionResult,
        hook: &str,
    ) -> Result<SessionDecision> {
        self.hooks.push(hook.to_string());
        Ok(self.session_decisions.pop_front().unwrap_or(SessionDecision::End))
    }
}
