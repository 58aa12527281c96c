//! One PL action and GM narration exchange.

use crate::agents::Agents;
use crate::error::Result;
use crate::history::ConversationHistory;
use crate::log::{LogEntry, SessionLog};
use crate::markers;
use crate::prompts::{self, CORRECTIVE_INSTRUCTION};
use crate::validator::{Validator, Violation};

/// Result of a single turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The PL text forwarded to the GM: the retry if one was made.
    pub pl_text: String,
    pub pl_was_retried: bool,
    pub gm_text: String,
    /// The GM reply carries the end-of-session marker.
    pub session_should_end: bool,
    /// Why the first PL reply was rejected, if it was.
    pub violation: Option<Violation>,
}

/// Inputs for one turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnRequest<'a> {
    pub number: u32,
    /// The narration the PL is reacting to.
    pub last_gm_text: &'a str,
    /// Out-of-band steering text appended to the GM's input.
    pub orchestrator_note: Option<&'a str>,
}

impl<'a> TurnRequest<'a> {
    pub fn new(number: u32, last_gm_text: &'a str) -> Self {
        Self {
            number,
            last_gm_text,
            orchestrator_note: None,
        }
    }

    pub fn with_note(mut self, note: Option<&'a str>) -> Self {
        self.orchestrator_note = note;
        self
    }
}

/// Run one turn.
///
/// A PL reply that fails validation gets exactly one corrective retry. The retry is
/// used as-is, valid or not. Invocation failures propagate unchanged.
pub async fn run_turn(
    agents: &Agents,
    validator: &Validator,
    log: &mut dyn SessionLog,
    gm_history: &mut ConversationHistory,
    pl_history: &mut ConversationHistory,
    request: TurnRequest<'_>,
) -> Result<TurnOutcome> {
    let turn = request.number;

    pl_history.push_user(prompts::narration_for_player(request.last_gm_text));
    let mut pl_text = agents.act(pl_history).await?;
    pl_history.push_assistant(pl_text.clone());
    log.record(&LogEntry::PlayerAction {
        turn,
        text: pl_text.clone(),
        retry: false,
    })?;

    let violation = validator.validate(&pl_text).into_violation();
    if let Some(ref violation) = violation {
        tracing::warn!(turn, rule = %violation.rule, "PL reply broke the format, retrying once");
        log.record(&LogEntry::Anomaly {
            turn,
            rule: violation.rule.clone(),
            reason: violation.reason.clone(),
        })?;

        pl_history.push_user(CORRECTIVE_INSTRUCTION);
        pl_text = agents.act(pl_history).await?;
        pl_history.push_assistant(pl_text.clone());
        log.record(&LogEntry::PlayerAction {
            turn,
            text: pl_text.clone(),
            retry: true,
        })?;
    }

    gm_history.push_user(prompts::action_for_gm(&pl_text, request.orchestrator_note));
    let gm_text = agents.narrate(gm_history).await?;
    gm_history.push_assistant(gm_text.clone());
    log.record(&LogEntry::GmNarration {
        turn,
        text: gm_text.clone(),
    })?;

    Ok(TurnOutcome {
        pl_was_retried: violation.is_some(),
        session_should_end: markers::declares_session_end(&gm_text),
        pl_text,
        gm_text,
        violation,
    })
}
