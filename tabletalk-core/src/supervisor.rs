//! Human checkpoints.
//!
//! The controllers suspend at three points and wait for a decision: after the
//! character sheet is authored, after every turn that did not end the session, and
//! after every session. A [`Supervisor`] answers them.

use crate::error::Result;
use crate::markers::{QUIT, REGENERATE};
use crate::session::SessionResult;
use crate::turn::TurnOutcome;
use async_trait::async_trait;

/// Decision at the post-turn checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnDecision {
    Continue,
    /// Steering text appended to the GM's next input.
    Instruct(String),
    Quit,
}

impl TurnDecision {
    /// Parse a line typed at the prompt: empty continues, `q` quits, anything else instructs.
    pub fn from_line(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            TurnDecision::Continue
        } else if line.eq_ignore_ascii_case(QUIT) {
            TurnDecision::Quit
        } else {
            TurnDecision::Instruct(line.to_string())
        }
    }
}

/// Decision at the post-session checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionDecision {
    /// Next session seeded with the hook as-is.
    Continue,
    /// Next session seeded with the hook plus an instruction.
    ContinueWith(String),
    /// Ask the PL for a new hook and decide again.
    RegenerateHook,
    End,
}

impl SessionDecision {
    pub fn from_line(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            SessionDecision::Continue
        } else if line.eq_ignore_ascii_case(QUIT) {
            SessionDecision::End
        } else if line.eq_ignore_ascii_case(REGENERATE) {
            SessionDecision::RegenerateHook
        } else {
            SessionDecision::ContinueWith(line.to_string())
        }
    }
}

/// Decision at the character review checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetDecision {
    Accept,
    Regenerate,
    Quit,
}

impl SheetDecision {
    pub fn from_line(line: &str) -> Self {
        let line = line.trim();
        if line.eq_ignore_ascii_case(QUIT) {
            SheetDecision::Quit
        } else if line.eq_ignore_ascii_case(REGENERATE) {
            SheetDecision::Regenerate
        } else {
            SheetDecision::Accept
        }
    }
}

/// What a paused session presents at the post-turn checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub session: u32,
    pub turn: u32,
    pub turn_limit: u32,
    pub outcome: TurnOutcome,
}

/// The human side of the table.
#[async_trait]
pub trait Supervisor: Send {
    /// Review the PL's character sheet before the campaign starts.
    async fn review_sheet(&mut self, attempt: u32, sheet: &str) -> Result<SheetDecision>;

    /// Decide how to continue after a turn.
    async fn after_turn(&mut self, report: &TurnReport) -> Result<TurnDecision>;

    /// Decide whether to run another session, given the PL's proposed hook.
    async fn after_session(
        &mut self,
        session: u32,
        result: &SessionResult,
        hook: &str,
    ) -> Result<SessionDecision>;
}

/// Unattended play: accepts the first sheet, never interrupts, stops after a fixed
/// number of sessions.
#[derive(Debug, Clone, Copy)]
pub struct Autopilot {
    sessions: u32,
}

impl Autopilot {
    pub fn new(sessions: u32) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl Supervisor for Autopilot {
    async fn review_sheet(&mut self, _attempt: u32, _sheet: &str) -> Result<SheetDecision> {
        Ok(SheetDecision::Accept)
    }

    async fn after_turn(&mut self, _report: &TurnReport) -> Result<TurnDecision> {
        Ok(TurnDecision::Continue)
    }

    async fn after_session(
        &mut self,
        session: u32,
        _result: &SessionResult,
        _hook: &str,
    ) -> Result<SessionDecision> {
        if session < self.sessions {
            Ok(SessionDecision::Continue)
        } else {
            Ok(SessionDecision::End)
        }
    }
}
