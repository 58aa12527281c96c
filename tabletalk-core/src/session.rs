//! Session controller.
//!
//! A session runs an opening narration and then turns until the human quits, the GM
//! declares the end, or the turn limit is reached. [`SessionRun`] is the explicit state
//! machine; [`run_session`] drives one with a [`Supervisor`].

use crate::agents::Agents;
use crate::error::{Error, Result};
use crate::history::ConversationHistory;
use crate::log::{LogEntry, SessionLog};
use crate::markers;
use crate::supervisor::{Supervisor, TurnDecision, TurnReport};
use crate::turn::{run_turn, TurnRequest};
use crate::validator::Validator;
use std::fmt;

/// Why a session ended. Every session ends for exactly one reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndReason {
    HumanInterrupt,
    GmDeclaredEnd,
    TurnLimitReached,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::HumanInterrupt => write!(f, "stopped by the human"),
            EndReason::GmDeclaredEnd => write!(f, "the GM declared the end of the session"),
            EndReason::TurnLimitReached => write!(f, "turn limit reached"),
        }
    }
}

/// Result of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    pub turns_taken: u32,
    pub end_reason: EndReason,
    /// The last GM narration, input to the PL's hook.
    pub final_gm_text: String,
}

/// Where a [`SessionRun`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingFirstNarration,
    InTurnLoop,
    /// Suspended at the post-turn checkpoint until [`SessionRun::resume`].
    Paused,
    Ended,
}

/// What [`SessionRun::advance`] stopped at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    AwaitingDecision(TurnReport),
    Ended(SessionResult),
}

/// One session in progress.
///
/// Borrows the campaign's GM history and owns a fresh PL history.
pub struct SessionRun<'a> {
    agents: &'a Agents,
    validator: &'a Validator,
    gm_history: &'a mut ConversationHistory,
    pl_history: ConversationHistory,
    seed: String,
    number: u32,
    turn_limit: u32,
    turns_taken: u32,
    last_gm_text: String,
    pending_note: Option<String>,
    state: SessionState,
    result: Option<SessionResult>,
}

impl<'a> SessionRun<'a> {
    pub fn new(
        agents: &'a Agents,
        validator: &'a Validator,
        gm_history: &'a mut ConversationHistory,
        seed: impl Into<String>,
        turn_limit: u32,
    ) -> Self {
        Self {
            agents,
            validator,
            gm_history,
            pl_history: ConversationHistory::new(),
            seed: seed.into(),
            number: 1,
            turn_limit,
            turns_taken: 0,
            last_gm_text: String::new(),
            pending_note: None,
            state: SessionState::AwaitingFirstNarration,
            result: None,
        }
    }

    /// Session number within the campaign, for logging.
    pub fn with_number(mut self, number: u32) -> Self {
        self.number = number;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn turns_taken(&self) -> u32 {
        self.turns_taken
    }

    pub fn pl_history(&self) -> &ConversationHistory {
        &self.pl_history
    }

    /// Give up the session's PL history.
    pub fn into_pl_history(self) -> ConversationHistory {
        self.pl_history
    }

    /// Run until the next checkpoint or the end of the session.
    ///
    /// Fails with [`Error::Protocol`] while paused.
    pub async fn advance(&mut self, log: &mut dyn SessionLog) -> Result<Progress> {
        loop {
            match self.state {
                SessionState::AwaitingFirstNarration => {
                    if let Some(progress) = self.open(log).await? {
                        return Ok(progress);
                    }
                }
                SessionState::InTurnLoop => return self.play_turn(log).await,
                SessionState::Paused => {
                    return Err(Error::Protocol(format!(
                        "session {} is paused after turn {}; resume it with a decision first",
                        self.number, self.turns_taken
                    )));
                }
                SessionState::Ended => {
                    return self.result.clone().map(Progress::Ended).ok_or_else(|| {
                        Error::Protocol(format!("session {} ended without a result", self.number))
                    });
                }
            }
        }
    }

    /// Apply the human's decision at the post-turn checkpoint.
    pub fn resume(&mut self, decision: TurnDecision, log: &mut dyn SessionLog) -> Result<()> {
        if self.state != SessionState::Paused {
            return Err(Error::Protocol(format!(
                "session {} is not awaiting a decision",
                self.number
            )));
        }

        match decision {
            TurnDecision::Continue => self.state = SessionState::InTurnLoop,
            TurnDecision::Instruct(instruction) => {
                log.record(&LogEntry::Intervention {
                    session: self.number,
                    turn: Some(self.turns_taken),
                    instruction: instruction.clone(),
                })?;
                self.pending_note = Some(instruction);
                self.state = SessionState::InTurnLoop;
            }
            TurnDecision::Quit => {
                self.finish(log, EndReason::HumanInterrupt)?;
            }
        }
        Ok(())
    }

    /// Drive the session to its end, asking `supervisor` at every checkpoint.
    pub async fn run_to_end(
        &mut self,
        log: &mut dyn SessionLog,
        supervisor: &mut dyn Supervisor,
    ) -> Result<SessionResult> {
        loop {
            match self.advance(log).await? {
                Progress::AwaitingDecision(report) => {
                    let decision = supervisor.after_turn(&report).await?;
                    self.resume(decision, log)?;
                }
                Progress::Ended(result) => return Ok(result),
            }
        }
    }

    async fn open(&mut self, log: &mut dyn SessionLog) -> Result<Option<Progress>> {
        tracing::info!(session = self.number, turn_limit = self.turn_limit, "session starting");
        log.record(&LogEntry::SessionStart {
            session: self.number,
            seed: self.seed.clone(),
        })?;

        self.gm_history.push_user(self.seed.clone());
        let opening = self.agents.narrate(self.gm_history).await?;
        self.gm_history.push_assistant(opening.clone());
        log.record(&LogEntry::Opening {
            session: self.number,
            text: opening.clone(),
        })?;
        self.last_gm_text = opening;

        if markers::declares_session_end(&self.last_gm_text) {
            return self.finish(log, EndReason::GmDeclaredEnd).map(Some);
        }
        if self.turn_limit == 0 {
            return self.finish(log, EndReason::TurnLimitReached).map(Some);
        }
        self.state = SessionState::InTurnLoop;
        Ok(None)
    }

    async fn play_turn(&mut self, log: &mut dyn SessionLog) -> Result<Progress> {
        let turn = self.turns_taken + 1;
        log.record(&LogEntry::TurnStart { turn })?;

        let note = self.pending_note.take();
        let request = TurnRequest::new(turn, &self.last_gm_text).with_note(note.as_deref());
        let outcome = run_turn(
            self.agents,
            self.validator,
            log,
            self.gm_history,
            &mut self.pl_history,
            request,
        )
        .await?;

        self.turns_taken = turn;
        self.last_gm_text = outcome.gm_text.clone();

        if outcome.session_should_end {
            return self.finish(log, EndReason::GmDeclaredEnd);
        }
        if self.turns_taken >= self.turn_limit {
            return self.finish(log, EndReason::TurnLimitReached);
        }

        self.state = SessionState::Paused;
        Ok(Progress::AwaitingDecision(TurnReport {
            session: self.number,
            turn,
            turn_limit: self.turn_limit,
            outcome,
        }))
    }

    fn finish(&mut self, log: &mut dyn SessionLog, reason: EndReason) -> Result<Progress> {
        let result = SessionResult {
            turns_taken: self.turns_taken,
            end_reason: reason,
            final_gm_text: self.last_gm_text.clone(),
        };
        log.record(&LogEntry::SessionEnd {
            session: self.number,
            turns: self.turns_taken,
            reason,
        })?;
        tracing::info!(session = self.number, turns = self.turns_taken, %reason, "session ended");

        self.state = SessionState::Ended;
        self.result = Some(result.clone());
        Ok(Progress::Ended(result))
    }
}

/// Run one session from `seed` to its end.
///
/// The GM history grows by the seed plus `2N + 1` messages for `N` turns taken.
pub async fn run_session(
    agents: &Agents,
    validator: &Validator,
    gm_history: &mut ConversationHistory,
    seed: impl Into<String>,
    turn_limit: u32,
    log: &mut dyn SessionLog,
    supervisor: &mut dyn Supervisor,
) -> Result<SessionResult> {
    SessionRun::new(agents, validator, gm_history, seed, turn_limit)
        .run_to_end(log, supervisor)
        .await
}
