//! Campaign controller.
//!
//! A campaign is a chain of sessions over one continuous GM history. Between sessions
//! only the PL's hook carries over; the PL starts every session with an empty history.

use crate::agents::{AgentRole, Agents};
use crate::config::Config;
use crate::error::Result;
use crate::history::ConversationHistory;
use crate::log::{LogEntry, SessionLog};
use crate::prompts;
use crate::session::{EndReason, SessionResult, SessionRun};
use crate::supervisor::{SessionDecision, SheetDecision, Supervisor};
use crate::validator::Validator;

/// Campaign-wide state, mutated only between sessions.
#[derive(Debug, Clone, Default)]
pub struct CampaignState {
    pub session_count: u32,
    pub total_turns: u32,
    /// Never reset for the life of the campaign.
    pub gm_history: ConversationHistory,
    pub carried_hook: Option<String>,
    pub character_sheet: Option<String>,
    /// PL history of the most recent session.
    pub last_pl_history: ConversationHistory,
}

/// What a finished campaign produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignSummary {
    pub sessions: u32,
    pub total_turns: u32,
    pub gm_feedback: Option<String>,
    pub pl_feedback: Option<String>,
}

/// Runs sessions back to back until the human ends the campaign.
pub struct Campaign {
    agents: Agents,
    validator: Validator,
    max_turns: u32,
    session_feedback: bool,
    state: CampaignState,
}

impl Campaign {
    pub fn new(config: &Config, agents: Agents) -> Self {
        Self {
            agents,
            validator: Validator::standard(),
            max_turns: config.max_turns,
            session_feedback: config.session_feedback,
            state: CampaignState::default(),
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn state(&self) -> &CampaignState {
        &self.state
    }

    pub fn agents(&self) -> &Agents {
        &self.agents
    }

    /// Run a whole campaign from a scenario template.
    pub async fn run(
        &mut self,
        scenario: &str,
        log: &mut dyn SessionLog,
        supervisor: &mut dyn Supervisor,
    ) -> Result<CampaignSummary> {
        log.record(&LogEntry::Scenario {
            text: scenario.to_string(),
        })?;

        let Some(sheet) = self.author_character(scenario, log, supervisor).await? else {
            tracing::info!("character rejected, campaign not started");
            return self.finish(log).await;
        };
        let mut seed = prompts::opening_request(scenario, &sheet);
        self.state.character_sheet = Some(sheet);

        loop {
            let session = self.state.session_count + 1;
            let mut run = SessionRun::new(
                &self.agents,
                &self.validator,
                &mut self.state.gm_history,
                seed,
                self.max_turns,
            )
            .with_number(session);
            let result = run.run_to_end(log, supervisor).await?;
            self.state.last_pl_history = run.into_pl_history();
            self.state.session_count = session;
            self.state.total_turns += result.turns_taken;

            if result.end_reason == EndReason::HumanInterrupt {
                break;
            }

            match self.next_seed(session, &result, log, supervisor).await? {
                Some(next) => seed = next,
                None => break,
            }
        }

        self.finish(log).await
    }

    /// PL authors the character; the human accepts, regenerates or quits.
    async fn author_character(
        &mut self,
        scenario: &str,
        log: &mut dyn SessionLog,
        supervisor: &mut dyn Supervisor,
    ) -> Result<Option<String>> {
        let mut attempt = 1;
        loop {
            let sheet = self.agents.author_character(scenario).await?;
            log.record(&LogEntry::CharacterSheet {
                attempt,
                text: sheet.clone(),
            })?;

            match supervisor.review_sheet(attempt, &sheet).await? {
                SheetDecision::Accept => return Ok(Some(sheet)),
                SheetDecision::Regenerate => attempt += 1,
                SheetDecision::Quit => return Ok(None),
            }
        }
    }

    /// PL proposes a hook; the human picks what happens next. `None` ends the campaign.
    async fn next_seed(
        &mut self,
        session: u32,
        result: &SessionResult,
        log: &mut dyn SessionLog,
        supervisor: &mut dyn Supervisor,
    ) -> Result<Option<String>> {
        loop {
            let hook = self.agents.propose_hook(&result.final_gm_text).await?;
            log.record(&LogEntry::Hook {
                session,
                text: hook.clone(),
            })?;

            let decision = supervisor.after_session(session, result, &hook).await?;
            let seed = match decision {
                SessionDecision::RegenerateHook => continue,
                SessionDecision::End => None,
                SessionDecision::Continue => Some(prompts::next_session_request(&hook, None)),
                SessionDecision::ContinueWith(ref instruction) => {
                    log.record(&LogEntry::Intervention {
                        session,
                        turn: None,
                        instruction: instruction.clone(),
                    })?;
                    Some(prompts::next_session_request(&hook, Some(instruction.as_str())))
                }
            };
            self.state.carried_hook = Some(hook);
            return Ok(seed);
        }
    }

    async fn finish(&mut self, log: &mut dyn SessionLog) -> Result<CampaignSummary> {
        let mut summary = CampaignSummary {
            sessions: self.state.session_count,
            total_turns: self.state.total_turns,
            gm_feedback: None,
            pl_feedback: None,
        };

        if self.session_feedback && self.state.session_count > 0 {
            let gm = self
                .agents
                .feedback(AgentRole::GameMaster, &self.state.gm_history)
                .await?;
            log.record(&LogEntry::Feedback {
                role: AgentRole::GameMaster,
                text: gm.clone(),
            })?;

            let pl = self
                .agents
                .feedback(AgentRole::Player, &self.state.last_pl_history)
                .await?;
            log.record(&LogEntry::Feedback {
                role: AgentRole::Player,
                text: pl.clone(),
            })?;

            summary.gm_feedback = Some(gm);
            summary.pl_feedback = Some(pl);
        }

        log.record(&LogEntry::CampaignEnd {
            sessions: summary.sessions,
            total_turns: summary.total_turns,
        })?;
        tracing::info!(
            sessions = summary.sessions,
            total_turns = summary.total_turns,
            "campaign ended"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemoryLog;
    use crate::supervisor::Autopilot;
    use crate::testing::{scripted_agents, ScriptedBackend};

    #[tokio::test]
    async fn test_gm_history_spans_sessions() {
        let gm = ScriptedBackend::new(["Open 1.", "Turn 1.", "Open 2.", "Turn 2."]);
        let pl = ScriptedBackend::new([
            "[PC] Mira",
            "[Action] look",
            "[Next session] the tower",
            "[Action] climb",
            "[Next session] rest",
        ]);
        let agents = scripted_agents(&gm, &pl);
        let config = Config::new().with_max_turns(1).with_session_feedback(false);
        let mut campaign = Campaign::new(&config, agents);
        let mut log = MemoryLog::new();

        let summary = campaign
            .run("Investigate the missing caravan", &mut log, &mut Autopilot::new(2))
            .await
            .unwrap();

        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.total_turns, 2);
        assert_eq!(summary.gm_feedback, None);

        // Two sessions of seed + opening + one turn pair.
        let state = campaign.state();
        assert_eq!(state.gm_history.len(), 8);
        assert_eq!(state.last_pl_history.len(), 2);
        assert_eq!(state.carried_hook.as_deref(), Some("[Next session] rest"));
        assert!(state.gm_history.messages()[4].text.contains("the tower"));
    }
}
