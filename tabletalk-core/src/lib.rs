//! Turn orchestration for a two-agent tabletop role-playing session.
//!
//! This crate provides:
//! - A turn controller that validates PL replies and retries once on role bleed
//! - An explicit session state machine with a human checkpoint after every turn
//! - A campaign controller chaining sessions through player-authored hooks
//! - An append-only markdown session log
//!
//! # Quick Start
//!
//! ```ignore
//! use tabletalk_core::{Agents, Autopilot, Campaign, Config, FileLog, Prompts};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default().with_max_turns(10);
//!     let agents = Agents::from_config(&config, Prompts::default())?;
//!
//!     let mut log = FileLog::create(&config.log_dir)?;
//!     let mut campaign = Campaign::new(&config, agents);
//!     let summary = campaign
//!         .run("Investigate the missing caravan", &mut log, &mut Autopilot::new(1))
//!         .await?;
//!
//!     println!("{} turns played", summary.total_turns);
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod campaign;
pub mod config;
pub mod error;
pub mod history;
pub mod log;
pub mod markers;
pub mod prompts;
pub mod session;
pub mod supervisor;
pub mod testing;
pub mod turn;
pub mod validator;

// Primary public API
pub use agents::{AgentRole, Agents};
pub use campaign::{Campaign, CampaignState, CampaignSummary};
pub use config::{AgentConfig, Config, ConfigFile};
pub use error::{Error, Result};
pub use history::ConversationHistory;
pub use log::{FileLog, LogEntry, MemoryLog, SessionLog};
pub use prompts::Prompts;
pub use session::{run_session, EndReason, Progress, SessionResult, SessionRun, SessionState};
pub use supervisor::{
    Autopilot, SessionDecision, SheetDecision, Supervisor, TurnDecision, TurnReport,
};
pub use turn::{run_turn, TurnOutcome, TurnRequest};
pub use validator::{validate, Rule, Validator, Verdict, Violation};
