//! Line-oriented human checkpoints on stdin.

use async_trait::async_trait;
use std::io::Write;
use tabletalk_core::supervisor::{
    SessionDecision, SheetDecision, Supervisor, TurnDecision, TurnReport,
};
use tabletalk_core::{Error, Result, SessionResult};
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};

/// Asks the human at every checkpoint. End of input counts as quitting.
pub struct ConsoleSupervisor {
    lines: Lines<BufReader<Stdin>>,
}

impl ConsoleSupervisor {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(io::stdin()).lines(),
        }
    }

    async fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        print!("\n{text} > ");
        std::io::stdout().flush()?;
        self.lines.next_line().await.map_err(Error::Io)
    }
}

impl Default for ConsoleSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Supervisor for ConsoleSupervisor {
    async fn review_sheet(&mut self, attempt: u32, _sheet: &str) -> Result<SheetDecision> {
        let line = self
            .prompt(&format!(
                "[Character sheet, attempt {attempt}] Enter: accept / r: regenerate / q: quit"
            ))
            .await?;
        Ok(line.map_or(SheetDecision::Quit, |l| SheetDecision::from_line(&l)))
    }

    async fn after_turn(&mut self, report: &TurnReport) -> Result<TurnDecision> {
        let line = self
            .prompt(&format!(
                "[Turn {}/{}] Enter: continue / q: quit / other text: instruction for the GM",
                report.turn, report.turn_limit
            ))
            .await?;
        Ok(line.map_or(TurnDecision::Quit, |l| TurnDecision::from_line(&l)))
    }

    async fn after_session(
        &mut self,
        session: u32,
        result: &SessionResult,
        _hook: &str,
    ) -> Result<SessionDecision> {
        println!("\n{}", session_summary(session, result));
        let line = self
            .prompt("Enter: next session / q: end campaign / r: new hook / other text: next session with instruction")
            .await?;
        Ok(line.map_or(SessionDecision::End, |l| SessionDecision::from_line(&l)))
    }
}

/// The end-of-session line. The hook itself was already shown when the PL wrote it.
fn session_summary(session: u32, result: &SessionResult) -> String {
    format!(
        "Session {session} finished after {} turns: {}.",
        result.turns_taken, result.end_reason
    )
}
