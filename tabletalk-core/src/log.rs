//! Append-only session record.
//!
//! Controllers write [`LogEntry`] values to a [`SessionLog`]; nothing ever reads
//! the log back. [`FileLog`] renders entries as markdown sections in one file per run.

use crate::agents::AgentRole;
use crate::error::{Error, Result};
use crate::session::EndReason;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// One structured record in the session log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    Scenario {
        text: String,
    },
    CharacterSheet {
        attempt: u32,
        text: String,
    },
    SessionStart {
        session: u32,
        seed: String,
    },
    /// Opening narration, turn 0.
    Opening {
        session: u32,
        text: String,
    },
    TurnStart {
        turn: u32,
    },
    /// A PL reply. `retry` marks the reply produced after a corrective instruction.
    PlayerAction {
        turn: u32,
        text: String,
        retry: bool,
    },
    /// The first PL reply of a turn broke a format rule.
    Anomaly {
        turn: u32,
        rule: String,
        reason: String,
    },
    GmNarration {
        turn: u32,
        text: String,
    },
    /// Human steering text. `turn` is `None` between sessions.
    Intervention {
        session: u32,
        turn: Option<u32>,
        instruction: String,
    },
    SessionEnd {
        session: u32,
        turns: u32,
        reason: EndReason,
    },
    Hook {
        session: u32,
        text: String,
    },
    Feedback {
        role: AgentRole,
        text: String,
    },
    CampaignEnd {
        sessions: u32,
        total_turns: u32,
    },
}

impl LogEntry {
    pub fn is_anomaly(&self) -> bool {
        matches!(self, LogEntry::Anomaly { .. })
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEntry::Scenario { text } => write!(f, "# Scenario\n\n{text}"),
            LogEntry::CharacterSheet { attempt, text } => {
                write!(f, "## Character sheet (attempt {attempt})\n\n{text}")
            }
            LogEntry::SessionStart { session, seed } => {
                write!(f, "# Session {session}\n\n### Seed\n\n{seed}")
            }
            LogEntry::Opening { session, text } => {
                write!(f, "### GM (session {session}, opening)\n\n{text}")
            }
            LogEntry::TurnStart { turn } => write!(f, "## Turn {turn}"),
            LogEntry::PlayerAction { turn, text, retry } => {
                if *retry {
                    write!(f, "### PL (turn {turn}, retry)\n\n{text}")
                } else {
                    write!(f, "### PL (turn {turn})\n\n{text}")
                }
            }
            LogEntry::Anomaly { turn, rule, reason } => write!(
                f,
                "> WARNING: turn {turn}: PL reply broke the format ({rule}): {reason}. Retrying once."
            ),
            LogEntry::GmNarration { turn, text } => write!(f, "### GM (turn {turn})\n\n{text}"),
            LogEntry::Intervention {
                session,
                turn,
                instruction,
            } => match turn {
                Some(turn) => write!(
                    f,
                    "> Human instruction (session {session}, after turn {turn}): {instruction}"
                ),
                None => write!(
                    f,
                    "> Human instruction (before session {}): {instruction}",
                    session + 1
                ),
            },
            LogEntry::SessionEnd {
                session,
                turns,
                reason,
            } => write!(
                f,
                "## Session {session} ended\n\n- Turns: {turns}\n- Reason: {reason}"
            ),
            LogEntry::Hook { session, text } => {
                write!(f, "## Next-session hook (after session {session})\n\n{text}")
            }
            LogEntry::Feedback { role, text } => write!(f, "# Feedback from {role}\n\n{text}"),
            LogEntry::CampaignEnd {
                sessions,
                total_turns,
            } => write!(
                f,
                "# Campaign ended\n\n- Sessions: {sessions}\n- Total turns: {total_turns}"
            ),
        }
    }
}

/// Write-only sink for log entries.
pub trait SessionLog: Send {
    fn record(&mut self, entry: &LogEntry) -> Result<()>;
}

/// One markdown file per run, flushed after every entry.
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    file: File,
    echo: bool,
}

impl FileLog {
    /// Create `<dir>/session_YYYYmmdd_HHMMSS.md`, creating `dir` if needed.
    ///
    /// Never reuses an existing file: a run started in the same second gets a
    /// `_2`, `_3`, ... suffix.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(Error::Log)?;

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let (path, file) = open_new(dir, &stamp)?;

        tracing::info!(path = %path.display(), "opened session log");
        Ok(Self {
            path,
            file,
            echo: false,
        })
    }

    /// Also print every entry to stdout as it is written.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Open a fresh file for `stamp`, adding a numeric suffix while the name is taken.
fn open_new(dir: &Path, stamp: &str) -> Result<(PathBuf, File)> {
    let mut attempt = 1u32;
    loop {
        let name = if attempt == 1 {
            format!("session_{stamp}.md")
        } else {
            format!("session_{stamp}_{attempt}.md")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(Error::Log(e)),
        }
    }
}

impl SessionLog for FileLog {
    fn record(&mut self, entry: &LogEntry) -> Result<()> {
        writeln!(self.file, "{entry}\n").map_err(Error::Log)?;
        self.file.flush().map_err(Error::Log)?;
        if self.echo {
            println!("{entry}\n");
        }
        Ok(())
    }
}

/// In-memory log for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    entries: Vec<LogEntry>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&LogEntry) -> bool) -> usize {
        self.entries.iter().filter(|e| predicate(e)).count()
    }

    pub fn openings(&self) -> usize {
        self.count(|e| matches!(e, LogEntry::Opening { .. }))
    }

    pub fn player_actions(&self) -> usize {
        self.count(|e| matches!(e, LogEntry::PlayerAction { .. }))
    }

    pub fn gm_narrations(&self) -> usize {
        self.count(|e| matches!(e, LogEntry::GmNarration { .. }))
    }

    pub fn anomalies(&self) -> usize {
        self.count(LogEntry::is_anomaly)
    }
}

impl SessionLog for MemoryLog {
    fn record(&mut self, entry: &LogEntry) -> Result<()> {
        self.entries.push(entry.clone());
        Ok(())
    }
}
