//! Free-text protocol markers shared by the prompts, the validator and the controllers.
//!
//! Detection is plain substring matching. A GM that forgets [`SESSION_END`] keeps the
//! session running until another condition fires, and a marker quoted inside narrative
//! prose ends it. Neither case is corrected here.

/// Header the PL must use to introduce its declared action.
pub const ACTION_DECLARATION: &str = "[Action]";

/// Header for the PL's in-character reasoning.
pub const THOUGHTS: &str = "[Thoughts]";

/// Emitted by the GM to close the current session.
pub const SESSION_END: &str = "[Session End]";

/// GM-only section headers.
pub const SITUATION: &str = "[Situation]";
pub const CHECK: &str = "[Check]";
pub const RULING: &str = "[Ruling]";

/// Prefix for human steering text forwarded to the GM.
pub const ORCHESTRATOR_INSTRUCTION: &str = "[Orchestrator instruction]";

/// Quit token accepted at every human checkpoint (case-insensitive).
pub const QUIT: &str = "q";

/// Regenerate token at the character and hook checkpoints (case-insensitive).
pub const REGENERATE: &str = "r";

/// Whether a GM reply declares the end of the session.
pub fn declares_session_end(gm_text: &str) -> bool {
    gm_text.contains(SESSION_END)
}
