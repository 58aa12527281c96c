//! Prompt text for both agents.
//!
//! The rulebook is natural-language content passed straight into the system prompts;
//! nothing here interprets it.

use crate::markers::{
    ACTION_DECLARATION, CHECK, ORCHESTRATOR_INSTRUCTION, RULING, SESSION_END, SITUATION, THOUGHTS,
};

/// Rules used when no rulebook file is configured.
pub const DEFAULT_RULEBOOK: &str = r#"# Quick Rules
- Each turn the player declares one action; the GM narrates the outcome.
- Risky actions are resolved with a 2d6 roll: 10+ success, 7-9 success at a cost, 6- failure.
- The GM tracks Turn, HP (start 10) and Tension (0-5) at the top of each narration.
- A session ends when the current objective is resolved or the story reaches a natural pause."#;

/// Corrective instruction appended to the PL history after a format violation.
pub const CORRECTIVE_INSTRUCTION: &str = "You are the PL. Do not perform any GM duties \
(no narration of outcomes, no rulings, no status lines, no offering of choices). \
Reply again and include your action declaration under the [Action] header.";

/// System prompts for every agent capability.
#[derive(Debug, Clone)]
pub struct Prompts {
    /// GM in-session play.
    pub gm_system: String,
    /// PL in-session play and hook reflection.
    pub pl_system: String,
    /// PL authoring a character and opening situation.
    pub pl_character: String,
}

impl Prompts {
    /// Build all prompts around the given rulebook text.
    pub fn with_rulebook(rulebook: &str) -> Self {
        Self {
            gm_system: build_gm_system_prompt(rulebook),
            pl_system: build_pl_system_prompt(rulebook),
            pl_character: build_character_prompt(rulebook),
        }
    }
}

impl Default for Prompts {
    fn default() -> Self {
        Self::with_rulebook(DEFAULT_RULEBOOK)
    }
}

/// Build the GM system prompt.
pub fn build_gm_system_prompt(rulebook: &str) -> String {
    format!(
        r#"You are the Game Master (GM) of a text tabletop RPG. Keep play brisk: short inputs, vivid but compact narration.
Follow the rules below. Invent freely only within situation descriptions.

{rulebook}

## Each reply
1. Start with a status line (Turn, HP, Tension).
2. {SITUATION} describe what happens as a result of the player's action.
3. {CHECK} / {RULING} when a roll or judgment is needed.
4. Offer a few action options and ask what the character does.

## Opening
The first message gives you the scenario and the player character. Present the opening scene and begin Turn 1.

## Ending a session
When the session's objective is resolved or the story reaches a natural pause, write a closing scene,
offer one or two hooks for the next session, and finish with the line {SESSION_END}

## Orchestrator
Text after {ORCHESTRATOR_INSTRUCTION} comes from the human running the table. Follow it."#
    )
}

/// Build the PL system prompt.
pub fn build_pl_system_prompt(rulebook: &str) -> String {
    format!(
        r#"You are the player (PL) of a text tabletop RPG.

# Rulebook
Play with these rules in mind:

{rulebook}

# Your role
- Read the GM's narration and declare what your character does.
- Roleplay the character's thoughts and feelings.
- You may pick one of the GM's suggested options or act on your own idea.

# Never do these (they are the GM's job)
- Describe outcomes ("... happened").
- Make checks or rulings.
- Decide NPC lines or actions.
- Offer action options or status lines.
Even when unsure, always declare some action. The GM decides what results from it.

# Reply format (required)
{THOUGHTS}
(your character's inner thoughts, reading of the situation, doubts)

{ACTION_DECLARATION}
(exactly one concrete action, phrased as "I do ..." or "I try to ...")"#
    )
}

/// Build the PL prompt for authoring a character and the first session's setup.
pub fn build_character_prompt(rulebook: &str) -> String {
    format!(
        r#"You are the player (PL) of a text tabletop RPG. Before play begins, create your player character (PC)
and the situation for the first session.

# Rulebook
{rulebook}

# Reply format (required)
[PC]
- Name:
- Occupation / role:
- Traits (appearance and personality, one or two sentences):
- Personal goal or motive:
- Weakness (optional):

[First session]
- Concrete request or situation:
- Starting location:
- Starting items (3 to 5):"#
    )
}

/// Request to the PL for a character sheet.
pub fn character_request(scenario: &str) -> String {
    format!("Create the PC and first session from this scenario template:\n\n{scenario}")
}

/// Seed for the first session's opening narration.
pub fn opening_request(scenario: &str, character_sheet: &str) -> String {
    format!(
        "Start the session with the following setup.\n\n# Scenario\n{scenario}\n\n# Player character and situation\n{character_sheet}"
    )
}

/// Seed for every later session, carrying the player's hook forward.
pub fn next_session_request(hook: &str, instruction: Option<&str>) -> String {
    let mut seed = format!(
        "A new session begins. Continue the campaign from where the last session ended.\n\n# The player's wishes for this session\n{hook}"
    );
    if let Some(instruction) = instruction.filter(|i| !i.trim().is_empty()) {
        seed.push_str(&format!("\n\n{ORCHESTRATOR_INSTRUCTION} {instruction}"));
    }
    seed
}

/// GM narration as presented to the PL.
pub fn narration_for_player(gm_text: &str) -> String {
    format!("GM narration:\n{gm_text}")
}

/// PL action as presented to the GM, with optional steering text.
pub fn action_for_gm(pl_text: &str, instruction: Option<&str>) -> String {
    let mut input = format!("Player action:\n{pl_text}");
    if let Some(instruction) = instruction.filter(|i| !i.trim().is_empty()) {
        input.push_str(&format!("\n\n{ORCHESTRATOR_INSTRUCTION} {instruction}"));
    }
    input
}

/// Request to the PL for a reflection and a hook for the next session.
pub fn hook_request(final_gm_text: &str) -> String {
    format!(
        r#"Closing narration from the GM:

{final_gm_text}

The session is over. Considering the hooks the GM offered, choose or propose what you want to do next session.

# Reply format (required)
[Reflection]
(what stood out this session, how your character changed)

[Next session]
(what you want to do, goals to chase, threads you want to follow)"#
    )
}

/// Request for end-of-campaign feedback, phrased for the agent's own role.
pub fn feedback_request(as_gm: bool) -> String {
    let partner = if as_gm { "the player" } else { "the GM" };
    format!(
        "The campaign is over. Step out of character and give brief feedback: \
what worked, what did not, and one suggestion for {partner} and one for yourself."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_embed_rulebook_and_markers() {
        let prompts = Prompts::with_rulebook("Roll 2d6 for everything.");
        assert!(prompts.gm_system.contains("Roll 2d6 for everything."));
        assert!(prompts.gm_system.contains(SESSION_END));
        assert!(prompts.pl_system.contains(ACTION_DECLARATION));
        assert!(prompts.pl_character.contains("Roll 2d6 for everything."));
    }

    #[test]
    fn test_action_for_gm_appends_instruction() {
        assert_eq!(action_for_gm("[Action] I wait.", None), "Player action:\n[Action] I wait.");

        let input = action_for_gm("[Action] I wait.", Some("Introduce a storm"));
        assert!(input.ends_with("[Orchestrator instruction] Introduce a storm"));

        let blank = action_for_gm("[Action] I wait.", Some("  "));
        assert!(!blank.contains(ORCHESTRATOR_INSTRUCTION));
    }

    #[test]
    fn test_next_session_request() {
        let seed = next_session_request("Follow the smugglers", Some("Keep it short"));
        assert!(seed.contains("Follow the smugglers"));
        assert!(seed.contains("[Orchestrator instruction] Keep it short"));
        assert!(!next_session_request("Follow the smugglers", None).contains(ORCHESTRATOR_INSTRUCTION));
    }
}
