//! Scripted tests for the campaign controller: character review, hooks, history
//! ownership across sessions, and end-of-campaign feedback.

use llm::{LlmError, Provider, Role};
use tabletalk_core::testing::{scripted_agents, ScriptedBackend, ScriptedSupervisor};
use tabletalk_core::{
    AgentRole, Campaign, Config, Error, LogEntry, MemoryLog, Rule, SessionDecision, SheetDecision,
    TurnDecision, Validator,
};

const CARAVAN: &str = "Investigate the missing caravan";

fn config(max_turns: u32, feedback: bool) -> Config {
    Config::new()
        .with_max_turns(max_turns)
        .with_session_feedback(feedback)
}

#[tokio::test]
async fn test_two_sessions_with_regenerated_hook_and_feedback() {
    let gm = ScriptedBackend::new([
        "Session one opens at the trade road.",
        "You find wheel ruts.",
        "Session two opens at the quarry.",
        "The thieves scatter.",
        "GM feedback: good pacing.",
    ]);
    let pl = ScriptedBackend::new([
        "[PC]\n- Name: Mira, caravan guard",
        "[Action] I follow the ruts.",
        "[Next session] Go home.",
        "[Next session] Track the thieves to the quarry.",
        "[Action] I charge the thieves.",
        "[Next session] Rest at the inn.",
        "PL feedback: fun chase.",
    ]);
    let agents = scripted_agents(&gm, &pl);
    let mut campaign = Campaign::new(&config(1, true), agents);
    let mut log = MemoryLog::new();
    let mut supervisor = ScriptedSupervisor::new().with_session_decisions([
        SessionDecision::RegenerateHook,
        SessionDecision::ContinueWith("Make it a heist.".to_string()),
    ]);

    let summary = campaign.run(CARAVAN, &mut log, &mut supervisor).await.unwrap();

    assert_eq!(summary.sessions, 2);
    assert_eq!(summary.total_turns, 2);
    assert_eq!(summary.gm_feedback.as_deref(), Some("GM feedback: good pacing."));
    assert_eq!(summary.pl_feedback.as_deref(), Some("PL feedback: fun chase."));

    // The regenerated hook and the instruction seed session two; the rejected hook does not.
    let state = campaign.state();
    let second_seed = &state.gm_history.messages()[4];
    assert_eq!(second_seed.role, Role::User);
    assert!(second_seed.text.contains("Track the thieves to the quarry."));
    assert!(second_seed.text.contains("Make it a heist."));
    assert!(!second_seed.text.contains("Go home."));
    assert_eq!(
        state.carried_hook.as_deref(),
        Some("[Next session] Rest at the inn.")
    );

    assert_eq!(supervisor.hooks().len(), 3);
    assert_eq!(log.count(|e| matches!(e, LogEntry::Hook { .. })), 3);
    assert_eq!(
        log.count(|e| matches!(e, LogEntry::Intervention { turn: None, .. })),
        1
    );
    assert_eq!(log.count(|e| matches!(e, LogEntry::Feedback { .. })), 2);
    assert!(matches!(
        log.entries().last(),
        Some(LogEntry::CampaignEnd {
            sessions: 2,
            total_turns: 2
        })
    ));
}

#[tokio::test]
async fn test_pl_history_resets_but_gm_history_does_not() {
    let gm = ScriptedBackend::new(["Open 1.", "Turn 1.", "Open 2.", "Turn 2."]);
    let pl = ScriptedBackend::new([
        "[PC] Mira",
        "[Action] look",
        "[Next session] the tower",
        "[Action] climb",
        "[Next session] rest",
    ]);
    let agents = scripted_agents(&gm, &pl);
    let mut campaign = Campaign::new(&config(1, false), agents);
    let mut log = MemoryLog::new();
    let mut supervisor =
        ScriptedSupervisor::new().with_session_decisions([SessionDecision::Continue]);

    campaign.run(CARAVAN, &mut log, &mut supervisor).await.unwrap();

    let pl_requests = pl.requests();
    // In-session PL calls are the 2nd and 4th requests; each starts from one message.
    assert_eq!(pl_requests[1].messages.len(), 1);
    assert_eq!(pl_requests[3].messages.len(), 1);
    assert!(pl_requests[3].messages[0].text.contains("Open 2."));

    let gm_requests = gm.requests();
    // Opening of session two sees all of session one plus its own seed.
    assert_eq!(gm_requests[2].messages.len(), 5);
    assert_eq!(campaign.state().gm_history.len(), 8);
}

#[tokio::test]
async fn test_regenerated_sheet_replaces_first() {
    let gm = ScriptedBackend::new(["Open.", "Turn."]);
    let pl = ScriptedBackend::new([
        "[PC] Borin, a bored noble",
        "[PC] Mira, caravan guard",
        "[Action] I question the stablehand.",
        "[Next session] rest",
    ]);
    let agents = scripted_agents(&gm, &pl);
    let mut campaign = Campaign::new(&config(1, false), agents);
    let mut log = MemoryLog::new();
    let mut supervisor = ScriptedSupervisor::new()
        .with_sheet_decisions([SheetDecision::Regenerate, SheetDecision::Accept]);

    let summary = campaign.run(CARAVAN, &mut log, &mut supervisor).await.unwrap();

    assert_eq!(summary.sessions, 1);
    assert_eq!(supervisor.sheets().len(), 2);
    assert_eq!(
        campaign.state().character_sheet.as_deref(),
        Some("[PC] Mira, caravan guard")
    );

    let opening_seed = &gm.requests()[0].messages[0].text;
    assert!(opening_seed.contains(CARAVAN));
    assert!(opening_seed.contains("Mira"));
    assert!(!opening_seed.contains("Borin"));
    assert_eq!(
        log.count(|e| matches!(e, LogEntry::CharacterSheet { .. })),
        2
    );
}

#[tokio::test]
async fn test_rejected_sheet_runs_no_session() {
    let gm = ScriptedBackend::new(Vec::<String>::new());
    let pl = ScriptedBackend::new(["[PC] Nobody"]);
    let agents = scripted_agents(&gm, &pl);
    let mut campaign = Campaign::new(&config(3, true), agents);
    let mut log = MemoryLog::new();
    let mut supervisor = ScriptedSupervisor::new().with_sheet_decisions([SheetDecision::Quit]);

    let summary = campaign.run(CARAVAN, &mut log, &mut supervisor).await.unwrap();

    assert_eq!(summary.sessions, 0);
    assert_eq!(summary.gm_feedback, None);
    assert_eq!(gm.calls(), 0);
}

#[tokio::test]
async fn test_human_quit_ends_campaign_with_feedback() {
    let gm = ScriptedBackend::new(["Open.", "Turn 1.", "GM thoughts."]);
    let pl = ScriptedBackend::new(["[PC] Mira", "[Action] wait", "PL thoughts."]);
    let agents = scripted_agents(&gm, &pl);
    let mut campaign = Campaign::new(&config(5, true), agents);
    let mut log = MemoryLog::new();
    let mut supervisor = ScriptedSupervisor::new().with_turn_decisions([TurnDecision::Quit]);

    let summary = campaign.run(CARAVAN, &mut log, &mut supervisor).await.unwrap();

    assert_eq!(summary.sessions, 1);
    assert_eq!(summary.total_turns, 1);
    assert!(supervisor.hooks().is_empty());
    assert_eq!(summary.pl_feedback.as_deref(), Some("PL thoughts."));

    // PL feedback runs over the last session's PL history.
    let feedback_request = pl.last_request().unwrap();
    assert_eq!(feedback_request.messages.len(), 3);
}

#[tokio::test]
async fn test_gm_failure_halts_campaign() {
    let gm = ScriptedBackend::new(["Open."]);
    gm.push_error(LlmError::Api {
        status: 500,
        message: "internal error".to_string(),
    });
    let pl = ScriptedBackend::new(["[PC] Mira", "[Action] wait"]);
    let agents = scripted_agents(&gm, &pl);
    let mut campaign = Campaign::new(&config(3, true), agents);
    let mut log = MemoryLog::new();
    let mut supervisor = ScriptedSupervisor::new();

    let err = campaign
        .run(CARAVAN, &mut log, &mut supervisor)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Invocation {
            role: AgentRole::GameMaster,
            source: LlmError::Api { status: 500, .. },
        }
    ));
    assert!(!log
        .entries()
        .iter()
        .any(|e| matches!(e, LogEntry::CampaignEnd { .. })));
}

#[tokio::test]
async fn test_custom_validator_drives_retry() {
    let gm = ScriptedBackend::new(["The gate guard squints.", "He lets you pass."]);
    let pl = ScriptedBackend::new([
        "[PC] Mira",
        "[Action] I charge the gate!!",
        "[Action] I creep toward the gate.",
        "[Next session] rest",
    ])
    .with_model(Provider::OpenAi, "gpt-4o-mini");
    let agents = scripted_agents(&gm, &pl);
    let validator = Validator::empty().with_rule(Rule::new(
        "no shouting",
        "reply must not shout",
        |text| text.contains("!!"),
    ));
    let mut campaign = Campaign::new(&config(1, false), agents).with_validator(validator);
    let mut log = MemoryLog::new();
    let mut supervisor = ScriptedSupervisor::new();

    let player = campaign.agents().backend(AgentRole::Player);
    assert_eq!(player.provider(), Provider::OpenAi);
    assert_eq!(player.model(), "gpt-4o-mini");

    campaign.run(CARAVAN, &mut log, &mut supervisor).await.unwrap();

    // The standard rules accept the first action; only the custom rule rejects it.
    assert_eq!(pl.calls(), 4);
    assert_eq!(log.anomalies(), 1);
    assert!(log.entries().iter().any(|e| matches!(
        e,
        LogEntry::Anomaly { turn: 1, rule, .. } if rule == "no shouting"
    )));
    let gm_input = &gm.requests()[1].messages[2].text;
    assert!(gm_input.contains("I creep toward the gate."));
    assert!(!gm_input.contains("!!"));
}
