//! tabletalk: a GM agent and a player agent play a text RPG campaign.
//!
//! ```bash
//! tabletalk --scenario scenarios/fantasy.md --max-turns 10
//! tabletalk --check
//! ```

mod cli;
mod console;

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::Path;
use tabletalk_core::{AgentRole, Agents, Autopilot, Campaign, Config, FileLog, Prompts};
use tracing_subscriber::EnvFilter;

use cli::Options;
use console::ConsoleSupervisor;

/// Loaded when present and no `--config` is given.
const DEFAULT_CONFIG: &str = "tabletalk.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = cli::parse_args(&args)?;
    if options.help {
        print_help();
        return Ok(());
    }

    let config = load_config(&options)?;
    let prompts = match config.rulebook {
        Some(ref path) => {
            let rulebook = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read rulebook {}", path.display()))?;
            Prompts::with_rulebook(&rulebook)
        }
        None => Prompts::default(),
    };
    let agents = Agents::from_config(&config, prompts)?;

    if options.check {
        return check(&agents).await;
    }

    let scenario = std::fs::read_to_string(&config.scenario)
        .with_context(|| format!("cannot read scenario {}", config.scenario.display()))?;

    let mut log = FileLog::create(&config.log_dir)?.with_echo(true);
    println!("Logging to {}\n", log.path().display());

    let mut campaign = Campaign::new(&config, agents);
    let summary = match options.auto {
        Some(sessions) => {
            campaign
                .run(&scenario, &mut log, &mut Autopilot::new(sessions))
                .await?
        }
        None => {
            campaign
                .run(&scenario, &mut log, &mut ConsoleSupervisor::new())
                .await?
        }
    };

    println!(
        "Campaign finished: {} sessions, {} turns. Log: {}",
        summary.sessions,
        summary.total_turns,
        log.path().display()
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,tabletalk=info,tabletalk_core=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(options: &Options) -> Result<Config> {
    let mut config = match options.config_path {
        Some(ref path) => Config::load(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => Config::load(DEFAULT_CONFIG)?,
        None => Config::default(),
    };
    config.apply(options.overrides.clone());
    config.validate()?;

    tracing::info!(
        gm = %format!("{}/{}", config.gm.provider, config.gm.model),
        pl = %format!("{}/{}", config.pl.provider, config.pl.model),
        max_turns = config.max_turns,
        "configuration loaded"
    );
    Ok(config)
}

/// Send a one-line ping to each backend and report the replies.
async fn check(agents: &Agents) -> Result<()> {
    let mut failed = 0;
    for role in [AgentRole::GameMaster, AgentRole::Player] {
        let backend = agents.backend(role);
        print!("{role} ({}/{}): ", backend.provider(), backend.model());
        std::io::stdout().flush().ok();
        match agents.ping(role).await {
            Ok(reply) => println!("ok: {}", reply.trim()),
            Err(e) => {
                println!("FAILED: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} backend(s) unreachable");
    }
    Ok(())
}

fn print_help() {
    println!("tabletalk - a GM agent and a player agent play a text RPG");
    println!();
    println!("USAGE:");
    println!("  tabletalk [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help               Show this help message");
    println!("  --config <FILE>          TOML config (default: {DEFAULT_CONFIG} if present)");
    println!("  --scenario <FILE>        Scenario template (default: scenarios/fantasy.md)");
    println!("  --rulebook <FILE>        Rulebook text for both agents (default: built-in)");
    println!("  --gm <PROVIDER>          GM provider: anthropic or openai (default: anthropic)");
    println!("  --gm-model <MODEL>       GM model");
    println!("  --gm-max-tokens <N>      GM reply limit (default: 2000)");
    println!("  --pl <PROVIDER>          PL provider (default: openai)");
    println!("  --pl-model <MODEL>       PL model");
    println!("  --pl-max-tokens <N>      PL reply limit (default: 500)");
    println!("  --max-turns <N>          Turn limit per session (default: 50)");
    println!("  --no-feedback            Skip end-of-campaign feedback");
    println!("  --log-dir <DIR>          Log directory (default: logs)");
    println!("  --auto <N>               Play N sessions without prompting");
    println!("  --check                  Test both backend connections and exit");
    println!();
    println!("ENVIRONMENT:");
    println!("  ANTHROPIC_API_KEY, OPENAI_API_KEY   Provider keys (.env is loaded)");
    println!("  RUST_LOG                            Diagnostic filter (default: warn,tabletalk=info,tabletalk_core=info)");
    println!();
    println!("CHECKPOINTS:");
    println!("  After each turn:    Enter continue / q quit / text: instruction for the GM");
    println!("  After each session: Enter next session / q end / r new hook / text: instruction");
}
