//! Command-line parsing.

use anyhow::{anyhow, bail, Context, Result};
use llm::Provider;
use std::path::PathBuf;
use tabletalk_core::config::ConfigFile;

/// Parsed command line.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// TOML file to load before applying flags.
    pub config_path: Option<PathBuf>,
    /// Values set by flags; layered over the file.
    pub overrides: ConfigFile,
    /// Play unattended for this many sessions.
    pub auto: Option<u32>,
    /// Ping both backends and exit.
    pub check: bool,
    pub help: bool,
}

/// Parse arguments, excluding the program name.
pub fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options::default();

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "-h" | "--help" => options.help = true,
            "--check" => options.check = true,
            "--no-feedback" => options.overrides.session_feedback = Some(false),
            "--config" => options.config_path = Some(value(args, &mut i)?.into()),
            "--scenario" => options.overrides.scenario = Some(value(args, &mut i)?.into()),
            "--rulebook" => options.overrides.rulebook = Some(value(args, &mut i)?.into()),
            "--log-dir" => options.overrides.log_dir = Some(value(args, &mut i)?.into()),
            "--gm" => options.overrides.gm.provider = Some(provider(value(args, &mut i)?)?),
            "--pl" => options.overrides.pl.provider = Some(provider(value(args, &mut i)?)?),
            "--gm-model" => options.overrides.gm.model = Some(value(args, &mut i)?.to_string()),
            "--pl-model" => options.overrides.pl.model = Some(value(args, &mut i)?.to_string()),
            "--gm-max-tokens" => options.overrides.gm.max_tokens = Some(number(args, &mut i)?),
            "--pl-max-tokens" => options.overrides.pl.max_tokens = Some(number(args, &mut i)?),
            "--max-turns" => options.overrides.max_turns = Some(number(args, &mut i)?),
            "--auto" => options.auto = Some(number(args, &mut i)?),
            other => bail!("unknown argument: {other} (see --help)"),
        }
        i += 1;
    }

    Ok(options)
}

/// The value following the flag at `args[*i]`; advances `i` past it.
fn value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{flag} needs a value"))
}

fn number<T>(args: &[String], i: &mut usize) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let flag = args[*i].clone();
    let raw = value(args, i)?;
    raw.parse()
        .with_context(|| format!("{flag} expects a number, got {raw:?}"))
}

fn provider(name: &str) -> Result<Provider> {
    Ok(name.parse::<Provider>()?)
}
