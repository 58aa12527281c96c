//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then command-line
//! overrides. Both the file and the command line produce a [`ConfigFile`], so they
//! merge the same way.

use crate::error::{Error, Result};
use llm::Provider;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Provider, model and in-session token limit for one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub provider: Provider,
    pub model: String,
    pub max_tokens: usize,
}

impl AgentConfig {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: 1000,
        }
    }

    /// Default GM: a stronger model with room for long narration.
    pub fn game_master() -> Self {
        Self::new(Provider::Anthropic, "claude-sonnet-4-20250514").with_max_tokens(2000)
    }

    /// Default PL: a smaller model with a short action budget.
    pub fn player() -> Self {
        Self::new(Provider::OpenAi, "gpt-4o-mini").with_max_tokens(500)
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn apply(&mut self, overrides: &AgentOverrides) {
        if let Some(provider) = overrides.provider {
            self.provider = provider;
        }
        if let Some(ref model) = overrides.model {
            self.model = model.clone();
        }
        if let Some(max_tokens) = overrides.max_tokens {
            self.max_tokens = max_tokens;
        }
    }
}

/// Configuration for a campaign run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub gm: AgentConfig,
    pub pl: AgentConfig,

    /// Turn limit per session.
    pub max_turns: u32,

    /// Ask both agents for feedback when the campaign ends.
    pub session_feedback: bool,

    /// Directory for run logs.
    pub log_dir: PathBuf,

    /// Rulebook text for the system prompts; built-in rules when unset.
    pub rulebook: Option<PathBuf>,

    /// Scenario template handed to the PL at campaign start.
    pub scenario: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gm: AgentConfig::game_master(),
            pl: AgentConfig::player(),
            max_turns: 50,
            session_feedback: true,
            log_dir: PathBuf::from("logs"),
            rulebook: None,
            scenario: PathBuf::from("scenarios/fantasy.md"),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load defaults overlaid with a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Defaults overlaid with TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        let mut config = Self::default();
        config.apply(file);
        Ok(config)
    }

    /// Overlay every value set in `overrides`.
    pub fn apply(&mut self, overrides: ConfigFile) {
        self.gm.apply(&overrides.gm);
        self.pl.apply(&overrides.pl);
        if let Some(max_turns) = overrides.max_turns {
            self.max_turns = max_turns;
        }
        if let Some(session_feedback) = overrides.session_feedback {
            self.session_feedback = session_feedback;
        }
        if let Some(log_dir) = overrides.log_dir {
            self.log_dir = log_dir;
        }
        if overrides.rulebook.is_some() {
            self.rulebook = overrides.rulebook;
        }
        if let Some(scenario) = overrides.scenario {
            self.scenario = scenario;
        }
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_session_feedback(mut self, enabled: bool) -> Self {
        self.session_feedback = enabled;
        self
    }

    pub fn with_gm(mut self, gm: AgentConfig) -> Self {
        self.gm = gm;
        self
    }

    pub fn with_pl(mut self, pl: AgentConfig) -> Self {
        self.pl = pl;
        self
    }

    /// Reject values no run can use.
    pub fn validate(&self) -> Result<()> {
        for (role, agent) in [("gm", &self.gm), ("pl", &self.pl)] {
            if agent.model.trim().is_empty() {
                return Err(Error::Config(format!("{role}.model must not be empty")));
            }
            if agent.max_tokens == 0 {
                return Err(Error::Config(format!("{role}.max_tokens must be positive")));
            }
        }
        if self.max_turns == 0 {
            return Err(Error::Config("max_turns must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Partial configuration: every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub gm: AgentOverrides,
    pub pl: AgentOverrides,
    pub max_turns: Option<u32>,
    pub session_feedback: Option<bool>,
    pub log_dir: Option<PathBuf>,
    pub rulebook: Option<PathBuf>,
    pub scenario: Option<PathBuf>,
}

/// Partial per-role configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentOverrides {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub max_tokens: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.gm.provider, Provider::Anthropic);
        assert_eq!(config.gm.max_tokens, 2000);
        assert_eq!(config.pl.provider, Provider::OpenAi);
        assert_eq!(config.pl.model, "gpt-4o-mini");
        assert_eq!(config.max_turns, 50);
        assert!(config.session_feedback);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_role_defaults() {
        let config = Config::from_toml_str(
            r#"
            max_turns = 12
            session_feedback = false

            [pl]
            provider = "anthropic"
            model = "claude-haiku-4-5-20251001"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_turns, 12);
        assert!(!config.session_feedback);
        assert_eq!(config.pl.provider, Provider::Anthropic);
        assert_eq!(config.pl.model, "claude-haiku-4-5-20251001");
        assert_eq!(config.pl.max_tokens, 500);
        assert_eq!(config.gm, AgentConfig::game_master());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = Config::from_toml_str("max_turn = 3").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_overrides_layer_on_file() {
        let mut config = Config::from_toml_str("max_turns = 12").unwrap();
        config.apply(ConfigFile {
            max_turns: Some(3),
            gm: AgentOverrides {
                model: Some("gpt-4o".to_string()),
                provider: Some(Provider::OpenAi),
                ..Default::default()
            },
            ..Default::default()
        });
        assert_eq!(config.max_turns, 3);
        assert_eq!(config.gm.provider, Provider::OpenAi);
        assert_eq!(config.gm.model, "gpt-4o");
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        assert!(Config::new().with_max_turns(0).validate().is_err());

        let blank_model = Config::new().with_gm(AgentConfig::new(Provider::Anthropic, " "));
        assert!(blank_model.validate().is_err());

        let zero_tokens = Config::new().with_pl(AgentConfig::player().with_max_tokens(0));
        assert!(zero_tokens.validate().is_err());
    }
}
