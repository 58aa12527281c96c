//! Format and role-boundary checks for PL replies.
//!
//! A [`Validator`] is an ordered list of named [`Rule`]s. The first rule a reply
//! violates is reported and the rest are skipped; since every violation gets the same
//! corrective retry, which rule fired only matters for the log.

use crate::markers::{ACTION_DECLARATION, CHECK, RULING, SITUATION};
use regex::Regex;
use std::fmt;

type Predicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// A named predicate that flags a reply as ill-formed.
pub struct Rule {
    name: String,
    reason: String,
    violated_by: Predicate,
}

impl Rule {
    /// Create a rule from an arbitrary predicate returning `true` on violation.
    pub fn new(
        name: impl Into<String>,
        reason: impl Into<String>,
        violated_by: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
            violated_by: Box::new(violated_by),
        }
    }

    /// Violated when `marker` is absent.
    pub fn requires(marker: &'static str) -> Self {
        Self::new(
            marker,
            format!("missing required marker {marker}"),
            move |text| !text.contains(marker),
        )
    }

    /// Violated when `pattern` appears verbatim.
    pub fn forbids(pattern: &'static str) -> Self {
        Self::new(
            pattern,
            format!("GM-style content detected: {pattern}"),
            move |text| text.contains(pattern),
        )
    }

    /// Violated when `pattern` matches anywhere in the reply.
    pub fn forbids_regex(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        let name = name.into();
        let regex = Regex::new(pattern)?;
        Ok(Self::new(
            name.clone(),
            format!("GM-style content detected: {name}"),
            move |text| regex.is_match(text),
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `text` violates this rule.
    pub fn is_violated_by(&self, text: &str) -> bool {
        (self.violated_by)(text)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// The first rule a reply broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub rule: String,
    pub reason: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Result of validating a PL reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Violation(Violation),
}

impl Verdict {
    pub fn is_ok(&self) -> bool {
        matches!(self, Verdict::Ok)
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Verdict::Ok => None,
            Verdict::Violation(v) => Some(v),
        }
    }

    pub fn into_violation(self) -> Option<Violation> {
        match self {
            Verdict::Ok => None,
            Verdict::Violation(v) => Some(v),
        }
    }
}

/// Ordered rule set applied to every PL reply.
#[derive(Debug)]
pub struct Validator {
    rules: Vec<Rule>,
}

/// Literal GM signatures, in check order.
const GM_SIGNATURES: &[&str] = &[
    "Turn:",
    "HP:",
    "SP:",
    "Tension:",
    SITUATION,
    CHECK,
    RULING,
    "Action options",
];

/// Questions only the GM asks, in check order after the literal signatures.
const GM_QUESTIONS: &[(&str, &str)] = &[
    ("asks what will you do", r"(?i)what will you do"),
    ("asks to choose", r"(?i)please choose"),
    ("asks what you do about", r"(?i)what do you do about"),
];

impl Validator {
    /// A validator with no rules; every reply passes.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The standard rule set: action declaration first, then GM signatures.
    pub fn standard() -> Self {
        let mut validator = Self::empty().with_rule(Rule::requires(ACTION_DECLARATION));
        for pattern in GM_SIGNATURES {
            validator = validator.with_rule(Rule::forbids(*pattern));
        }
        for (name, pattern) in GM_QUESTIONS {
            match Rule::forbids_regex(*name, pattern) {
                Ok(rule) => validator = validator.with_rule(rule),
                Err(e) => tracing::error!(rule = *name, error = %e, "invalid built-in pattern"),
            }
        }
        validator
    }

    /// Append a rule; it is checked after every existing rule.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Classify a PL reply. Pure; stops at the first violated rule.
    pub fn validate(&self, pl_response: &str) -> Verdict {
        self.rules
            .iter()
            .find(|rule| rule.is_violated_by(pl_response))
            .map_or(Verdict::Ok, |rule| {
                Verdict::Violation(Violation {
                    rule: rule.name.clone(),
                    reason: rule.reason.clone(),
                })
            })
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::standard()
    }
}

/// Validate with the standard rule set.
pub fn validate(pl_response: &str) -> Verdict {
    Validator::standard().validate(pl_response)
}
