//! Literal find/replace rules.
//!
//! Rules are literal: every pattern is escaped before it is compiled, and
//! replacements are inserted verbatim (a `$1` in a replacement is just text).
//! Rules apply in order against the evolving text, so a later rule may match
//! text introduced by an earlier one.
//!
//! # Example
//!
//! ```rust
//! use relabel::rules::{ReplacementRule, RuleSet};
//!
//! let rules = RuleSet::compile(&[
//!     ReplacementRule::new("https://old.example/api", "https://new.example/api"),
//!     ReplacementRule::new("a.b", "a-b"),
//! ])?;
//!
//! let applied = rules.apply("fetch('https://old.example/api'); axb a.b");
//! assert_eq!(applied.text, "fetch('https://new.example/api'); axb a-b");
//! assert_eq!(applied.fired.len(), 2);
//! # Ok::<(), relabel::Error>(())
//! ```

use std::borrow::Cow;
use std::fmt;

use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A literal `(old, new)` replacement pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplacementRule {
    /// Literal text to find.
    pub old: String,
    /// Literal text to insert.
    pub new: String,
}

impl ReplacementRule {
    /// Creates a new rule.
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }
}

impl fmt::Display for ReplacementRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.old, self.new)
    }
}

impl std::str::FromStr for ReplacementRule {
    type Err = Error;

    /// Parses `OLD=NEW`. The first `=` separates the two halves.
    fn from_str(s: &str) -> Result<Self> {
        let (old, new) = s
            .split_once('=')
            .ok_or_else(|| Error::InvalidRule(format!("expected OLD=NEW, got '{s}'")))?;
        if old.is_empty() {
            return Err(Error::InvalidRule(format!("empty pattern in '{s}'")));
        }
        Ok(Self::new(old, new))
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: ReplacementRule,
    matcher: Regex,
}

/// An ordered set of compiled replacement rules.
///
/// Compile once per run and reuse for every member.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

/// Output of applying a [`RuleSet`] to one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied<'a> {
    /// The transformed text. Borrowed when no rule fired.
    pub text: Cow<'a, str>,
    /// Rules that fired, in application order.
    pub fired: Vec<&'a ReplacementRule>,
}

impl Applied<'_> {
    /// Returns `true` if at least one rule fired.
    pub fn changed(&self) -> bool {
        !self.fired.is_empty()
    }
}

impl RuleSet {
    /// Compiles rules for literal matching.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] if a rule has an empty pattern, which
    /// would match between every character.
    pub fn compile(rules: &[ReplacementRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                if rule.old.is_empty() {
                    return Err(Error::InvalidRule(format!(
                        "empty pattern (replacement '{}')",
                        rule.new
                    )));
                }
                let matcher = Regex::new(&regex::escape(&rule.old))
                    .map_err(|e| Error::InvalidRule(format!("'{}': {}", rule.old, e)))?;
                Ok(CompiledRule {
                    rule: rule.clone(),
                    matcher,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the set has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the source rules in order.
    pub fn rules(&self) -> impl Iterator<Item = &ReplacementRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    /// Applies every rule in order to `text`.
    pub fn apply<'a>(&'a self, text: &'a str) -> Applied<'a> {
        let mut current: Cow<'a, str> = Cow::Borrowed(text);
        let mut fired = Vec::new();

        for compiled in &self.rules {
            if !compiled.matcher.is_match(&current) {
                continue;
            }
            let replaced = compiled
                .matcher
                .replace_all(&current, NoExpand(&compiled.rule.new))
                .into_owned();
            current = Cow::Owned(replaced);
            fired.push(&compiled.rule);
        }

        Applied {
            text: current,
            fired,
        }
    }
}
