//! Removal of recurring newsletter chrome.
//!
//! Every rule is a regex that is matched case insensitive and with `.`
//! crossing line breaks. Rules run in order over the whole text and each
//! match is replaced, by default with nothing. The table is plain data, so
//! new newsletter formats are supported by pushing more rules.

use std::borrow::Cow;

use lazy_static::lazy_static;
use log::debug;
use regex::{Regex, RegexBuilder};

lazy_static! {
    /// The rules of [`Stripper::default`].
    pub static ref DEFAULT_RULES: Vec<BoilerplateRule> = vec![
        BoilerplateRule::new("sign-up-header", r"Sign Up \[\d+\].*?View Online \[\d+\]"),
        BoilerplateRule::new("links-footer", r"Links:\s*------.*$"),
        BoilerplateRule::new("manage-subscriptions", r"Manage your subscriptions.*?unsubscribe.*?\."),
        BoilerplateRule::new("advertise", r"Want to advertise.*?ADVERTISE WITH US.*?\."),
        BoilerplateRule::new("feedback-prompt", r"If you have any comments.*?just respond to this email!"),
        BoilerplateRule::new("sponsor-marker", r"\[SPONSOR\]"),
        BoilerplateRule::new("together-with", r"TOGETHER WITH.*?\]"),
        BoilerplateRule::new("hiring", r"Want to work at TLDR\?.*?get \$1k if we hire them!"),
        // everything up to the next blank line, or to the end
        BoilerplateRule::new("signature", r"Thanks for reading,(?:[^\n]|\n[^\n]|\n\z)*"),
    ];

    static ref DEFAULT_STRIPPER: Stripper = Stripper::default();
}

/// A single pattern and what to put in place of its matches.
#[derive(Debug, Clone)]
pub struct BoilerplateRule {
    /// Identifies the rule in logs.
    pub name: Cow<'static, str>,
    /// The compiled pattern.
    pub pattern: Regex,
    /// Replacement for every match, empty deletes the match.
    pub replacement: Cow<'static, str>,
}

impl BoilerplateRule {
    /// Creates a deleting rule.
    ///
    /// Panics if `pattern` is not a valid regex, use [`BoilerplateRule::try_new`]
    /// for patterns that are not known at compile time.
    pub fn new<T: Into<Cow<'static, str>>>(name: T, pattern: &str) -> Self {
        Self::try_new(name, pattern).unwrap()
    }

    /// Creates a deleting rule, failing on an invalid pattern.
    pub fn try_new<T: Into<Cow<'static, str>>>(
        name: T,
        pattern: &str,
    ) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()?;
        Ok(Self {
            name: name.into(),
            pattern,
            replacement: Cow::Borrowed(""),
        })
    }

    /// Replace matches with `replacement` instead of deleting them.
    pub fn replacement<T: Into<Cow<'static, str>>>(mut self, replacement: T) -> Self {
        self.replacement = replacement.into();
        self
    }

    /// Applies the rule to `text`.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        // NoExpand: a replacement is literal text, not a `$group` template
        self.pattern
            .replace_all(text, regex::NoExpand(self.replacement.as_ref()))
    }
}

/// An ordered table of [`BoilerplateRule`]s.
#[derive(Debug, Clone)]
pub struct Stripper {
    rules: Vec<BoilerplateRule>,
}

impl Stripper {
    /// A stripper without any rules, that only trims.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// A stripper with exactly these rules.
    pub fn with_rules(rules: Vec<BoilerplateRule>) -> Self {
        Self { rules }
    }

    /// Appends a rule, it runs after all existing ones.
    pub fn rule(mut self, rule: BoilerplateRule) -> Self {
        self.rules.push(rule);
        self
    }

    #[inline]
    pub fn rules(&self) -> &[BoilerplateRule] {
        &self.rules
    }

    /// Runs all rules in order and trims the result.
    pub fn strip(&self, text: &str) -> String {
        let mut text = text.to_string();
        for rule in &self.rules {
            let stripped = match rule.apply(&text) {
                Cow::Borrowed(_) => continue,
                Cow::Owned(stripped) => stripped,
            };
            debug!(
                "boilerplate rule `{}` removed {} bytes",
                rule.name,
                text.len().saturating_sub(stripped.len())
            );
            text = stripped;
        }
        text.trim().to_string()
    }
}

impl Default for Stripper {
    fn default() -> Self {
        Stripper::with_rules(DEFAULT_RULES.clone())
    }
}

/// Strips `text` with the default rule table.
pub fn strip_boilerplate(text: &str) -> String {
    DEFAULT_STRIPPER.strip(text)
}
