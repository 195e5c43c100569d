//! Ordered rule table for classifying a PR by its latest comment
//!
//! Pure and synchronous: no I/O happens here, so the precedence rules can
//! be tested one by one.

use crate::types::Disposition;
use regex::Regex;

/// One row of the rule table
#[derive(Debug, Clone)]
pub struct Rule {
    /// Short rule name used in logs
    pub name: &'static str,
    /// Outcome when the pattern matches
    pub disposition: Disposition,
    /// Human-readable reason logged next to the PR
    pub rationale: &'static str,
    /// Whether the rule is still evaluated in force mode
    pub survives_force: bool,
    pattern: Regex,
}

impl Rule {
    fn new(
        name: &'static str,
        pattern: &str,
        disposition: Disposition,
        rationale: &'static str,
    ) -> Self {
        Self {
            name,
            disposition,
            rationale,
            survives_force: false,
            pattern: Regex::new(pattern).expect("built-in rule pattern is valid"),
        }
    }

    fn surviving_force(mut self) -> Self {
        self.survives_force = true;
        self
    }

    /// Partial, case-sensitive search in the comment body
    pub fn matches(&self, body: &str) -> bool {
        self.pattern.is_match(body)
    }
}

/// Result of running a comment body through the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// A rule matched
    Matched {
        /// Name of the matching rule
        rule: &'static str,
        /// Its disposition
        disposition: Disposition,
        /// Its rationale
        rationale: &'static str,
    },
    /// Force mode rerouted the PR to a new plan
    Forced,
    /// No rule matched: an unknown status text
    Unmatched,
}

impl RuleOutcome {
    /// Disposition for this outcome, if any
    pub const fn disposition(self) -> Option<Disposition> {
        match self {
            Self::Matched { disposition, .. } => Some(disposition),
            Self::Forced => Some(Disposition::NoComment),
            Self::Unmatched => None,
        }
    }
}

/// Ordered `(pattern, disposition)` table, first match wins
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Rules for Atlantis status comments
    ///
    /// "No changes" is first and survives force mode; every rule after it
    /// is skipped when forcing.
    pub fn atlantis() -> Self {
        Self {
            rules: vec![
                Rule::new(
                    "no-change",
                    r"No changes. Your infrastructure matches the configuration|Apply complete!",
                    Disposition::NoChange,
                    "No changes.",
                )
                .surviving_force(),
                Rule::new(
                    "diff",
                    r"Plan: [0-9]* to add, [0-9]* to change, [0-9]* to destroy.|Changes to Outputs",
                    Disposition::WithDiff,
                    "There are diffs or conflicts.",
                ),
                Rule::new(
                    "error",
                    concat!(
                        r"Plan Error|Plan Failed|Continued plan output from previous comment.",
                        r"|via the Atlantis UI",
                        r"|All Atlantis locks for this PR have been unlocked and plans discarded",
                        r"|Renovate will not automatically rebase this PR",
                        r"|Apply Failed|Apply Error",
                    ),
                    Disposition::Error,
                    "Has errors.",
                ),
                Rule::new(
                    "new-version",
                    r"A newer version of",
                    Disposition::ToBeClosed,
                    "This PR will be closed since there is a new version of this dependency",
                ),
                Rule::new(
                    "still-working",
                    r"atlantis plan|atlantis apply",
                    Disposition::StillWorking,
                    "Atlantis is still working here, ignoring this PR for now.",
                ),
                Rule::new(
                    "ignored",
                    r"This PR will be ignored by automerge",
                    Disposition::Ignored,
                    "Will be ignored, there are diffs",
                ),
                Rule::new(
                    "no-project",
                    r"Ran Plan for 0 projects",
                    Disposition::NoProject,
                    "Will be ignored, 0 projects planned, usually due to modules update or no file changed, check and close them yourself please",
                ),
            ],
        }
    }

    /// The rules in evaluation order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluate a comment body top to bottom
    pub fn evaluate(&self, body: &str, force: bool) -> RuleOutcome {
        for rule in &self.rules {
            if force && !rule.survives_force {
                return RuleOutcome::Forced;
            }
            if rule.matches(body) {
                return RuleOutcome::Matched {
                    rule: rule.name,
                    disposition: rule.disposition,
                    rationale: rule.rationale,
                };
            }
        }

        if force {
            RuleOutcome::Forced
        } else {
            RuleOutcome::Unmatched
        }
    }

    /// Whether the body reports that nothing is left to apply
    pub fn is_no_change(&self, body: &str) -> bool {
        self.rules
            .iter()
            .filter(|r| r.disposition == Disposition::NoChange)
            .any(|r| r.matches(body))
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::atlantis()
    }
}
