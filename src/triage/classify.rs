//! PR classification - reads review and comment state, assigns a disposition

use crate::platform::PlatformService;
use crate::triage::rules::{RuleOutcome, RuleSet};
use crate::types::{Disposition, LABEL_AUTOMERGE_NO_PROJECT, PullRequestSnapshot, ReviewState};
use std::collections::HashMap;
use tracing::{info, warn};

const RULE_DISMISSED: &str = "dismissed";
const RULE_NO_COMMENT: &str = "no-comment";
const RULE_FORCED: &str = "force";
const RULE_UNMATCHED: &str = "unmatched";

/// Outcome of classifying one PR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Assigned disposition; `None` when no rule matched
    pub disposition: Option<Disposition>,
    /// Name of the rule that decided, e.g. "no-change" or "force"
    pub rule: &'static str,
}

impl Decision {
    const fn new(disposition: Option<Disposition>, rule: &'static str) -> Self {
        Self { disposition, rule }
    }
}

/// PRs grouped by disposition, each group in input order
#[derive(Debug, Clone, Default)]
pub struct Buckets {
    /// No comment yet, or forced to re-plan
    pub no_comment: Vec<PullRequestSnapshot>,
    /// Plan shows a diff
    pub with_diff: Vec<PullRequestSnapshot>,
    /// Nothing to apply
    pub no_change: Vec<PullRequestSnapshot>,
    /// Plan or apply failed
    pub error: Vec<PullRequestSnapshot>,
    /// Superseded by a newer version
    pub to_be_closed: Vec<PullRequestSnapshot>,
    /// Actor's approval was dismissed
    pub dismissed: Vec<PullRequestSnapshot>,
    /// Atlantis still running (skipped)
    pub still_working: Vec<PullRequestSnapshot>,
    /// Already marked as ignored (skipped)
    pub ignored: Vec<PullRequestSnapshot>,
    /// 0 projects planned (labelled, then skipped)
    pub no_project: Vec<PullRequestSnapshot>,
    /// Latest comment matched no rule (skipped, logged)
    pub unmatched: Vec<PullRequestSnapshot>,
    /// Deciding rule per PR, keyed by (repo, number)
    pub rules: HashMap<(String, u64), &'static str>,
}

impl Buckets {
    /// Append a PR to the bucket for `disposition`
    pub fn push(&mut self, disposition: Disposition, pr: PullRequestSnapshot) {
        self.bucket_mut(disposition).push(pr);
    }

    /// PRs with the given disposition
    pub fn get(&self, disposition: Disposition) -> &[PullRequestSnapshot] {
        match disposition {
            Disposition::NoComment => &self.no_comment,
            Disposition::WithDiff => &self.with_diff,
            Disposition::NoChange => &self.no_change,
            Disposition::Error => &self.error,
            Disposition::ToBeClosed => &self.to_be_closed,
            Disposition::Dismissed => &self.dismissed,
            Disposition::StillWorking => &self.still_working,
            Disposition::Ignored => &self.ignored,
            Disposition::NoProject => &self.no_project,
        }
    }

    fn bucket_mut(&mut self, disposition: Disposition) -> &mut Vec<PullRequestSnapshot> {
        match disposition {
            Disposition::NoComment => &mut self.no_comment,
            Disposition::WithDiff => &mut self.with_diff,
            Disposition::NoChange => &mut self.no_change,
            Disposition::Error => &mut self.error,
            Disposition::ToBeClosed => &mut self.to_be_closed,
            Disposition::Dismissed => &mut self.dismissed,
            Disposition::StillWorking => &mut self.still_working,
            Disposition::Ignored => &mut self.ignored,
            Disposition::NoProject => &mut self.no_project,
        }
    }

    /// Name of the rule that put `pr` in its bucket
    pub fn rule_for(&self, pr: &PullRequestSnapshot) -> Option<&'static str> {
        self.rules.get(&(pr.repo.clone(), pr.number)).copied()
    }

    /// PRs that need a plan comment: no-comment first, then error
    pub fn plan_requests(&self) -> impl Iterator<Item = &PullRequestSnapshot> {
        self.no_comment.iter().chain(&self.error)
    }

    /// Total PRs seen, including skipped and unmatched
    pub fn total(&self) -> usize {
        [
            Disposition::NoComment,
            Disposition::WithDiff,
            Disposition::NoChange,
            Disposition::Error,
            Disposition::ToBeClosed,
            Disposition::Dismissed,
            Disposition::StillWorking,
            Disposition::Ignored,
            Disposition::NoProject,
        ]
        .iter()
        .map(|d| self.get(*d).len())
        .sum::<usize>()
            + self.unmatched.len()
    }
}

/// Assigns each PR exactly one disposition
///
/// Owns the compiled rule table; pass the instance to whoever needs to
/// re-check a comment (the dispatcher does, for dismissed PRs).
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: RuleSet,
    actor: String,
}

impl Classifier {
    /// Create a classifier whose approval checks look at `actor`'s reviews
    pub fn new(actor: impl Into<String>) -> Self {
        Self::with_rules(actor, RuleSet::atlantis())
    }

    /// Create a classifier with a custom rule table
    pub fn with_rules(actor: impl Into<String>, rules: RuleSet) -> Self {
        Self {
            rules,
            actor: actor.into(),
        }
    }

    /// Login whose reviews are inspected
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// The rule table
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Classify one PR.
    ///
    /// Order: dismissed approval (comments are not read), then missing
    /// comment, then the rule table. Returns `None` when the latest comment
    /// matches nothing; that case is logged as a warning.
    ///
    /// The only side effect besides logging is the no-project label.
    pub async fn classify(
        &self,
        platform: &dyn PlatformService,
        pr: &PullRequestSnapshot,
        force: bool,
    ) -> Option<Disposition> {
        self.decide(platform, pr, force).await.disposition
    }

    /// Like [`classify`](Self::classify), also naming the rule that decided
    pub async fn decide(
        &self,
        platform: &dyn PlatformService,
        pr: &PullRequestSnapshot,
        force: bool,
    ) -> Decision {
        let review = platform
            .latest_review(pr, &self.actor)
            .await
            .unwrap_or_else(|e| {
                warn!(repo = %pr.repo, pr = pr.number, error = %e, "failed to read reviews, assuming none");
                None
            });

        if review == Some(ReviewState::Dismissed) {
            info!(repo = %pr.repo, pr = pr.number, rule = RULE_DISMISSED, "{pr}: Approval dismissed.");
            return Decision::new(Some(Disposition::Dismissed), RULE_DISMISSED);
        }

        let comment = platform.latest_comment(pr).await.unwrap_or_else(|e| {
            warn!(repo = %pr.repo, pr = pr.number, error = %e, "failed to read comments, assuming none");
            None
        });

        let Some(comment) = comment else {
            info!(repo = %pr.repo, pr = pr.number, rule = RULE_NO_COMMENT, "{pr}: No Comments, new pr.");
            return Decision::new(Some(Disposition::NoComment), RULE_NO_COMMENT);
        };

        match self.rules.evaluate(&comment.body, force) {
            RuleOutcome::Matched {
                rule,
                disposition,
                rationale,
            } => {
                info!(repo = %pr.repo, pr = pr.number, rule, "{pr}: {rationale}");
                if disposition == Disposition::NoProject
                    && let Err(e) = platform.apply_label(pr, LABEL_AUTOMERGE_NO_PROJECT).await
                {
                    warn!(
                        repo = %pr.repo,
                        pr = pr.number,
                        error = %e,
                        "Failed to set label {LABEL_AUTOMERGE_NO_PROJECT}"
                    );
                }
                Decision::new(Some(disposition), rule)
            }
            RuleOutcome::Forced => {
                info!(repo = %pr.repo, pr = pr.number, rule = RULE_FORCED, "{pr}: Will be forced to plan");
                Decision::new(Some(Disposition::NoComment), RULE_FORCED)
            }
            RuleOutcome::Unmatched => {
                warn!(
                    repo = %pr.repo,
                    pr = pr.number,
                    comment_id = comment.id,
                    "{pr}: *** Not match, please check why!!! ***"
                );
                Decision::new(None, RULE_UNMATCHED)
            }
        }
    }

    /// Classify every PR in order and collect the buckets
    pub async fn sort(
        &self,
        platform: &dyn PlatformService,
        prs: &[PullRequestSnapshot],
        force: bool,
    ) -> Buckets {
        let mut buckets = Buckets::default();

        for pr in prs {
            let decision = self.decide(platform, pr, force).await;
            buckets
                .rules
                .insert((pr.repo.clone(), pr.number), decision.rule);
            match decision.disposition {
                Some(disposition) => buckets.push(disposition, pr.clone()),
                None => buckets.unmatched.push(pr.clone()),
            }
        }

        buckets
    }
}
