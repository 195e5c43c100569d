//! Dispatch execution - effectful operations
//!
//! Takes the buckets produced by the classifier and runs one workflow per
//! bucket. Comment and label calls are best-effort: a failure is logged and
//! the run moves on. Approve, update-branch and merge failures abort the
//! run.

use crate::clock::Clock;
use crate::error::Result;
use crate::mergeability::{MergeabilityWaiter, WaitOutcome};
use crate::platform::PlatformService;
use crate::progress::ProgressCallback;
use crate::triage::{Buckets, Classifier};
use crate::types::{
    COMMENT_ATLANTIS_PLAN, COMMENT_ATLANTIS_UNLOCK, COMMENT_CLOSE_NEW_VERSION, COMMENT_DELAY,
    COMMENT_IGNORE_AUTOMERGE, LABEL_AUTOMERGE_CONFLICT, LABEL_AUTOMERGE_DISMISSED,
    LABEL_AUTOMERGE_IGNORE, MergeabilityState, PullRequestSnapshot,
};
use std::time::Duration;
use tracing::{info, warn};

/// Knobs for the dispatcher
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOptions {
    /// Wait for `blocked` before posting a plan comment, instead of a
    /// single dirty check
    pub wait_for_checks_before_plan: bool,
}

/// What the dispatcher did, per outcome
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Squash-merged
    pub merged: Vec<PullRequestSnapshot>,
    /// Skipped because a mergeability wait ran out of time
    pub timed_out: Vec<PullRequestSnapshot>,
    /// Got an "atlantis plan" comment
    pub plan_requested: Vec<PullRequestSnapshot>,
    /// Dirty: unlocked, marked ignored and labelled as conflicting
    pub conflicted: Vec<PullRequestSnapshot>,
    /// Had a diff: unlocked, marked ignored and labelled
    pub marked_ignored: Vec<PullRequestSnapshot>,
    /// Closed as superseded
    pub closed: Vec<PullRequestSnapshot>,
    /// Dismissed approval was renewed
    pub reapproved: Vec<PullRequestSnapshot>,
    /// Re-approved but left for the next run
    pub deferred: Vec<PullRequestSnapshot>,
    /// Best-effort calls (comments, labels, close) that failed
    pub failed_calls: usize,
}

impl DispatchReport {
    /// Whether no workflow touched any PR
    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
            && self.timed_out.is_empty()
            && self.plan_requested.is_empty()
            && self.conflicted.is_empty()
            && self.marked_ignored.is_empty()
            && self.closed.is_empty()
            && self.reapproved.is_empty()
            && self.deferred.is_empty()
    }
}

/// Runs the per-bucket workflows in a fixed order
pub struct Dispatcher<'a> {
    platform: &'a dyn PlatformService,
    classifier: &'a Classifier,
    clock: &'a dyn Clock,
    progress: &'a dyn ProgressCallback,
    waiter: MergeabilityWaiter<'a>,
    options: DispatchOptions,
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher with default options
    pub fn new(
        platform: &'a dyn PlatformService,
        classifier: &'a Classifier,
        clock: &'a dyn Clock,
        progress: &'a dyn ProgressCallback,
    ) -> Self {
        Self {
            platform,
            classifier,
            clock,
            progress,
            waiter: MergeabilityWaiter::new(platform, clock, progress),
            options: DispatchOptions::default(),
        }
    }

    /// Set dispatch options
    #[must_use]
    pub const fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Override the per-PR mergeability wait budget
    #[must_use]
    pub const fn with_wait_budget(mut self, budget: Duration) -> Self {
        self.waiter = self.waiter.with_budget(budget);
        self
    }

    /// Run every workflow.
    ///
    /// Order: no change, with diff, dismissed, no comment + error, to be
    /// closed. Silent buckets (still working, ignored, no project,
    /// unmatched) are not touched.
    pub async fn dispatch(&self, buckets: &'a Buckets) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();

        if !buckets.no_change.is_empty() {
            self.progress.on_message("Merging PRs with no changes").await;
            for pr in &buckets.no_change {
                self.merge_when_ready(pr, &mut report).await?;
            }
        }

        if !buckets.with_diff.is_empty() {
            self.progress.on_message("Unlocking PRs with diffs").await;
            for pr in &buckets.with_diff {
                self.unlock_and_ignore(pr, LABEL_AUTOMERGE_IGNORE, &mut report)
                    .await;
                report.marked_ignored.push(pr.clone());
            }
        }

        if !buckets.dismissed.is_empty() {
            self.progress.on_message("Re-approving dismissed PRs").await;
            for pr in &buckets.dismissed {
                self.reapprove(pr, &mut report).await?;
            }
        }

        if buckets.plan_requests().next().is_some() {
            self.progress.on_message("Requesting new plans").await;
            for pr in buckets.plan_requests() {
                self.request_plan(pr, &mut report).await?;
            }
        }

        if !buckets.to_be_closed.is_empty() {
            self.progress.on_message("Closing superseded PRs").await;
            for pr in &buckets.to_be_closed {
                self.close_superseded(pr, &mut report).await;
            }
        }

        Ok(report)
    }

    /// Wait for `clean` and squash-merge; a timeout skips the PR
    async fn merge_when_ready(
        &self,
        pr: &'a PullRequestSnapshot,
        report: &mut DispatchReport,
    ) -> Result<()> {
        info!(repo = %pr.repo, pr = pr.number, "*** {pr} ***");

        match self.waiter.await_mergeable(pr, self.classifier.actor()).await? {
            WaitOutcome::Resolved(_) => {}
            WaitOutcome::TimedOut { .. } => {
                report.timed_out.push(pr.clone());
                return Ok(());
            }
        }

        info!(repo = %pr.repo, pr = pr.number, "{pr} merging now");
        self.platform.merge(pr).await?;
        info!(repo = %pr.repo, pr = pr.number, "{pr} merged!");
        self.progress.on_message(&format!("{pr} merged")).await;
        report.merged.push(pr.clone());
        Ok(())
    }

    async fn reapprove(
        &self,
        pr: &'a PullRequestSnapshot,
        report: &mut DispatchReport,
    ) -> Result<()> {
        info!(repo = %pr.repo, pr = pr.number, "{pr} approval was dismissed, re-approving");
        self.platform.approve(pr).await?;
        report.reapproved.push(pr.clone());

        let comment = self.platform.latest_comment(pr).await.unwrap_or_else(|e| {
            warn!(repo = %pr.repo, pr = pr.number, error = %e, "failed to read latest comment");
            None
        });

        match comment {
            Some(c) if self.classifier.rules().is_no_change(&c.body) => {
                info!(repo = %pr.repo, pr = pr.number, "{pr} has no changes, merging after re-approval");
                self.merge_when_ready(pr, report).await
            }
            _ => {
                info!(repo = %pr.repo, pr = pr.number, "{pr} will be processed in next run");
                self.label(pr, LABEL_AUTOMERGE_DISMISSED, report).await;
                report.deferred.push(pr.clone());
                Ok(())
            }
        }
    }

    async fn request_plan(
        &self,
        pr: &'a PullRequestSnapshot,
        report: &mut DispatchReport,
    ) -> Result<()> {
        let state = if self.options.wait_for_checks_before_plan {
            match self.waiter.await_plan_ready(pr).await? {
                WaitOutcome::Resolved(state) => state,
                WaitOutcome::TimedOut { .. } => {
                    report.timed_out.push(pr.clone());
                    return Ok(());
                }
            }
        } else {
            self.platform.mergeable_state(pr).await.unwrap_or_else(|e| {
                warn!(repo = %pr.repo, pr = pr.number, error = %e, "failed to read mergeable state");
                MergeabilityState::Unknown
            })
        };

        if state == MergeabilityState::Dirty {
            info!(repo = %pr.repo, pr = pr.number, "{pr} is dirty, there are conflicts, ignoring");
            self.unlock_and_ignore(pr, LABEL_AUTOMERGE_CONFLICT, report)
                .await;
            report.conflicted.push(pr.clone());
            return Ok(());
        }

        if self.comment(pr, COMMENT_ATLANTIS_PLAN, report).await {
            report.plan_requested.push(pr.clone());
        }
        Ok(())
    }

    async fn close_superseded(&self, pr: &PullRequestSnapshot, report: &mut DispatchReport) {
        self.comment(pr, COMMENT_CLOSE_NEW_VERSION, report).await;
        self.clock.sleep(COMMENT_DELAY).await;
        self.comment(pr, COMMENT_ATLANTIS_UNLOCK, report).await;

        match self.platform.close(pr).await {
            Ok(()) => {
                info!(repo = %pr.repo, pr = pr.number, "{pr} Closed");
                report.closed.push(pr.clone());
            }
            Err(e) => {
                warn!(repo = %pr.repo, pr = pr.number, error = %e, "failed to close {pr}");
                report.failed_calls += 1;
            }
        }
    }

    /// Release the Atlantis lock, leave the ignore marker, then label
    async fn unlock_and_ignore(
        &self,
        pr: &PullRequestSnapshot,
        label: &str,
        report: &mut DispatchReport,
    ) {
        self.comment(pr, COMMENT_ATLANTIS_UNLOCK, report).await;
        self.clock.sleep(COMMENT_DELAY).await;
        self.comment(pr, COMMENT_IGNORE_AUTOMERGE, report).await;
        self.label(pr, label, report).await;
    }

    async fn comment(
        &self,
        pr: &PullRequestSnapshot,
        body: &str,
        report: &mut DispatchReport,
    ) -> bool {
        match self.platform.post_comment(pr, body).await {
            Ok(()) => {
                info!(repo = %pr.repo, pr = pr.number, comment = body, "{pr} Commented");
                true
            }
            Err(e) => {
                warn!(repo = %pr.repo, pr = pr.number, error = %e, "failed to add comment to {pr}");
                report.failed_calls += 1;
                false
            }
        }
    }

    async fn label(&self, pr: &PullRequestSnapshot, label: &str, report: &mut DispatchReport) {
        match self.platform.apply_label(pr, label).await {
            Ok(()) => info!(repo = %pr.repo, pr = pr.number, label, "{pr} Labeled"),
            Err(e) => {
                warn!(repo = %pr.repo, pr = pr.number, label, error = %e, "failed to label {pr}");
                report.failed_calls += 1;
            }
        }
    }
}
