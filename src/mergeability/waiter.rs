//! Fixed-interval polling of `mergeable_state` against a wall-clock budget

use crate::clock::Clock;
use crate::error::Result;
use crate::platform::{PlatformService, ensure_approved};
use crate::progress::ProgressCallback;
use crate::types::{
    MERGEABLE_STATE_TIMEOUT, MergeabilityState, PLAN_READY_POLL_INTERVAL, PullRequestSnapshot,
    RESOLVE_POLL_INTERVAL,
};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Which part of a wait is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPhase {
    /// Waiting for the state to leave `unknown`
    Resolve,
    /// Waiting for `clean` before merging
    Checks,
    /// Waiting for `blocked` before asking for a plan
    PlanReady,
}

impl std::fmt::Display for WaitPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolve => write!(f, "waiting for mergeable state to return"),
            Self::Checks => write!(f, "waiting for checks to pass"),
            Self::PlanReady => write!(f, "waiting for the PR to be ready to plan"),
        }
    }
}

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A wanted state was observed
    Resolved(MergeabilityState),
    /// The budget ran out during `phase`
    TimedOut {
        /// Phase that was running when the deadline passed
        phase: WaitPhase,
        /// Last state observed
        last_seen: MergeabilityState,
    },
}

impl WaitOutcome {
    /// The resolved state, if the wait did not time out
    pub const fn state(self) -> Option<MergeabilityState> {
        match self {
            Self::Resolved(state) => Some(state),
            Self::TimedOut { .. } => None,
        }
    }
}

/// States of one polling loop
#[derive(Debug, Clone, Copy)]
enum PollStep {
    Observe,
    Evaluate(MergeabilityState),
    Sleep,
    Done(WaitOutcome),
}

/// Polls a PR's mergeability with a fixed interval and a shared deadline
#[derive(Clone, Copy)]
pub struct MergeabilityWaiter<'a> {
    platform: &'a dyn PlatformService,
    clock: &'a dyn Clock,
    progress: &'a dyn ProgressCallback,
    budget: Duration,
}

impl<'a> MergeabilityWaiter<'a> {
    /// Create a waiter with the default 240 second budget
    pub fn new(
        platform: &'a dyn PlatformService,
        clock: &'a dyn Clock,
        progress: &'a dyn ProgressCallback,
    ) -> Self {
        Self {
            platform,
            clock,
            progress,
            budget: MERGEABLE_STATE_TIMEOUT,
        }
    }

    /// Override the overall budget
    #[must_use]
    pub const fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Start a wait for `pr`; the deadline is fixed now
    pub fn session(&self, pr: &'a PullRequestSnapshot) -> WaitSession<'a> {
        WaitSession {
            platform: self.platform,
            clock: self.clock,
            progress: self.progress,
            pr,
            deadline: self.clock.now() + self.budget,
            polls: 0,
        }
    }

    /// Single-phase wait: poll until `want` holds or the budget runs out
    pub async fn await_state<F>(
        &self,
        pr: &'a PullRequestSnapshot,
        phase: WaitPhase,
        interval: Duration,
        want: F,
    ) -> WaitOutcome
    where
        F: Fn(MergeabilityState) -> bool + Send + Sync,
    {
        self.session(pr).until(phase, interval, None, want).await
    }

    /// Pre-merge wait.
    ///
    /// Resolves past `unknown`, updates the branch once if it is behind,
    /// makes sure `actor` has approved, then waits for `clean`. Both phases
    /// share one budget. On timeout nothing after the timed-out phase runs.
    ///
    /// Update-branch and approve failures are fatal and returned as `Err`.
    pub async fn await_mergeable(
        &self,
        pr: &'a PullRequestSnapshot,
        actor: &str,
    ) -> Result<WaitOutcome> {
        let mut session = self.session(pr);

        let resolved = match session
            .until(WaitPhase::Resolve, RESOLVE_POLL_INTERVAL, None, MergeabilityState::is_resolved)
            .await
        {
            WaitOutcome::Resolved(state) => state,
            timed_out @ WaitOutcome::TimedOut { .. } => return Ok(timed_out),
        };

        let carried = self.update_if_behind(pr, resolved).await?;
        ensure_approved(self.platform, pr, actor).await?;

        Ok(session
            .until(WaitPhase::Checks, RESOLVE_POLL_INTERVAL, carried, |s| {
                s == MergeabilityState::Clean
            })
            .await)
    }

    /// Pre-plan-comment wait.
    ///
    /// Resolves past `unknown`, updates the branch if it is behind, then
    /// waits for `blocked`. Observing `dirty` at any point ends the wait
    /// with `Resolved(Dirty)` so the caller can handle the conflict.
    pub async fn await_plan_ready(&self, pr: &'a PullRequestSnapshot) -> Result<WaitOutcome> {
        let mut session = self.session(pr);

        let resolved = match session
            .until(WaitPhase::Resolve, RESOLVE_POLL_INTERVAL, None, MergeabilityState::is_resolved)
            .await
        {
            WaitOutcome::Resolved(state) => state,
            timed_out @ WaitOutcome::TimedOut { .. } => return Ok(timed_out),
        };

        if resolved == MergeabilityState::Dirty {
            return Ok(WaitOutcome::Resolved(resolved));
        }

        let carried = self.update_if_behind(pr, resolved).await?;

        Ok(session
            .until(WaitPhase::PlanReady, PLAN_READY_POLL_INTERVAL, carried, |s| {
                matches!(s, MergeabilityState::Blocked | MergeabilityState::Dirty)
            })
            .await)
    }

    /// Update the branch when `state` is `behind`.
    ///
    /// Returns the state the next phase may start from: after an update the
    /// old reading is stale and must be fetched again.
    async fn update_if_behind(
        &self,
        pr: &PullRequestSnapshot,
        state: MergeabilityState,
    ) -> Result<Option<MergeabilityState>> {
        if state != MergeabilityState::Behind {
            return Ok(Some(state));
        }

        info!(repo = %pr.repo, pr = pr.number, "{pr} is behind, updating branch");
        self.platform.update_branch(pr).await?;
        Ok(None)
    }
}

/// One PR's wait, possibly spanning several phases under one deadline
pub struct WaitSession<'a> {
    platform: &'a dyn PlatformService,
    clock: &'a dyn Clock,
    progress: &'a dyn ProgressCallback,
    pr: &'a PullRequestSnapshot,
    deadline: Instant,
    polls: u32,
}

impl WaitSession<'_> {
    /// Number of state fetches made so far in this session
    pub const fn polls(&self) -> u32 {
        self.polls
    }

    /// Poll until `want` holds or the deadline passes.
    ///
    /// `carried` is a reading from a previous phase that is still valid;
    /// it is evaluated before any new fetch.
    pub async fn until<F>(
        &mut self,
        phase: WaitPhase,
        interval: Duration,
        carried: Option<MergeabilityState>,
        want: F,
    ) -> WaitOutcome
    where
        F: Fn(MergeabilityState) -> bool + Send + Sync,
    {
        self.progress.on_wait_started(self.pr, phase).await;

        let mut step = carried.map_or(PollStep::Observe, PollStep::Evaluate);
        let outcome = loop {
            step = match step {
                PollStep::Observe => PollStep::Evaluate(self.observe().await),
                PollStep::Evaluate(state) => {
                    if want(state) {
                        PollStep::Done(WaitOutcome::Resolved(state))
                    } else if self.clock.now() > self.deadline {
                        PollStep::Done(WaitOutcome::TimedOut {
                            phase,
                            last_seen: state,
                        })
                    } else {
                        PollStep::Sleep
                    }
                }
                PollStep::Sleep => {
                    self.clock.sleep(interval).await;
                    PollStep::Observe
                }
                PollStep::Done(outcome) => break outcome,
            };
        };

        self.progress.on_wait_finished(self.pr, phase, &outcome).await;

        match outcome {
            WaitOutcome::Resolved(state) => {
                debug!(repo = %self.pr.repo, pr = self.pr.number, %state, polls = self.polls, "wait resolved");
            }
            WaitOutcome::TimedOut { phase, last_seen } => {
                warn!(
                    repo = %self.pr.repo,
                    pr = self.pr.number,
                    %last_seen,
                    "{}: Timeout expired {phase}, skipping",
                    self.pr
                );
            }
        }

        outcome
    }

    /// Fetch the current state; a failed read counts as `unknown`
    async fn observe(&mut self) -> MergeabilityState {
        self.polls += 1;
        self.platform
            .mergeable_state(self.pr)
            .await
            .unwrap_or_else(|e| {
                warn!(repo = %self.pr.repo, pr = self.pr.number, error = %e, "failed to read mergeable state");
                MergeabilityState::Unknown
            })
    }
}
