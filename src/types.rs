//! Core types for automerge-bot

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Overall budget for one PR's mergeability wait, shared by all phases
pub const MERGEABLE_STATE_TIMEOUT: Duration = Duration::from_secs(240);

/// Poll interval while resolving past `unknown` and while waiting for `clean`
pub const RESOLVE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poll interval while waiting for `blocked` before a plan comment
pub const PLAN_READY_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// Delay between two consecutive marker comments on the same PR
pub const COMMENT_DELAY: Duration = Duration::from_secs(4);

/// Comment asking Atlantis to plan
pub const COMMENT_ATLANTIS_PLAN: &str = "atlantis plan";
/// Comment asking Atlantis to release its locks
pub const COMMENT_ATLANTIS_UNLOCK: &str = "atlantis unlock";
/// Marker comment telling later runs to leave the PR alone
pub const COMMENT_IGNORE_AUTOMERGE: &str = "This PR will be ignored by automerge";
/// Notice posted before closing a superseded PR
pub const COMMENT_CLOSE_NEW_VERSION: &str =
    "This PR will be closed since there is a new version of this dependency";

/// Label for PRs with a real diff
pub const LABEL_AUTOMERGE_IGNORE: &str = "automerge_ignore";
/// Label for PRs where Atlantis planned 0 projects
pub const LABEL_AUTOMERGE_NO_PROJECT: &str = "automerge_no_project";
/// Label for re-approved PRs left for the next run
pub const LABEL_AUTOMERGE_DISMISSED: &str = "automerge_dismissed";
/// Label for PRs with merge conflicts
pub const LABEL_AUTOMERGE_CONFLICT: &str = "automerge_conflict";

/// A pull request as listed at the start of a run
///
/// Immutable for the rest of the run. Mergeability is deliberately absent:
/// it is fetched on demand by the waiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSnapshot {
    /// Repository name (without owner)
    pub repo: String,
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Web URL for the PR
    pub html_url: String,
}

impl std::fmt::Display for PullRequestSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PR {} in repo {}", self.number, self.repo)
    }
}

/// An issue comment on a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment ID
    pub id: u64,
    /// Comment body text
    pub body: String,
    /// Login of the comment author
    pub author: String,
}

/// Review state as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewState {
    /// Approved
    Approved,
    /// Approval was dismissed (e.g. by a new push)
    Dismissed,
    /// Changes requested
    ChangesRequested,
    /// Comment-only review
    Commented,
    /// Pending (not submitted)
    Pending,
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "APPROVED"),
            Self::Dismissed => write!(f, "DISMISSED"),
            Self::ChangesRequested => write!(f, "CHANGES_REQUESTED"),
            Self::Commented => write!(f, "COMMENTED"),
            Self::Pending => write!(f, "PENDING"),
        }
    }
}

/// A review on a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Review ID
    pub id: u64,
    /// Review state
    pub state: ReviewState,
    /// Login of the reviewer
    pub author: String,
}

/// Remotely computed readiness of a PR to be merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeabilityState {
    /// Not computed yet; always transient
    Unknown,
    /// Head branch is behind the base branch
    Behind,
    /// Mergeable, but blocked by required reviews or checks
    Blocked,
    /// Ready to merge
    Clean,
    /// Merge conflicts
    Dirty,
    /// Mergeable with failing non-required checks
    Unstable,
    /// Mergeable, pre-receive hooks pending
    HasHooks,
    /// Draft PR
    Draft,
}

impl MergeabilityState {
    /// Parse the `mergeable_state` field of the pulls API
    ///
    /// Unrecognized values read as `Unknown` so a poll keeps going.
    pub fn from_api(value: Option<&str>) -> Self {
        match value {
            Some("behind") => Self::Behind,
            Some("blocked") => Self::Blocked,
            Some("clean") => Self::Clean,
            Some("dirty") => Self::Dirty,
            Some("unstable") => Self::Unstable,
            Some("has_hooks") => Self::HasHooks,
            Some("draft") => Self::Draft,
            _ => Self::Unknown,
        }
    }

    /// Whether the host has finished computing the state
    pub const fn is_resolved(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for MergeabilityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Behind => write!(f, "behind"),
            Self::Blocked => write!(f, "blocked"),
            Self::Clean => write!(f, "clean"),
            Self::Dirty => write!(f, "dirty"),
            Self::Unstable => write!(f, "unstable"),
            Self::HasHooks => write!(f, "has_hooks"),
            Self::Draft => write!(f, "draft"),
        }
    }
}

/// Classification outcome for one PR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    /// No comment yet (or forced): request a plan
    NoComment,
    /// Plan shows a diff: unlock and ignore
    WithDiff,
    /// Nothing to apply: merge
    NoChange,
    /// Plan/apply failed: request a new plan
    Error,
    /// Superseded by a newer version: close
    ToBeClosed,
    /// Actor's approval was dismissed: re-approve
    Dismissed,
    /// Atlantis is still running (silent skip)
    StillWorking,
    /// Already marked as ignored (silent skip)
    Ignored,
    /// Atlantis planned 0 projects (labelled, then skipped)
    NoProject,
}

impl Disposition {
    /// Whether the dispatcher runs a workflow for this disposition
    pub const fn is_actionable(self) -> bool {
        !matches!(self, Self::StillWorking | Self::Ignored | Self::NoProject)
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NoComment => "no comment",
            Self::WithDiff => "with diff",
            Self::NoChange => "no change",
            Self::Error => "error",
            Self::ToBeClosed => "to be closed",
            Self::Dismissed => "dismissed",
            Self::StillWorking => "still working",
            Self::Ignored => "ignored",
            Self::NoProject => "no project",
        };
        write!(f, "{name}")
    }
}
