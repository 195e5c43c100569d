//! Mock platform service for testing

#![allow(dead_code)]

use async_trait::async_trait;
use automerge_bot::error::{Error, Result};
use automerge_bot::platform::PlatformService;
use automerge_bot::types::{
    Comment, MergeabilityState, PullRequestSnapshot, Review, ReviewState,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// One recorded gateway call, addressed by PR number
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListOpen(String),
    LatestComment(u64),
    ListReviews(u64),
    MergeableState(u64),
    Approve(u64),
    UpdateBranch(u64),
    Merge(u64),
    PostComment(u64, String),
    ApplyLabel(u64, String),
    Close(u64),
}

impl Call {
    /// PR number the call addressed, if any
    pub const fn pr(&self) -> Option<u64> {
        match self {
            Self::ListOpen(_) => None,
            Self::LatestComment(n)
            | Self::ListReviews(n)
            | Self::MergeableState(n)
            | Self::Approve(n)
            | Self::UpdateBranch(n)
            | Self::Merge(n)
            | Self::PostComment(n, _)
            | Self::ApplyLabel(n, _)
            | Self::Close(n) => Some(*n),
        }
    }

    /// Whether the call changes remote state
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Approve(_)
                | Self::UpdateBranch(_)
                | Self::Merge(_)
                | Self::PostComment(..)
                | Self::ApplyLabel(..)
                | Self::Close(_)
        )
    }
}

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListOpen,
    LatestComment,
    ListReviews,
    MergeableState,
    Approve,
    UpdateBranch,
    Merge,
    PostComment,
    ApplyLabel,
    Close,
}

/// In-memory GitHub stand-in
///
/// PRs are addressed by number only, so tests must keep numbers unique
/// across repositories. Mergeable states are served from a per-PR queue;
/// the last entry repeats forever. `approve` appends an approved review by
/// the configured actor so later review reads see it.
pub struct MockPlatformService {
    actor: String,
    next_id: AtomicU64,
    open: Mutex<HashMap<String, Vec<PullRequestSnapshot>>>,
    comments: Mutex<HashMap<u64, Vec<Comment>>>,
    reviews: Mutex<HashMap<u64, Vec<Review>>>,
    states: Mutex<HashMap<u64, VecDeque<MergeabilityState>>>,
    failing: Mutex<HashSet<Op>>,
    calls: Mutex<Vec<Call>>,
}

impl MockPlatformService {
    /// Create a mock whose approvals are made as `actor`
    pub fn new(actor: &str) -> Self {
        Self {
            actor: actor.to_string(),
            next_id: AtomicU64::new(1000),
            open: Mutex::new(HashMap::new()),
            comments: Mutex::new(HashMap::new()),
            reviews: Mutex::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    // === Setup ===

    /// Add an open PR to its repository listing
    pub fn add_open(&self, pr: &PullRequestSnapshot) {
        self.open
            .lock()
            .unwrap()
            .entry(pr.repo.clone())
            .or_default()
            .push(pr.clone());
    }

    /// Append a comment to a PR (the last one added is the latest)
    pub fn add_comment(&self, number: u64, author: &str, body: &str) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.comments
            .lock()
            .unwrap()
            .entry(number)
            .or_default()
            .push(Comment {
                id,
                body: body.to_string(),
                author: author.to_string(),
            });
    }

    /// Append a review to a PR (oldest first)
    pub fn add_review(&self, number: u64, author: &str, state: ReviewState) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.reviews
            .lock()
            .unwrap()
            .entry(number)
            .or_default()
            .push(Review {
                id,
                state,
                author: author.to_string(),
            });
    }

    /// Mergeable states returned by successive reads; the last repeats
    pub fn set_states(&self, number: u64, states: &[MergeabilityState]) {
        self.states
            .lock()
            .unwrap()
            .insert(number, states.iter().copied().collect());
    }

    /// Make every call of `op` fail
    pub fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    // === Inspection ===

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls addressing PR `number`
    pub fn calls_for(&self, number: u64) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.pr() == Some(number))
            .collect()
    }

    /// Number of calls matching `pred`
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    /// Comment bodies posted on PR `number`, in order
    pub fn posted_comments(&self, number: u64) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::PostComment(n, body) if n == number => Some(body),
                _ => None,
            })
            .collect()
    }

    /// Labels applied to PR `number`, in order
    pub fn labels(&self, number: u64) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ApplyLabel(n, label) if n == number => Some(label),
                _ => None,
            })
            .collect()
    }

    /// PR numbers merged, in order
    pub fn merged(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Merge(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    /// Number of mergeable-state reads for PR `number`
    pub fn state_reads(&self, number: u64) -> usize {
        self.count(|c| *c == Call::MergeableState(number))
    }

    // === Internals ===

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: Op, pr: Option<&PullRequestSnapshot>) -> Result<()> {
        if !self.failing.lock().unwrap().contains(&op) {
            return Ok(());
        }

        let action = match op {
            Op::Approve => "approve",
            Op::UpdateBranch => "update branch of",
            Op::Merge => "merge",
            _ => return Err(Error::Platform(format!("injected {op:?} failure"))),
        };
        Err(Error::ActionFailed {
            action,
            pr: pr.map(ToString::to_string).unwrap_or_default(),
            status: "422".to_string(),
            reason: "injected failure".to_string(),
        })
    }
}

#[async_trait]
impl PlatformService for MockPlatformService {
    async fn list_open_pull_requests(&self, repo: &str) -> Result<Vec<PullRequestSnapshot>> {
        self.record(Call::ListOpen(repo.to_string()));
        self.check(Op::ListOpen, None)?;
        Ok(self
            .open
            .lock()
            .unwrap()
            .get(repo)
            .cloned()
            .unwrap_or_default())
    }

    async fn latest_comment(&self, pr: &PullRequestSnapshot) -> Result<Option<Comment>> {
        self.record(Call::LatestComment(pr.number));
        self.check(Op::LatestComment, Some(pr))?;
        Ok(self
            .comments
            .lock()
            .unwrap()
            .get(&pr.number)
            .and_then(|c| c.last().cloned()))
    }

    async fn list_reviews(&self, pr: &PullRequestSnapshot) -> Result<Vec<Review>> {
        self.record(Call::ListReviews(pr.number));
        self.check(Op::ListReviews, Some(pr))?;
        Ok(self
            .reviews
            .lock()
            .unwrap()
            .get(&pr.number)
            .cloned()
            .unwrap_or_default())
    }

    async fn mergeable_state(&self, pr: &PullRequestSnapshot) -> Result<MergeabilityState> {
        self.record(Call::MergeableState(pr.number));
        self.check(Op::MergeableState, Some(pr))?;

        let mut states = self.states.lock().unwrap();
        let Some(queue) = states.get_mut(&pr.number) else {
            return Ok(MergeabilityState::Clean);
        };
        let state = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().copied()
        };
        Ok(state.unwrap_or(MergeabilityState::Unknown))
    }

    async fn approve(&self, pr: &PullRequestSnapshot) -> Result<()> {
        self.record(Call::Approve(pr.number));
        self.check(Op::Approve, Some(pr))?;
        self.add_review(pr.number, &self.actor.clone(), ReviewState::Approved);
        Ok(())
    }

    async fn update_branch(&self, pr: &PullRequestSnapshot) -> Result<()> {
        self.record(Call::UpdateBranch(pr.number));
        self.check(Op::UpdateBranch, Some(pr))
    }

    async fn merge(&self, pr: &PullRequestSnapshot) -> Result<()> {
        self.record(Call::Merge(pr.number));
        self.check(Op::Merge, Some(pr))
    }

    async fn post_comment(&self, pr: &PullRequestSnapshot, body: &str) -> Result<()> {
        self.record(Call::PostComment(pr.number, body.to_string()));
        self.check(Op::PostComment, Some(pr))
    }

    async fn apply_label(&self, pr: &PullRequestSnapshot, label: &str) -> Result<()> {
        self.record(Call::ApplyLabel(pr.number, label.to_string()));
        self.check(Op::ApplyLabel, Some(pr))
    }

    async fn close(&self, pr: &PullRequestSnapshot) -> Result<()> {
        self.record(Call::Close(pr.number));
        self.check(Op::Close, Some(pr))
    }
}
