//! Platform service for GitHub
//!
//! Provides the remote-host operations the triage engine consumes. Reads
//! return `Result` and the caller decides how to degrade; mutating calls
//! return `Result` and the caller decides whether a failure is fatal.

mod github;

pub use github::GitHubService;

use crate::config::TitleFilters;
use crate::error::Result;
use crate::types::{Comment, MergeabilityState, PullRequestSnapshot, Review, ReviewState};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Platform service trait for PR operations
///
/// Every method addresses a PR by its snapshot (repository + number); the
/// owner and credentials live in the implementation.
#[async_trait]
pub trait PlatformService: Send + Sync {
    /// List all open PRs in a repository
    async fn list_open_pull_requests(&self, repo: &str) -> Result<Vec<PullRequestSnapshot>>;

    /// Get the chronologically last issue comment on a PR
    ///
    /// Implementations hide pagination: when the comment list spans several
    /// pages the last element of the last page is returned, falling back to
    /// the last element of the first page if the last page cannot be read.
    async fn latest_comment(&self, pr: &PullRequestSnapshot) -> Result<Option<Comment>>;

    /// List reviews on a PR in host order (oldest first)
    async fn list_reviews(&self, pr: &PullRequestSnapshot) -> Result<Vec<Review>>;

    /// Get the state of `actor`'s most recent review, if any.
    ///
    /// Default implementation filters [`list_reviews`](Self::list_reviews).
    async fn latest_review(
        &self,
        pr: &PullRequestSnapshot,
        actor: &str,
    ) -> Result<Option<ReviewState>> {
        let reviews = self.list_reviews(pr).await?;
        Ok(reviews
            .iter()
            .rev()
            .find(|r| r.author == actor)
            .map(|r| r.state))
    }

    /// Fetch the current mergeability state
    async fn mergeable_state(&self, pr: &PullRequestSnapshot) -> Result<MergeabilityState>;

    /// Approve the PR as the authenticated user
    async fn approve(&self, pr: &PullRequestSnapshot) -> Result<()>;

    /// Merge the base branch into the PR's head branch
    async fn update_branch(&self, pr: &PullRequestSnapshot) -> Result<()>;

    /// Squash-merge the PR
    async fn merge(&self, pr: &PullRequestSnapshot) -> Result<()>;

    /// Post an issue comment
    async fn post_comment(&self, pr: &PullRequestSnapshot, body: &str) -> Result<()>;

    /// Add a label
    async fn apply_label(&self, pr: &PullRequestSnapshot, label: &str) -> Result<()>;

    /// Close the PR without merging
    async fn close(&self, pr: &PullRequestSnapshot) -> Result<()>;
}

/// Collect the open PRs of every repository whose title matches a filter.
///
/// Listing is not degraded: a failure here aborts the run, since nothing
/// useful can be done without a snapshot. Output keeps repository order,
/// then host order within a repository.
pub async fn collect_pull_requests(
    platform: &dyn PlatformService,
    repos: &[String],
    filters: &TitleFilters,
) -> Result<Vec<PullRequestSnapshot>> {
    let mut matched = Vec::new();

    for repo in repos {
        info!(repo = %repo, "fetching open PRs");
        let prs = platform.list_open_pull_requests(repo).await?;
        let total = prs.len();
        let before = matched.len();

        matched.extend(prs.into_iter().filter(|pr| filters.matches(&pr.title)));
        debug!(
            repo = %repo,
            total,
            matched = matched.len() - before,
            "filtered PRs by title"
        );
    }

    info!(count = matched.len(), "all pull requests fetched");
    Ok(matched)
}

/// Approve `pr` unless `actor`'s latest review is already an approval.
///
/// A dismissed review counts as "needs approval". Returns whether an
/// approval was submitted. Approval failure is fatal for the caller.
pub async fn ensure_approved(
    platform: &dyn PlatformService,
    pr: &PullRequestSnapshot,
    actor: &str,
) -> Result<bool> {
    let review = platform.latest_review(pr, actor).await.unwrap_or_else(|e| {
        warn!(repo = %pr.repo, pr = pr.number, error = %e, "failed to read reviews, re-approving");
        None
    });

    if review == Some(ReviewState::Approved) {
        info!(repo = %pr.repo, pr = pr.number, "{pr} Approved already");
        return Ok(false);
    }

    info!(repo = %pr.repo, pr = pr.number, review = ?review, "{pr} Needs approving...");
    platform.approve(pr).await?;
    info!(repo = %pr.repo, pr = pr.number, "{pr} Approved");
    Ok(true)
}
