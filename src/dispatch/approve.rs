//! Approve-only run mode

use crate::error::Result;
use crate::platform::{PlatformService, ensure_approved};
use crate::types::PullRequestSnapshot;
use tracing::info;

/// Approve every PR `actor` has not approved yet.
///
/// Returns the PRs that received a new approval. Stops at the first
/// approval failure.
pub async fn approve_all(
    platform: &dyn PlatformService,
    prs: &[PullRequestSnapshot],
    actor: &str,
) -> Result<Vec<PullRequestSnapshot>> {
    let mut approved = Vec::new();

    for pr in prs {
        if ensure_approved(platform, pr, actor).await? {
            approved.push(pr.clone());
        }
    }

    if approved.is_empty() {
        info!("Nothing to be approved");
    } else {
        info!(count = approved.len(), "All completed");
    }

    Ok(approved)
}
