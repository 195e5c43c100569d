//! Shared command context for CLI commands
//!
//! Loads settings and builds the GitHub client for triage and approve.

use automerge_bot::config::{Settings, load_settings, resolve_config_path};
use automerge_bot::error::Result;
use automerge_bot::platform::{GitHubService, PlatformService, collect_pull_requests};
use automerge_bot::types::PullRequestSnapshot;
use std::path::Path;
use tracing::debug;

/// Settings plus the platform service built from them
pub struct CommandContext {
    /// Validated settings
    pub settings: Settings,
    /// Platform service (GitHub)
    pub platform: Box<dyn PlatformService>,
}

impl CommandContext {
    /// Load and validate the config, then create the GitHub client.
    ///
    /// Nothing touches the network before the config is valid.
    pub fn new(config_file: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(config_file);
        let settings = load_settings(&path)?;
        debug!(
            path = %path.display(),
            owner = %settings.owner,
            repos = settings.repos.len(),
            filters = settings.filters.len(),
            "config loaded"
        );

        let platform = GitHubService::new(
            &settings.access_token,
            settings.owner.clone(),
            settings.host.as_deref(),
        )?;

        Ok(Self {
            settings,
            platform: Box::new(platform),
        })
    }

    /// Open PRs in every configured repository, filtered by title
    pub async fn pull_requests(&self) -> Result<Vec<PullRequestSnapshot>> {
        collect_pull_requests(
            self.platform.as_ref(),
            &self.settings.repos,
            &self.settings.filters,
        )
        .await
    }
}
