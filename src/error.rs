//! Error types for automerge-bot

use thiserror::Error;

/// Errors that can abort a run
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or incomplete configuration, detected before any network call
    #[error("configuration error: {0}")]
    Config(String),

    /// GitHub API or transport failure
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// A mutating call the workflow cannot continue without failed
    #[error("failed to {action} {pr}\n Status code: {status}\n Reason: {reason}")]
    ActionFailed {
        /// Action that failed, e.g. "approve" or "merge"
        action: &'static str,
        /// PR identity, e.g. "PR 12 in repo infra"
        pr: String,
        /// HTTP status (or "transport" when no response arrived)
        status: String,
        /// Response body or transport error text
        reason: String,
    },

    /// Generic gateway failure
    #[error("platform error: {0}")]
    Platform(String),

    /// Run interrupted by the user
    #[error("exiting by user request")]
    Interrupted,
}

impl From<octocrab::Error> for Error {
    fn from(err: octocrab::Error) -> Self {
        Self::GitHubApi(err.to_string())
    }
}

/// Result type alias for automerge-bot
pub type Result<T> = std::result::Result<T, Error>;
