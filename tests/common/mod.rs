//! Shared test helpers

#![allow(dead_code)]

pub mod clock;
pub mod mock_platform;

pub use clock::ManualClock;
pub use mock_platform::{Call, MockPlatformService, Op};

use automerge_bot::types::PullRequestSnapshot;
use std::path::PathBuf;
use tempfile::TempDir;

/// Login the bot acts as in tests
pub const ACTOR: &str = "automerge-bot";

/// Login Atlantis comments as
pub const ATLANTIS: &str = "atlantis-bot";

/// Create a PR snapshot in `repo`
pub fn make_pr(repo: &str, number: u64) -> PullRequestSnapshot {
    make_titled_pr(repo, number, &format!("Update terraform aws to v5.{number}.0"))
}

/// Create a PR snapshot with a specific title
pub fn make_titled_pr(repo: &str, number: u64, title: &str) -> PullRequestSnapshot {
    PullRequestSnapshot {
        repo: repo.to_string(),
        number,
        title: title.to_string(),
        html_url: format!("https://github.com/acme/{repo}/pull/{number}"),
    }
}

/// Write `content` as `name` in a fresh temp dir
pub fn write_config(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    (dir, path)
}
