//! automerge-bot: triage and merge Atlantis-planned dependency PRs
//!
//! A run lists the open PRs whose title matches a filter, sorts each one
//! into a bucket by its latest Atlantis comment and review state, then runs
//! one workflow per bucket: merge, unlock and ignore, re-approve, request a
//! plan, or close.
//!
//! # Architecture
//!
//! - [`triage`] - ordered rule table and the classifier that fills buckets
//! - [`mergeability`] - polling of `mergeable_state` against a time budget
//! - [`dispatch`] - per-bucket workflows and the approve-only mode
//! - [`platform`] - the GitHub gateway behind [`platform::PlatformService`]
//! - [`config`] - config file loading and validation

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mergeability;
pub mod platform;
pub mod progress;
pub mod triage;
pub mod types;

pub use error::{Error, Result};
