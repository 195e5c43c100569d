//! Triage engine for bot-planned PRs
//!
//! Two layers:
//! 1. Rules - ordered pattern table over a comment body (pure, testable)
//! 2. Classify - fetch review + comment state and sort PRs into buckets (effectful)

mod classify;
mod rules;

pub use classify::{Buckets, Classifier, Decision};
pub use rules::{Rule, RuleOutcome, RuleSet};
