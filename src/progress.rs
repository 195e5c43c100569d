//! Progress reporting for long-running steps

use crate::mergeability::{WaitOutcome, WaitPhase};
use crate::types::PullRequestSnapshot;
use async_trait::async_trait;

/// Receives progress updates while the dispatcher works
///
/// The CLI renders these with a spinner; tests use [`NoopProgress`].
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// A one-line status message
    async fn on_message(&self, message: &str);

    /// A mergeability wait phase started for `pr`
    async fn on_wait_started(&self, pr: &PullRequestSnapshot, phase: WaitPhase);

    /// A mergeability wait phase finished for `pr`
    async fn on_wait_finished(
        &self,
        pr: &PullRequestSnapshot,
        phase: WaitPhase,
        outcome: &WaitOutcome,
    );
}

/// Progress sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_message(&self, _message: &str) {}

    async fn on_wait_started(&self, _pr: &PullRequestSnapshot, _phase: WaitPhase) {}

    async fn on_wait_finished(
        &self,
        _pr: &PullRequestSnapshot,
        _phase: WaitPhase,
        _outcome: &WaitOutcome,
    ) {
    }
}
