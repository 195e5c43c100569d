//! CLI commands and progress rendering

pub mod approve;
pub mod context;
pub mod style;
pub mod triage;

use anstream::println;
use async_trait::async_trait;
use automerge_bot::mergeability::{WaitOutcome, WaitPhase};
use automerge_bot::progress::ProgressCallback;
use automerge_bot::types::PullRequestSnapshot;
use indicatif::ProgressBar;
use std::sync::Mutex;
use std::time::Duration;
use style::{Stylize, check, spinner_style};

/// Progress sink for the terminal
///
/// Messages are printed as lines; each mergeability wait phase gets a
/// spinner that is replaced by a one-line result when the phase ends.
pub struct CliProgress {
    spinner: Mutex<Option<ProgressBar>>,
    spinners: bool,
}

impl CliProgress {
    /// Progress with wait spinners
    pub const fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
            spinners: true,
        }
    }

    /// Progress without spinners, for verbose runs where log lines would
    /// interleave with the spinner
    pub const fn plain() -> Self {
        Self {
            spinner: Mutex::new(None),
            spinners: false,
        }
    }
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_message(&self, message: &str) {
        println!("{}", message.muted());
    }

    async fn on_wait_started(&self, pr: &PullRequestSnapshot, phase: WaitPhase) {
        if !self.spinners {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(format!("{}: {phase}", pr.accent()));
        spinner.enable_steady_tick(Duration::from_millis(80));

        if let Ok(mut slot) = self.spinner.lock()
            && let Some(previous) = slot.replace(spinner)
        {
            previous.finish_and_clear();
        }
    }

    async fn on_wait_finished(
        &self,
        pr: &PullRequestSnapshot,
        phase: WaitPhase,
        outcome: &WaitOutcome,
    ) {
        let Some(spinner) = self.spinner.lock().ok().and_then(|mut slot| slot.take()) else {
            return;
        };

        match outcome {
            WaitOutcome::Resolved(state) => spinner.finish_with_message(format!(
                "{} {}: {}",
                check(),
                pr.accent(),
                state.to_string().muted()
            )),
            WaitOutcome::TimedOut { last_seen, .. } => spinner.finish_with_message(format!(
                "{} {}: timed out {phase} (last state {last_seen})",
                "!".warn(),
                pr.accent()
            )),
        }
    }
}
