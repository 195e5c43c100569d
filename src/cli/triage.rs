//! Triage command - classify filtered PRs and run the bucket workflows

use crate::cli::CliProgress;
use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use anstream::println;
use automerge_bot::clock::SystemClock;
use automerge_bot::dispatch::{DispatchOptions, DispatchReport, Dispatcher};
use automerge_bot::error::Result;
use automerge_bot::triage::{Buckets, Classifier};
use automerge_bot::types::{Disposition, PullRequestSnapshot};
use std::path::Path;

/// Options for the triage command
#[derive(Debug, Clone, Copy, Default)]
pub struct TriageOptions {
    /// Reroute every PR without "no changes" into the re-plan bucket
    pub force: bool,
    /// Print wait progress without spinners
    pub plain_progress: bool,
}

/// Run the triage command
pub async fn run_triage(config_file: Option<&Path>, options: TriageOptions) -> Result<()> {
    // =========================================================================
    // Phase 1: GATHER
    // =========================================================================

    let ctx = CommandContext::new(config_file)?;
    let prs = ctx.pull_requests().await?;

    if prs.is_empty() {
        println!("{}", "No open PRs match the configured filters.".muted());
        return Ok(());
    }

    println!(
        "{} {}",
        "Checking".emphasis(),
        format!("{} PR(s)...", prs.len()).accent()
    );

    // =========================================================================
    // Phase 2: CLASSIFY
    // =========================================================================

    let classifier = Classifier::new(ctx.settings.github_user.clone());
    let buckets = classifier
        .sort(ctx.platform.as_ref(), &prs, options.force)
        .await;
    print_buckets(&buckets);

    // =========================================================================
    // Phase 3: DISPATCH
    // =========================================================================

    let progress = if options.plain_progress {
        CliProgress::plain()
    } else {
        CliProgress::new()
    };
    let clock = SystemClock;
    let dispatcher = Dispatcher::new(ctx.platform.as_ref(), &classifier, &clock, &progress)
        .with_options(DispatchOptions {
            wait_for_checks_before_plan: ctx.settings.wait_for_checks_before_plan,
        });

    let report = dispatcher.dispatch(&buckets).await?;
    print_report(&report);
    Ok(())
}

fn print_buckets(buckets: &Buckets) {
    println!();
    println!("{}:", "Buckets".emphasis());
    for disposition in [
        Disposition::NoChange,
        Disposition::WithDiff,
        Disposition::Dismissed,
        Disposition::NoComment,
        Disposition::Error,
        Disposition::ToBeClosed,
        Disposition::StillWorking,
        Disposition::Ignored,
        Disposition::NoProject,
    ] {
        let prs = buckets.get(disposition);
        if prs.is_empty() {
            continue;
        }
        let name = if disposition.is_actionable() {
            disposition.to_string().emphasis()
        } else {
            disposition.to_string().muted()
        };
        println!("  {name:<14} {}", list_with_rules(buckets, prs));
    }
    if !buckets.unmatched.is_empty() {
        println!("  {:<14} {}", "unmatched".warn(), list(&buckets.unmatched));
        println!("  {}", "latest comment matched no rule, see log".muted());
    }
    println!();
}

fn print_report(report: &DispatchReport) {
    println!();
    if report.is_empty() {
        println!("{}", "Nothing to do.".muted());
        return;
    }

    let rows: [(&str, &[PullRequestSnapshot]); 8] = [
        ("Merged", report.merged.as_slice()),
        ("Plan requested", report.plan_requested.as_slice()),
        ("Ignored (diff)", report.marked_ignored.as_slice()),
        ("Conflicts", report.conflicted.as_slice()),
        ("Closed", report.closed.as_slice()),
        ("Re-approved", report.reapproved.as_slice()),
        ("Next run", report.deferred.as_slice()),
        ("Timed out", report.timed_out.as_slice()),
    ];

    println!("{} {}", check(), "Done".success());
    for (label, prs) in rows {
        if !prs.is_empty() {
            println!("  {:<15} {}", format!("{label}:").emphasis(), list(prs));
        }
    }
    if report.failed_calls > 0 {
        println!(
            "  {}",
            format!("{} comment/label/close call(s) failed, see log", report.failed_calls).warn()
        );
    }
}

/// PRs with the rule that sorted each one, e.g. `infra#3 (force)`
fn list_with_rules(buckets: &Buckets, prs: &[PullRequestSnapshot]) -> String {
    prs.iter()
        .map(|pr| {
            let id = format!("{}#{}", pr.repo, pr.number).accent();
            match buckets.rule_for(pr) {
                Some(rule) => format!("{id} {}", format!("({rule})").muted()),
                None => id,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn list(prs: &[PullRequestSnapshot]) -> String {
    prs.iter()
        .map(|pr| format!("{}#{}", pr.repo, pr.number).accent())
        .collect::<Vec<_>>()
        .join(", ")
}
