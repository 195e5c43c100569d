//! Approve command - approve every filtered PR, no triage

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use anstream::println;
use automerge_bot::dispatch::approve_all;
use automerge_bot::error::Result;
use std::path::Path;

/// Run the approve-all command
pub async fn run_approve_all(config_file: Option<&Path>) -> Result<()> {
    let ctx = CommandContext::new(config_file)?;
    let prs = ctx.pull_requests().await?;

    let approved = approve_all(ctx.platform.as_ref(), &prs, &ctx.settings.github_user).await?;

    if approved.is_empty() {
        println!("{}", "Nothing to be approved".muted());
    } else {
        println!(
            "{} Approved {}",
            check(),
            format!("{} PR(s)", approved.len()).accent()
        );
        for pr in &approved {
            println!("  {}", pr.html_url.muted());
        }
    }
    Ok(())
}
