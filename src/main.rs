//! automerge - triage and merge Atlantis-planned dependency PRs

mod cli;

use anstream::eprintln;
use automerge_bot::error::{Error, Result};
use clap::Parser;
use cli::style::Stylize;
use cli::triage::TriageOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Triage Atlantis-planned PRs: merge the ones with no changes, re-plan,
/// unlock or close the rest
#[derive(Parser, Debug)]
#[command(name = "automerge", version, about)]
struct Cli {
    /// Config file (JSON, or TOML with a .toml extension) [default: ./config.json]
    #[arg(long, alias = "config_file", value_name = "PATH")]
    config_file: Option<PathBuf>,

    /// Request a new plan for every PR that does not report "no changes"
    #[arg(long, conflicts_with = "approve_all")]
    force: bool,

    /// Only approve every filtered PR, without triage
    #[arg(long, alias = "approve_all")]
    approve_all: bool,

    /// Verbose logging (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{default},hyper=warn,reqwest=warn,octocrab=warn"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config_file = cli.config_file.as_deref();

    if cli.approve_all {
        cli::approve::run_approve_all(config_file).await
    } else {
        cli::triage::run_triage(
            config_file,
            TriageOptions {
                force: cli.force,
                plain_progress: cli.verbose > 0,
            },
        )
        .await
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => Err(Error::Interrupted),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run aborted");
            eprintln!("{} {e}", "error:".warn());
            ExitCode::FAILURE
        }
    }
}
