//! gitfleet: keep a fleet of git checkouts in sync with their upstreams.
//!
//! # Usage
//!
//! ```text
//! gitfleet [--manifest <path>] [-v|-vv] [-j <jobs>] status [--json]
//! gitfleet [--manifest <path>] [-v|-vv] [-j <jobs>] sync [--yes] [--dry-run] [--message <text>] [--json]
//! gitfleet [--manifest <path>] list
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{list::ListArgs, status::StatusArgs, sync::SyncArgs};
use gitfleet_sync::DEFAULT_JOBS;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "gitfleet",
    version,
    about = "Verify and reconcile a fleet of git repositories",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Manifest file (default: ~/.gitfleet/manifest.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Maximum concurrent repository tasks per stage.
    #[arg(
        short = 'j',
        long,
        global = true,
        default_value_t = DEFAULT_JOBS,
        value_parser = parse_jobs,
    )]
    pub jobs: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify every repository and report where it stands. Changes nothing
    /// except creating workspaces and cloning missing checkouts.
    Status(StatusArgs),

    /// Verify, confirm and apply the recommended action to each repository.
    Sync(SyncArgs),

    /// List the repositories the manifest describes.
    List(ListArgs),
}

fn parse_jobs(raw: &str) -> std::result::Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(jobs) => Ok(jobs),
        Err(err) => Err(err.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);
    match cli.command {
        Commands::Status(args) => args.run(&cli.global),
        Commands::Sync(args) => args.run(&cli.global),
        Commands::List(args) => args.run(&cli.global),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
