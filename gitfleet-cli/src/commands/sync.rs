//! `gitfleet sync`: verify, confirm and reconcile every repository.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use gitfleet_sync::{run_blocking, AutoConfirm, Confirmer};

use super::{confirm::PromptConfirmer, git_pipeline, load_fleet, render};
use crate::GlobalArgs;

/// Arguments for `gitfleet sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Accept every recommended action without prompting.
    #[arg(short, long)]
    pub yes: bool,

    /// Report clones and actions without executing them.
    #[arg(long)]
    pub dry_run: bool,

    /// Commit message for every committing action.
    #[arg(short, long, value_name = "TEXT")]
    pub message: Option<String>,

    /// Emit machine-readable JSON (requires --yes).
    #[arg(long, requires = "yes")]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let mut fleet = load_fleet(global)?;
        let pipeline = git_pipeline(global, self.dry_run)?;
        let mut reporter = render::StageReporter::new(!self.json && global.verbose > 0);
        let mut confirmer: Box<dyn Confirmer> = if self.yes {
            Box::new(AutoConfirm::with_message(self.message.clone()))
        } else {
            Box::new(PromptConfirmer::new(self.message.clone()))
        };

        let started = Instant::now();
        let stats = run_blocking(
            global.jobs,
            pipeline.run(&mut fleet, confirmer.as_mut(), &mut reporter),
        )
        .context("sync run failed")?;
        let elapsed = started.elapsed();

        if self.json {
            return render::print_json(&fleet, &stats, elapsed, self.dry_run);
        }
        render::print_table(&fleet, &stats, elapsed, self.dry_run);
        Ok(())
    }
}
