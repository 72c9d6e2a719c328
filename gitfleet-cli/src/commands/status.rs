//! `gitfleet status`: verify every repository without changing it.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use gitfleet_sync::run_blocking;

use super::{git_pipeline, load_fleet, render};
use crate::GlobalArgs;

/// Arguments for `gitfleet status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let mut fleet = load_fleet(global)?;
        let pipeline = git_pipeline(global, false)?;
        let mut reporter = render::StageReporter::new(!self.json && global.verbose > 0);

        let started = Instant::now();
        let stats = run_blocking(global.jobs, pipeline.verify(&mut fleet, &mut reporter))
            .context("status run failed")?;
        let elapsed = started.elapsed();

        if self.json {
            return render::print_json(&fleet, &stats, elapsed, false);
        }
        render::print_table(&fleet, &stats, elapsed, false);
        Ok(())
    }
}
