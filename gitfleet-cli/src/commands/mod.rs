pub mod confirm;
pub mod list;
pub mod render;
pub mod status;
pub mod sync;

use std::sync::Arc;

use anyhow::{Context, Result};

use gitfleet_core::{manifest, Manifest};
use gitfleet_sync::{Fleet, GitCli, Pipeline, PipelineOptions};

use crate::GlobalArgs;

/// Load the manifest named by `--manifest`, or `~/.gitfleet/manifest.yaml`.
pub fn load_manifest(global: &GlobalArgs) -> Result<Manifest> {
    match &global.manifest {
        Some(path) => manifest::load_from(path)
            .with_context(|| format!("failed to load manifest from {}", path.display())),
        None => manifest::load().context("failed to load the default manifest"),
    }
}

/// Build the fleet for this run.
pub fn load_fleet(global: &GlobalArgs) -> Result<Fleet> {
    let manifest = load_manifest(global)?;
    let fleet = Fleet::from_manifest(&manifest).context("failed to build the fleet")?;
    tracing::info!(repositories = fleet.len(), "fleet loaded");
    Ok(fleet)
}

/// Pipeline over the system git for this run.
pub fn git_pipeline(global: &GlobalArgs, dry_run: bool) -> Result<Pipeline> {
    let options = PipelineOptions {
        jobs: global.jobs,
        dry_run,
    };
    Pipeline::new(Arc::new(GitCli::new()), options)
        .with_context(|| format!("failed to configure the pipeline with {} jobs", global.jobs))
}
