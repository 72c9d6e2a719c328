//! `gitfleet list`: show what the manifest describes, without touching git.

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use gitfleet_sync::Fleet;

use super::load_manifest;
use crate::GlobalArgs;

/// Arguments for `gitfleet list`.
#[derive(Args, Debug)]
pub struct ListArgs {}

#[derive(Tabled)]
struct ListRow {
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "url")]
    url: String,
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "note")]
    note: String,
}

impl ListArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let manifest = load_manifest(global)?;
        let fleet = Fleet::from_manifest(&manifest).context("failed to build the fleet")?;
        if fleet.is_empty() {
            println!("No repositories in the manifest.");
            return Ok(());
        }

        let rows: Vec<ListRow> = fleet
            .records()
            .iter()
            .map(|record| ListRow {
                repository: record.name(),
                url: record.url.clone(),
                path: record.paths.repo.display().to_string(),
                note: record
                    .error
                    .as_ref()
                    .map(|e| e.label.clone())
                    .unwrap_or_default(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!(
            "{} repositories in {} zones",
            fleet.len(),
            manifest.zones.len()
        );
        Ok(())
    }
}
