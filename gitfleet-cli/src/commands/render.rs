//! Console and JSON rendering of a finished run.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use gitfleet_sync::{Category, Fleet, RepoRecord, Reporter, RunStats};

// ---------------------------------------------------------------------------
// Stage progress
// ---------------------------------------------------------------------------

/// Prints one line per finished stage to stderr.
#[derive(Debug, Clone, Copy)]
pub struct StageReporter {
    enabled: bool,
}

impl StageReporter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Reporter for StageReporter {
    fn stage(&mut self, stats: &RunStats) {
        if !self.enabled {
            return;
        }
        eprintln!(
            "{} {:<16} {} complete  {} pending  {} skipped",
            "■".bright_black(),
            stats.stage.to_string(),
            stats.complete_count(),
            stats.pending_count(),
            stats.skipped_count(),
        );
    }
}

// ---------------------------------------------------------------------------
// Report model
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RunReportJson {
    summary: SummaryJson,
    repositories: Vec<RepoJson>,
}

#[derive(Serialize)]
struct SummaryJson {
    complete: usize,
    pending: usize,
    skipped: usize,
    elapsed_secs: f64,
    dry_run: bool,
    finished_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct RepoJson {
    name: String,
    url: String,
    path: String,
    category: Category,
    status: Option<String>,
    action: String,
    pending_clone: bool,
    cloned: bool,
    error: Option<ErrorJson>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct ErrorJson {
    label: String,
    message: String,
}

#[derive(Tabled)]
struct RepoTableRow {
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "category")]
    category: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "action")]
    action: String,
    #[tabled(rename = "detail")]
    detail: String,
}

fn repo_json(record: &RepoRecord) -> RepoJson {
    RepoJson {
        name: record.name(),
        url: record.url.clone(),
        path: record.paths.repo.display().to_string(),
        category: record.category(),
        status: record.status().map(|s| s.to_string()),
        action: record.action().to_string(),
        pending_clone: record.pending_clone,
        cloned: record.cloned,
        error: record.error.as_ref().map(|e| ErrorJson {
            label: e.label.clone(),
            message: e.message.clone(),
        }),
        warnings: record.warnings.clone(),
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

pub fn print_json(fleet: &Fleet, stats: &RunStats, elapsed: Duration, dry_run: bool) -> Result<()> {
    let payload = RunReportJson {
        summary: SummaryJson {
            complete: stats.complete_count(),
            pending: stats.pending_count(),
            skipped: stats.skipped_count(),
            elapsed_secs: elapsed.as_secs_f64(),
            dry_run,
            finished_at: stats.taken_at,
        },
        repositories: fleet.records().iter().map(repo_json).collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize run report")?
    );
    Ok(())
}

pub fn print_table(fleet: &Fleet, stats: &RunStats, elapsed: Duration, dry_run: bool) {
    if fleet.is_empty() {
        println!("No repositories in the manifest.");
        return;
    }

    let separator = "■".repeat(67).bright_black().to_string();
    let mut grouped = BTreeMap::<String, Vec<&RepoRecord>>::new();
    for record in fleet.records() {
        grouped
            .entry(record.identity.workspace.to_string())
            .or_default()
            .push(record);
    }

    println!("{separator}");
    println!(
        "Indicators: {} COMPLETE  {} PENDING  {} SCHEDULED  {} SKIPPED",
        category_indicator(Category::Complete),
        category_indicator(Category::Pending),
        category_indicator(Category::Scheduled),
        category_indicator(Category::Skipped),
    );
    println!("{separator}");
    for (workspace, records) in grouped {
        println!("{}", workspace.to_uppercase().bold());
        let rows: Vec<RepoTableRow> = records
            .into_iter()
            .map(|record| RepoTableRow {
                repository: record.identity.name.to_string(),
                category: format!(
                    "{} {}",
                    category_indicator(record.category()),
                    record.category()
                ),
                status: record
                    .status()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                action: record.action().to_string(),
                detail: detail(record, dry_run),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!("{separator}");
    }

    println!(
        "{} complete | {} pending | {} skipped | {:.1}s",
        stats.complete_count().to_string().green(),
        stats.pending_count().to_string().yellow(),
        stats.skipped_count().to_string().red(),
        elapsed.as_secs_f64(),
    );
    if dry_run && (!stats.pending_clone.is_empty() || !stats.scheduled.is_empty()) {
        println!(
            "[dry-run] {} clone(s) and {} action(s) not executed.",
            stats.pending_clone.len(),
            stats.scheduled.len()
        );
    }
}

fn category_indicator(category: Category) -> String {
    match category {
        Category::Complete => "■".green().bold().to_string(),
        Category::Pending => "■".yellow().bold().to_string(),
        Category::Scheduled => "■".cyan().bold().to_string(),
        Category::Skipped => "■".red().bold().to_string(),
    }
}

fn detail(record: &RepoRecord, dry_run: bool) -> String {
    if let Some(error) = &record.error {
        return error.label.clone();
    }
    if record.pending_clone {
        let verb = if dry_run { "would clone" } else { "clone pending" };
        return format!("{verb} {}", record.url);
    }
    if dry_run && record.category() == Category::Scheduled {
        return format!("would run {}", record.action());
    }
    if record.cloned {
        return "cloned".to_string();
    }
    if !record.warnings.is_empty() {
        return format!("{} warning(s)", record.warnings.len());
    }
    if !record.signals.shortstat.is_empty() {
        return record.signals.shortstat.clone();
    }
    String::new()
}
