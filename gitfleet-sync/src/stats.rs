//! Run statistics and the reporting boundary.
//!
//! [`RunStats`] is recomputed from the fleet after each stage barrier. It is a
//! read model only; nothing flows back from it into the records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::Category;
use crate::error::SyncError;
use crate::fleet::Fleet;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Workspaces,
    CloneSchedule,
    Clone,
    InfoGather,
    Classify,
    Confirm,
    Act,
    Reverify,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Workspaces,
        Stage::CloneSchedule,
        Stage::Clone,
        Stage::InfoGather,
        Stage::Classify,
        Stage::Confirm,
        Stage::Act,
        Stage::Reverify,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Workspaces => "workspace sync",
            Stage::CloneSchedule => "clone scheduling",
            Stage::Clone => "clone",
            Stage::InfoGather => "info gather",
            Stage::Classify => "classify",
            Stage::Confirm => "confirm",
            Stage::Act => "action",
            Stage::Reverify => "re-verify",
        };
        f.write_str(label)
    }
}

/// One failed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    pub name: String,
    pub label: String,
    pub message: String,
}

/// Counts and name lists per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub stage: Stage,
    pub taken_at: DateTime<Utc>,
    pub total: usize,
    pub complete: Vec<String>,
    pub pending: Vec<String>,
    pub scheduled: Vec<String>,
    pub skipped: Vec<String>,
    pub pending_clone: Vec<String>,
    pub cloned: Vec<String>,
    pub errors: Vec<ErrorEntry>,
    pub warnings: usize,
}

impl RunStats {
    /// Snapshot the fleet. Must only be called between stages.
    pub fn collect(stage: Stage, fleet: &Fleet) -> Self {
        let mut stats = Self {
            stage,
            taken_at: Utc::now(),
            total: fleet.len(),
            complete: Vec::new(),
            pending: Vec::new(),
            scheduled: Vec::new(),
            skipped: Vec::new(),
            pending_clone: Vec::new(),
            cloned: Vec::new(),
            errors: Vec::new(),
            warnings: 0,
        };

        for record in fleet.records() {
            let name = record.name();
            match record.category() {
                Category::Complete => stats.complete.push(name.clone()),
                Category::Pending => stats.pending.push(name.clone()),
                Category::Scheduled => stats.scheduled.push(name.clone()),
                Category::Skipped => stats.skipped.push(name.clone()),
            }
            if record.pending_clone {
                stats.pending_clone.push(name.clone());
            }
            if record.cloned {
                stats.cloned.push(name.clone());
            }
            if let Some(error) = &record.error {
                stats.errors.push(ErrorEntry {
                    name,
                    label: error.label.clone(),
                    message: error.message.clone(),
                });
            }
            stats.warnings += record.warnings.len();
        }
        stats
    }

    pub fn complete_count(&self) -> usize {
        self.complete.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len() + self.scheduled.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// A non-zero skip count is the run's only problem signal.
    pub fn has_problems(&self) -> bool {
        !self.skipped.is_empty()
    }

    pub fn to_json(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Receives a snapshot after every stage barrier.
pub trait Reporter {
    fn stage(&mut self, stats: &RunStats);
}

/// Discards every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn stage(&mut self, _stats: &RunStats) {}
}

/// Keeps every snapshot.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    pub snapshots: Vec<RunStats>,
}

#[cfg(any(test, feature = "test-support"))]
impl CollectingReporter {
    pub fn stages(&self) -> Vec<Stage> {
        self.snapshots.iter().map(|s| s.stage).collect()
    }

    pub fn last(&self) -> Option<&RunStats> {
        self.snapshots.last()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Reporter for CollectingReporter {
    fn stage(&mut self, stats: &RunStats) {
        self.snapshots.push(stats.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use gitfleet_core::{manifest, Manifest, Scheme, Zone};

    use super::*;
    use crate::record::RecordError;

    fn fleet() -> Fleet {
        let manifest = Manifest {
            base_path: "/srv/fleet".into(),
            zones: vec![Zone {
                user: "alice".into(),
                remote: "github.com".into(),
                workspace: "personal".into(),
                scheme: Scheme::Https,
                repositories: vec!["dotfiles".into(), "notes".into()],
            }],
        };
        Fleet::from_entries(manifest::entries_at(&manifest, Path::new("/home/alice")))
    }

    #[test]
    fn fresh_fleet_is_all_pending() {
        let stats = RunStats::collect(Stage::Workspaces, &fleet());
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, vec!["personal/dotfiles", "personal/notes"]);
        assert!(!stats.has_problems());
    }

    #[test]
    fn failed_record_is_skipped_with_error() {
        let mut fleet = fleet();
        fleet.records_mut()[1].fail(RecordError::labelled("boom", "network unreachable"));
        let stats = RunStats::collect(Stage::InfoGather, &fleet);
        assert_eq!(stats.skipped, vec!["personal/notes"]);
        assert_eq!(stats.errors[0].label, "network unreachable");
        assert_eq!(stats.skipped_count(), 1);
        assert!(stats.has_problems());
    }

    #[test]
    fn json_names_the_stage() {
        let json = RunStats::collect(Stage::InfoGather, &fleet())
            .to_json()
            .expect("json");
        assert!(json.contains("\"stage\": \"info-gather\""));
    }
}
