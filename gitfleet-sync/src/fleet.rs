//! The fleet collection: ordered, deduplicated records and the concurrent
//! per-record fan-out every stage uses.
//!
//! ## Fan-out protocol
//!
//! 1. Select records (always a subset of the verified ones).
//! 2. Clone each selected record into its own blocking task; the task owns
//!    its copy exclusively, so no locking is needed.
//! 3. Admit at most `jobs` tasks at a time through a semaphore.
//! 4. Join every task before returning (stage barrier).
//! 5. Write each task's record back. A panicked task leaves the pre-task
//!    copy in place and marks it failed; siblings are unaffected.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use gitfleet_core::{manifest, FleetEntry, Manifest, RepoIdentity};

use crate::error::SyncError;
use crate::labels;
use crate::record::{RecordError, RepoRecord};
use crate::workspace::{self, WorkspaceFault};

/// Ordered group of repository records.
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    records: Vec<RepoRecord>,
}

impl Fleet {
    /// Build from flattened manifest entries.
    ///
    /// Keeps one record per identity (first occurrence wins), ordered by
    /// workspace path then name. Distinct identities that resolve to the same
    /// checkout path are marked unverified after the first.
    pub fn from_entries(entries: Vec<FleetEntry>) -> Self {
        let mut seen = HashSet::<RepoIdentity>::new();
        let mut records: Vec<RepoRecord> = entries
            .into_iter()
            .filter(|entry| seen.insert(entry.identity.clone()))
            .map(RepoRecord::new)
            .collect();
        records.sort_by(|a, b| {
            a.paths
                .workspace
                .cmp(&b.paths.workspace)
                .then_with(|| a.identity.name.cmp(&b.identity.name))
                .then_with(|| a.identity.cmp(&b.identity))
        });

        let mut claimed = HashMap::<PathBuf, String>::new();
        for record in &mut records {
            match claimed.get(&record.paths.repo) {
                Some(owner) => {
                    let message = format!(
                        "{} is already managed for {owner}",
                        record.paths.repo.display()
                    );
                    record.fail(RecordError::labelled(message, labels::PATH_CONFLICT));
                }
                None => {
                    claimed.insert(
                        record.paths.repo.clone(),
                        format!("{}@{}", record.identity.user, record.identity.remote),
                    );
                }
            }
        }

        Self { records }
    }

    /// Build from a loaded manifest, expanding `~` against `home`.
    pub fn from_manifest_at(manifest: &Manifest, home: &Path) -> Self {
        Self::from_entries(manifest::entries_at(manifest, home))
    }

    /// `from_manifest_at` convenience wrapper.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, SyncError> {
        Ok(Self::from_entries(manifest::entries(manifest)?))
    }

    pub fn records(&self) -> &[RepoRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [RepoRecord] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look a record up by its `workspace/name` display name.
    pub fn get(&self, name: &str) -> Option<&RepoRecord> {
        self.records.iter().find(|r| r.name() == name)
    }

    /// Apply `op` sequentially to every selected, still-verified record.
    pub fn for_each_verified(
        &mut self,
        select: impl Fn(&RepoRecord) -> bool,
        mut op: impl FnMut(&mut RepoRecord),
    ) {
        for record in self.records.iter_mut() {
            if record.verified && select(record) {
                op(record);
            }
        }
    }

    /// Run `op` concurrently on every selected, still-verified record and
    /// wait for all of them. Returns how many records were dispatched.
    pub async fn run_concurrent<F>(
        &mut self,
        jobs: usize,
        select: impl Fn(&RepoRecord) -> bool,
        op: F,
    ) -> usize
    where
        F: Fn(&mut RepoRecord) + Send + Sync + 'static,
    {
        let op = Arc::new(op);
        let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
        let mut tasks = JoinSet::new();

        for (index, record) in self.records.iter().enumerate() {
            if !record.verified || !select(record) {
                continue;
            }
            let mut owned = record.clone();
            let op = Arc::clone(&op);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = tokio::task::spawn_blocking(move || {
                    op(&mut owned);
                    owned
                })
                .await;
                (index, outcome)
            });
        }

        let mut dispatched = 0;
        while let Some(joined) = tasks.join_next().await {
            dispatched += 1;
            match joined {
                Ok((index, Ok(record))) => self.records[index] = record,
                Ok((index, Err(err))) => {
                    let record = &mut self.records[index];
                    let reason = if err.is_panic() { "panicked" } else { "was cancelled" };
                    record.fail(RecordError::labelled(
                        format!("task panicked: worker for {} {reason}", record.identity),
                        labels::TASK_PANICKED,
                    ));
                }
                Err(err) => {
                    tracing::error!(error = %err, "fleet dispatcher task failed");
                }
            }
        }
        dispatched
    }

    /// Create and inspect every distinct workspace directory, then mark each
    /// record according to its workspace.
    pub async fn sync_workspaces(&mut self, jobs: usize) {
        let paths: BTreeSet<PathBuf> = self
            .records
            .iter()
            .filter(|r| r.verified)
            .map(|r| r.paths.workspace.clone())
            .collect();

        let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
        let mut tasks = JoinSet::new();
        for path in paths {
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let target = path.clone();
                let result = tokio::task::spawn_blocking(move || workspace::ensure_workspace(&target))
                    .await
                    .unwrap_or_else(|err| {
                        Err(WorkspaceFault::Missing {
                            path: path.clone(),
                            reason: format!("inspection task failed: {err}"),
                        })
                    });
                (path, result)
            });
        }

        let mut outcomes = BTreeMap::<PathBuf, Result<(), WorkspaceFault>>::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((path, result)) => {
                    outcomes.insert(path, result);
                }
                Err(err) => tracing::error!(error = %err, "workspace task failed"),
            }
        }

        for record in self.records.iter_mut().filter(|r| r.verified) {
            match outcomes.get(&record.paths.workspace) {
                Some(Ok(())) => {}
                Some(Err(fault)) => {
                    record.fail(RecordError::labelled(fault.to_string(), fault.label()));
                }
                None => record.fail(RecordError::labelled(
                    format!(
                        "workspace {} was not inspected",
                        record.paths.workspace.display()
                    ),
                    labels::WORKSPACE_MISSING,
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use gitfleet_core::{Scheme, Zone};

    use super::*;

    fn zone(user: &str, workspace: &str, repos: &[&str]) -> Zone {
        Zone {
            user: user.into(),
            remote: "github.com".into(),
            workspace: workspace.into(),
            scheme: Scheme::Https,
            repositories: repos.iter().map(|r| (*r).into()).collect(),
        }
    }

    fn fleet(zones: Vec<Zone>) -> Fleet {
        let manifest = Manifest {
            base_path: "/srv/fleet".into(),
            zones,
        };
        Fleet::from_manifest_at(&manifest, Path::new("/home/alice"))
    }

    fn names(fleet: &Fleet) -> Vec<String> {
        fleet.records().iter().map(RepoRecord::name).collect()
    }

    #[test]
    fn duplicates_collapse_and_order_is_workspace_then_name() {
        let fleet = fleet(vec![
            zone("alice", "work", &["zeta", "api"]),
            zone("alice", "personal", &["notes", "dotfiles"]),
            zone("alice", "work", &["api"]),
        ]);
        assert_eq!(
            names(&fleet),
            vec!["personal/dotfiles", "personal/notes", "work/api", "work/zeta"]
        );
        assert!(fleet.records().iter().all(|r| r.verified));
    }

    #[test]
    fn same_checkout_path_for_two_users_conflicts() {
        let fleet = fleet(vec![
            zone("alice", "shared", &["tools"]),
            zone("bob", "shared", &["tools"]),
        ]);
        assert_eq!(fleet.len(), 2);
        let verified: Vec<_> = fleet.records().iter().map(|r| r.verified).collect();
        assert_eq!(verified, vec![true, false]);
        let error = fleet.records()[1].error.clone().expect("error");
        assert_eq!(error.label, labels::PATH_CONFLICT);
        assert!(error.message.contains("alice@github.com"));
    }

    #[tokio::test]
    async fn panicking_task_only_fails_its_own_record() {
        let mut fleet = fleet(vec![zone("alice", "ws", &["a", "b", "c"])]);
        let dispatched = fleet
            .run_concurrent(2, |_| true, |record| {
                if record.identity.name.as_str() == "b" {
                    panic!("boom");
                }
                record.warnings.push("touched".to_string());
            })
            .await;
        assert_eq!(dispatched, 3);

        let a = fleet.get("ws/a").expect("a");
        let b = fleet.get("ws/b").expect("b");
        let c = fleet.get("ws/c").expect("c");
        assert!(a.verified && c.verified);
        assert_eq!(a.warnings, vec!["touched"]);
        assert!(!b.verified);
        assert!(b.warnings.is_empty());
        assert_eq!(b.error.clone().expect("error").label, labels::TASK_PANICKED);
    }

    #[tokio::test]
    async fn unverified_records_are_never_dispatched() {
        let mut fleet = fleet(vec![zone("alice", "ws", &["a", "b"])]);
        fleet.records_mut()[0].fail(RecordError::labelled("x", labels::PATH_BLOCKED));
        let dispatched = fleet
            .run_concurrent(4, |_| true, |record| record.cloned = true)
            .await;
        assert_eq!(dispatched, 1);
        assert!(!fleet.records()[0].cloned);
        assert!(fleet.records()[1].cloned);
    }

    #[tokio::test]
    async fn blocked_workspace_fails_only_its_records() {
        let base = tempfile::TempDir::new().expect("tempdir");
        std::fs::write(base.path().join("blocked"), "file").expect("write");
        let manifest = Manifest {
            base_path: base.path().to_path_buf(),
            zones: vec![
                zone("alice", "blocked", &["a", "b"]),
                zone("alice", "open", &["c"]),
            ],
        };
        let mut fleet = Fleet::from_manifest_at(&manifest, base.path());
        fleet.sync_workspaces(4).await;

        for name in ["blocked/a", "blocked/b"] {
            let record = fleet.get(name).expect("record");
            assert!(!record.verified);
            assert_eq!(record.error.clone().expect("error").label, "path blocked");
        }
        let open = fleet.get("open/c").expect("record");
        assert!(open.verified);
        assert!(open.error.is_none());
        assert!(base.path().join("open").is_dir());
    }
}
