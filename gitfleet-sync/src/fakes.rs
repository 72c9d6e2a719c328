//! In-memory [`Vcs`] fake, built with the `test-support` feature.
//!
//! [`ScriptedVcs`] simulates just enough of git for pipeline tests: each
//! registered work tree has a [`FakeRepo`] whose refs and file lists move
//! when write operations run. Individual operations can be forced to fail
//! or panic per work tree.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::classify::UpstreamPosition;
use crate::vcs::{Vcs, VcsOp, VcsOutput, WorkingCopy};

/// Simulated repository state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeRepo {
    pub origin: String,
    pub branch: String,
    pub local: String,
    pub upstream: Option<String>,
    pub merge_base: String,
    pub changed: Vec<String>,
    pub untracked: Vec<String>,
    stash: Option<(Vec<String>, Vec<String>)>,
    commits: u32,
}

impl FakeRepo {
    /// Clean checkout of `main`, level with its upstream at `head`.
    pub fn up_to_date(origin: &str, head: &str) -> Self {
        Self {
            origin: origin.to_string(),
            branch: "main".to_string(),
            local: head.to_string(),
            upstream: Some(head.to_string()),
            merge_base: head.to_string(),
            changed: Vec::new(),
            untracked: Vec::new(),
            stash: None,
            commits: 0,
        }
    }

    pub fn with_refs(mut self, local: &str, upstream: &str, merge_base: &str) -> Self {
        self.local = local.to_string();
        self.upstream = Some(upstream.to_string());
        self.merge_base = merge_base.to_string();
        self
    }

    pub fn with_changed(mut self, files: &[&str]) -> Self {
        self.changed = files.iter().map(|f| (*f).to_string()).collect();
        self
    }

    pub fn with_untracked(mut self, files: &[&str]) -> Self {
        self.untracked = files.iter().map(|f| (*f).to_string()).collect();
        self
    }

    pub fn without_upstream(mut self) -> Self {
        self.upstream = None;
        self
    }

    fn position(&self) -> UpstreamPosition {
        let upstream = self.upstream.as_deref().unwrap_or_default();
        crate::classify::upstream_position(&self.local, upstream, &self.merge_base)
    }

    fn apply(&mut self, op: &VcsOp) -> VcsOutput {
        match op {
            VcsOp::RemoteOriginUrl => VcsOutput::ok(self.origin.clone()),
            VcsOp::Fetch | VcsOp::Add => VcsOutput::ok(""),
            VcsOp::LocalBranch => VcsOutput::ok(self.branch.clone()),
            VcsOp::LocalRef => VcsOutput::ok(self.local.clone()),
            VcsOp::UpstreamRef | VcsOp::MergeBase | VcsOp::UpstreamBranch
                if self.upstream.is_none() =>
            {
                VcsOutput::failed(format!(
                    "fatal: no upstream configured for branch '{}'",
                    self.branch
                ))
            }
            VcsOp::UpstreamRef => VcsOutput::ok(self.upstream.clone().unwrap_or_default()),
            VcsOp::MergeBase => VcsOutput::ok(self.merge_base.clone()),
            VcsOp::UpstreamBranch => VcsOutput::ok(format!("origin/{}", self.branch)),
            VcsOp::ChangedFiles => VcsOutput::ok(self.changed.join("\n")),
            VcsOp::DiffShortstat if self.changed.is_empty() => VcsOutput::ok(""),
            VcsOp::DiffShortstat => {
                VcsOutput::ok(format!(" {} files changed", self.changed.len()))
            }
            VcsOp::UntrackedFiles => VcsOutput::ok(self.untracked.join("\n")),
            VcsOp::PorcelainStatus => {
                let lines: Vec<String> = self
                    .changed
                    .iter()
                    .map(|f| format!(" M {f}"))
                    .chain(self.untracked.iter().map(|f| format!("?? {f}")))
                    .collect();
                VcsOutput::ok(lines.join("\n"))
            }
            VcsOp::Clone { .. } => VcsOutput::ok(""),
            VcsOp::Commit { .. } => {
                if self.changed.is_empty() && self.untracked.is_empty() {
                    return VcsOutput {
                        stdout: "nothing to commit, working tree clean".to_string(),
                        stderr: String::new(),
                        success: false,
                    };
                }
                self.commits += 1;
                self.local = format!("{}-c{}", self.local, self.commits);
                self.changed.clear();
                self.untracked.clear();
                VcsOutput::ok("")
            }
            VcsOp::Push => match self.position() {
                UpstreamPosition::Ahead | UpstreamPosition::UpToDate => {
                    self.upstream = Some(self.local.clone());
                    self.merge_base = self.local.clone();
                    VcsOutput::ok("")
                }
                _ => VcsOutput::failed(format!(
                    " ! [rejected]        {0} -> {0} (fetch first)",
                    self.branch
                )),
            },
            VcsOp::Pull => match self.position() {
                UpstreamPosition::Behind | UpstreamPosition::UpToDate => {
                    let upstream = self.upstream.clone().unwrap_or_default();
                    self.local = upstream.clone();
                    self.merge_base = upstream;
                    VcsOutput::ok("")
                }
                _ => VcsOutput::failed("fatal: Not possible to fast-forward, aborting."),
            },
            VcsOp::Stash => {
                let saved = (
                    std::mem::take(&mut self.changed),
                    std::mem::take(&mut self.untracked),
                );
                self.stash = Some(saved);
                VcsOutput::ok("")
            }
            VcsOp::StashPop => match self.stash.take() {
                Some((changed, untracked)) => {
                    self.changed = changed;
                    self.untracked = untracked;
                    VcsOutput::ok("")
                }
                None => VcsOutput::failed("error: No stash entries found."),
            },
        }
    }
}

/// Scripted [`Vcs`] keyed by work tree.
#[derive(Debug, Default)]
pub struct ScriptedVcs {
    repos: Mutex<HashMap<PathBuf, FakeRepo>>,
    failures: Mutex<HashMap<(PathBuf, &'static str), String>>,
    panics: Mutex<HashSet<(PathBuf, &'static str)>>,
    calls: Mutex<Vec<(PathBuf, String)>>,
    messages: Mutex<Vec<(PathBuf, String)>>,
}

impl ScriptedVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the simulated state of a work tree.
    pub fn add_repo(&self, work_tree: impl Into<PathBuf>, repo: FakeRepo) {
        lock(&self.repos).insert(work_tree.into(), repo);
    }

    /// Current simulated state of a work tree.
    pub fn repo(&self, work_tree: &Path) -> Option<FakeRepo> {
        lock(&self.repos).get(work_tree).cloned()
    }

    /// Make `op` (by [`VcsOp::name`]) fail with `stderr` for this work tree.
    pub fn fail_on(&self, work_tree: impl Into<PathBuf>, op: &'static str, stderr: &str) {
        lock(&self.failures).insert((work_tree.into(), op), stderr.to_string());
    }

    /// Make `op` panic for this work tree.
    pub fn panic_on(&self, work_tree: impl Into<PathBuf>, op: &'static str) {
        lock(&self.panics).insert((work_tree.into(), op));
    }

    /// Every call made so far, as `(work tree, op name)`.
    pub fn calls(&self) -> Vec<(PathBuf, String)> {
        lock(&self.calls).clone()
    }

    /// Calls made against one work tree.
    pub fn calls_for(&self, work_tree: &Path) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(path, _)| path == work_tree)
            .map(|(_, op)| op)
            .collect()
    }

    /// Commit messages passed to one work tree, in order.
    pub fn commit_messages(&self, work_tree: &Path) -> Vec<String> {
        lock(&self.messages)
            .iter()
            .filter(|(path, _)| path == work_tree)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

/// A panicking scripted op never leaves shared state half-written.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Vcs for ScriptedVcs {
    fn run(&self, working_copy: &WorkingCopy, op: &VcsOp) -> VcsOutput {
        let key = working_copy.work_tree.clone();
        lock(&self.calls).push((key.clone(), op.name().to_string()));
        if let VcsOp::Commit { message } = op {
            lock(&self.messages).push((key.clone(), message.clone()));
        }

        if lock(&self.panics).contains(&(key.clone(), op.name())) {
            panic!("scripted panic in {} for {}", op.name(), key.display());
        }
        if let Some(stderr) = lock(&self.failures).get(&(key.clone(), op.name())) {
            return VcsOutput::failed(stderr.clone());
        }

        let mut repos = lock(&self.repos);
        let Some(repo) = repos.get_mut(&key) else {
            return VcsOutput::failed(
                "fatal: not a git repository (or any of the parent directories): .git",
            );
        };
        let output = repo.apply(op);
        if matches!(op, VcsOp::Clone { .. }) && output.success {
            if let Err(err) = std::fs::create_dir_all(&working_copy.git_dir) {
                return VcsOutput::failed(format!(
                    "fatal: could not create '{}': {err}",
                    working_copy.git_dir.display()
                ));
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wc() -> WorkingCopy {
        WorkingCopy::new("/f/ws/r/.git", "/f/ws/r")
    }

    #[test]
    fn pull_fast_forwards_behind_repo() {
        let vcs = ScriptedVcs::new();
        vcs.add_repo("/f/ws/r", FakeRepo::up_to_date("u", "a").with_refs("a", "b", "a"));
        assert!(vcs.run(&wc(), &VcsOp::Pull).success);
        let repo = vcs.repo(Path::new("/f/ws/r")).expect("repo");
        assert_eq!(repo.local, "b");
        assert_eq!(repo.merge_base, "b");
    }

    #[test]
    fn push_rejected_when_behind() {
        let vcs = ScriptedVcs::new();
        vcs.add_repo("/f/ws/r", FakeRepo::up_to_date("u", "a").with_refs("a", "b", "a"));
        let out = vcs.run(&wc(), &VcsOp::Push);
        assert!(!out.success);
        assert!(out.stderr.contains("[rejected]"));
    }

    #[test]
    fn unknown_work_tree_is_not_a_repository() {
        let vcs = ScriptedVcs::new();
        let out = vcs.run(&wc(), &VcsOp::Fetch);
        assert!(!out.success);
        assert_eq!(vcs.calls_for(Path::new("/f/ws/r")), vec!["fetch"]);
    }

    #[test]
    fn stash_round_trip_restores_files() {
        let vcs = ScriptedVcs::new();
        vcs.add_repo("/f/ws/r", FakeRepo::up_to_date("u", "a").with_changed(&["x"]));
        assert!(vcs.run(&wc(), &VcsOp::Stash).success);
        assert!(vcs.repo(Path::new("/f/ws/r")).expect("repo").changed.is_empty());
        assert!(vcs.run(&wc(), &VcsOp::StashPop).success);
        assert_eq!(vcs.repo(Path::new("/f/ws/r")).expect("repo").changed, vec!["x"]);
    }
}
