//! Version-control adapter boundary.
//!
//! The adapter runs exactly one operation against one working copy and hands
//! back raw output. It never retries and never interprets: all semantics live
//! in [`RepoRecord`](crate::record::RepoRecord).

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// ssh invocation that fails instead of prompting.
const BATCH_SSH: &str = "ssh -o BatchMode=yes";

/// The metadata / work-tree pair an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
    pub git_dir: PathBuf,
    pub work_tree: PathBuf,
}

impl WorkingCopy {
    pub fn new(git_dir: impl Into<PathBuf>, work_tree: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
            work_tree: work_tree.into(),
        }
    }
}

/// One version-control action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VcsOp {
    Fetch,
    LocalBranch,
    LocalRef,
    UpstreamRef,
    MergeBase,
    UpstreamBranch,
    ChangedFiles,
    DiffShortstat,
    UntrackedFiles,
    PorcelainStatus,
    RemoteOriginUrl,
    Clone { url: String },
    Add,
    Commit { message: String },
    Push,
    Pull,
    Stash,
    StashPop,
}

impl VcsOp {
    /// Stable short name, used in logs and by scripted adapters.
    pub fn name(&self) -> &'static str {
        match self {
            VcsOp::Fetch => "fetch",
            VcsOp::LocalBranch => "local-branch",
            VcsOp::LocalRef => "local-ref",
            VcsOp::UpstreamRef => "upstream-ref",
            VcsOp::MergeBase => "merge-base",
            VcsOp::UpstreamBranch => "upstream-branch",
            VcsOp::ChangedFiles => "changed-files",
            VcsOp::DiffShortstat => "diff-shortstat",
            VcsOp::UntrackedFiles => "untracked-files",
            VcsOp::PorcelainStatus => "porcelain-status",
            VcsOp::RemoteOriginUrl => "remote-origin-url",
            VcsOp::Clone { .. } => "clone",
            VcsOp::Add => "add",
            VcsOp::Commit { .. } => "commit",
            VcsOp::Push => "push",
            VcsOp::Pull => "pull",
            VcsOp::Stash => "stash",
            VcsOp::StashPop => "stash-pop",
        }
    }

    /// git arguments for this operation, excluding working-copy selection.
    pub fn git_args(&self) -> Vec<String> {
        let args: &[&str] = match self {
            VcsOp::Fetch => &["fetch", "--quiet", "origin"],
            VcsOp::LocalBranch => &["rev-parse", "--abbrev-ref", "HEAD"],
            VcsOp::LocalRef => &["rev-parse", "HEAD"],
            VcsOp::UpstreamRef => &["rev-parse", "@{u}"],
            VcsOp::MergeBase => &["merge-base", "HEAD", "@{u}"],
            VcsOp::UpstreamBranch => &["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"],
            VcsOp::ChangedFiles => &["diff", "HEAD", "--name-only"],
            VcsOp::DiffShortstat => &["diff", "HEAD", "--shortstat"],
            VcsOp::UntrackedFiles => &["ls-files", "--others", "--exclude-standard"],
            VcsOp::PorcelainStatus => &["status", "--porcelain"],
            VcsOp::RemoteOriginUrl => &["config", "--get", "remote.origin.url"],
            VcsOp::Add => &["add", "--all"],
            VcsOp::Push => &["push", "--quiet"],
            VcsOp::Pull => &["pull", "--ff-only", "--quiet"],
            VcsOp::Stash => &["stash", "push", "--quiet"],
            VcsOp::StashPop => &["stash", "pop", "--quiet"],
            VcsOp::Clone { url } => {
                return vec!["clone".into(), "--quiet".into(), url.clone()];
            }
            VcsOp::Commit { message } => {
                return vec!["commit".into(), "--quiet".into(), "-m".into(), message.clone()];
            }
        };
        args.iter().map(|a| (*a).to_string()).collect()
    }
}

impl fmt::Display for VcsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw result of one adapter call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcsOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl VcsOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
        }
    }

    /// Text describing a failure: stderr, else stdout, else a generic note.
    pub fn failure_text(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        "command exited with a non-zero status".to_string()
    }
}

/// Executes single version-control operations.
///
/// Calls are synchronous; the fleet runs them on blocking worker threads.
pub trait Vcs: Send + Sync {
    fn run(&self, working_copy: &WorkingCopy, op: &VcsOp) -> VcsOutput;
}

/// [`Vcs`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, working_copy: &WorkingCopy, op: &VcsOp) -> Command {
        let mut cmd = Command::new(&self.program);
        // Stable English messages for the label table; never block on a credential prompt.
        cmd.env("LC_ALL", "C").env("GIT_TERMINAL_PROMPT", "0");
        // ssh reads host-key and passphrase answers from the tty, not stdin.
        if std::env::var_os("GIT_SSH_COMMAND").is_none() {
            cmd.env("GIT_SSH_COMMAND", BATCH_SSH);
        }
        match op {
            VcsOp::Clone { .. } => {
                cmd.args(op.git_args()).arg(absolute(&working_copy.work_tree));
                if let Some(parent) = working_copy.work_tree.parent() {
                    if parent.is_dir() {
                        cmd.current_dir(parent);
                    }
                }
            }
            _ => {
                let work_tree = absolute(&working_copy.work_tree);
                cmd.current_dir(&work_tree)
                    .arg("--git-dir")
                    .arg(absolute(&working_copy.git_dir))
                    .arg("--work-tree")
                    .arg(&work_tree)
                    .args(op.git_args());
            }
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Vcs for GitCli {
    fn run(&self, working_copy: &WorkingCopy, op: &VcsOp) -> VcsOutput {
        match self.command(working_copy, op).output() {
            Ok(output) => VcsOutput {
                stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
                success: output.status.success(),
            },
            Err(err) => VcsOutput::failed(format!(
                "failed to run {}: {err}",
                self.program.display()
            )),
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
