//! The per-repository record and every operation that mutates it.
//!
//! ## Verified gate
//!
//! `verified` starts `true` and only ever goes to `false`. The fleet
//! dispatches a stage's operation to a record only while it is still
//! verified, so once a record fails no later adapter call can touch its
//! observed signals.
//!
//! ## Failure handling
//!
//! Adapter output is assessed in [`RepoRecord::call`]:
//! - success → stdout is returned; any stderr is kept as a warning
//! - failure that is a redirect notice to our own URL → warning, continue
//! - anything else → [`RepoRecord::fail`], sequence stops

use gitfleet_core::{FleetEntry, RepoIdentity, RepoPaths, Scheme};

use crate::classify::{self, Action, Category, Classification, Status, UpstreamPosition};
use crate::confirm;
use crate::labels;
use crate::vcs::{Vcs, VcsOp, VcsOutput, WorkingCopy};

/// Raw error text plus its short label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    pub message: String,
    pub label: String,
}

impl RecordError {
    /// Label the message through the rule table.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let label = labels::classify_error(&message).to_string();
        Self { message, label }
    }

    pub fn labelled(message: impl Into<String>, label: &str) -> Self {
        Self {
            message: message.into(),
            label: label.to_string(),
        }
    }
}

/// Everything read back from the adapter during info-gather.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signals {
    pub origin_url: String,
    pub local_branch: String,
    pub local_ref: String,
    pub upstream_ref: String,
    pub merge_base: String,
    pub upstream_branch: String,
    pub changed_files: Vec<String>,
    pub shortstat: String,
    pub untracked: Vec<String>,
    pub porcelain: String,
    pub clean: bool,
}

impl Signals {
    pub fn position(&self) -> UpstreamPosition {
        classify::upstream_position(&self.local_ref, &self.upstream_ref, &self.merge_base)
    }
}

/// One tracked repository.
#[derive(Debug, Clone)]
pub struct RepoRecord {
    pub identity: RepoIdentity,
    pub scheme: Scheme,
    pub url: String,
    pub paths: RepoPaths,

    pub verified: bool,
    pub pending_clone: bool,
    pub cloned: bool,
    pub signals: Signals,

    pub classification: Option<Classification>,
    pub error: Option<RecordError>,
    pub warnings: Vec<String>,

    pub confirmed: Option<bool>,
    pub commit_message: Option<String>,
    pub acted: bool,
}

impl RepoRecord {
    pub fn new(entry: FleetEntry) -> Self {
        Self {
            identity: entry.identity,
            scheme: entry.scheme,
            url: entry.url,
            paths: entry.paths,
            verified: true,
            pending_clone: false,
            cloned: false,
            signals: Signals::default(),
            classification: None,
            error: None,
            warnings: Vec::new(),
            confirmed: None,
            commit_message: None,
            acted: false,
        }
    }

    /// `workspace/name`, the display name used in reports and prompts.
    pub fn name(&self) -> String {
        self.identity.to_string()
    }

    pub fn working_copy(&self) -> WorkingCopy {
        WorkingCopy::new(&self.paths.git_dir, &self.paths.repo)
    }

    /// Category for reporting. Unclassified records are pending while
    /// verified, skipped otherwise.
    pub fn category(&self) -> Category {
        match self.classification {
            Some(c) => c.category,
            None if self.verified => Category::Pending,
            None => Category::Skipped,
        }
    }

    pub fn status(&self) -> Option<Status> {
        self.classification.map(|c| c.status)
    }

    pub fn action(&self) -> Action {
        self.classification.map(|c| c.action).unwrap_or(Action::None)
    }

    // -----------------------------------------------------------------------
    // Error path
    // -----------------------------------------------------------------------

    /// Flip to unverified with `error`. The only way `verified` changes.
    pub fn fail(&mut self, error: RecordError) {
        tracing::warn!(
            repo = %self.identity,
            label = %error.label,
            "repository skipped: {}",
            error.message
        );
        self.verified = false;
        self.classification = Some(Classification::ERROR);
        self.error = Some(error);
    }

    /// Run one adapter call and assess its output.
    ///
    /// Returns `None` when the call failed fatally; the record is then
    /// unverified and the caller must stop its sequence.
    pub fn call(&mut self, vcs: &dyn Vcs, op: VcsOp) -> Option<String> {
        let output = vcs.run(&self.working_copy(), &op);
        self.assess(&op, output)
    }

    // -----------------------------------------------------------------------
    // Stage operations
    // -----------------------------------------------------------------------

    /// Mark the record for cloning when its metadata directory is absent.
    pub fn schedule_clone(&mut self) {
        self.pending_clone = !self.paths.git_dir.exists();
    }

    /// Clone into the repository path.
    pub fn clone_repo(&mut self, vcs: &dyn Vcs) {
        let op = VcsOp::Clone {
            url: self.url.clone(),
        };
        if self.call(vcs, op).is_some() {
            self.pending_clone = false;
            self.cloned = true;
        }
    }

    /// Run the full ordered read sequence, stopping at the first fatal failure.
    ///
    /// Values read before a failure are kept.
    pub fn gather_info(&mut self, vcs: &dyn Vcs) {
        self.signals = Signals::default();

        let Some(origin) = self.call_with(vcs, VcsOp::RemoteOriginUrl, "remote origin is not set")
        else {
            return;
        };
        let origin = origin.trim().to_string();
        self.signals.origin_url = origin.clone();
        if origin != self.url {
            self.fail(RecordError::new(format!(
                "URL mismatch: expected {}, found {origin}",
                self.url
            )));
            return;
        }

        if self.call(vcs, VcsOp::Fetch).is_none() {
            return;
        }
        let Some(branch) = self.call(vcs, VcsOp::LocalBranch) else {
            return;
        };
        self.signals.local_branch = branch.trim().to_string();
        let Some(local) = self.call(vcs, VcsOp::LocalRef) else {
            return;
        };
        self.signals.local_ref = local.trim().to_string();
        let Some(upstream) = self.call(vcs, VcsOp::UpstreamRef) else {
            return;
        };
        self.signals.upstream_ref = upstream.trim().to_string();
        let Some(base) = self.call(vcs, VcsOp::MergeBase) else {
            return;
        };
        self.signals.merge_base = base.trim().to_string();
        let Some(upstream_branch) = self.call(vcs, VcsOp::UpstreamBranch) else {
            return;
        };
        self.signals.upstream_branch = upstream_branch.trim().to_string();
        let Some(changed) = self.call(vcs, VcsOp::ChangedFiles) else {
            return;
        };
        self.signals.changed_files = lines(&changed);
        let Some(shortstat) = self.call(vcs, VcsOp::DiffShortstat) else {
            return;
        };
        self.signals.shortstat = shortstat.trim().to_string();
        let Some(untracked) = self.call(vcs, VcsOp::UntrackedFiles) else {
            return;
        };
        self.signals.untracked = lines(&untracked);
        let Some(porcelain) = self.call(vcs, VcsOp::PorcelainStatus) else {
            return;
        };
        self.signals.porcelain = porcelain.trim_end().to_string();
        self.signals.clean =
            self.signals.changed_files.is_empty() && self.signals.untracked.is_empty();
    }

    /// Apply the classifier. No-op on an unverified record.
    pub fn classify(&mut self) {
        if !self.verified {
            return;
        }
        let position = self.signals.position();
        let classification = classify::classify(
            self.signals.clean,
            !self.signals.untracked.is_empty(),
            position,
        );
        if classification.category == Category::Skipped {
            self.fail(RecordError::new(format!(
                "unable to determine upstream position \
                 (local {}, upstream {}, merge-base {}, clean {}, untracked {})",
                short_ref(&self.signals.local_ref),
                short_ref(&self.signals.upstream_ref),
                short_ref(&self.signals.merge_base),
                self.signals.clean,
                self.signals.untracked.len(),
            )));
            return;
        }
        self.classification = Some(classification);
    }

    /// Record the operator's decision for a pending record.
    pub fn apply_confirmation(&mut self, proceed: bool, message: Option<String>) {
        let Some(mut classification) = self.classification else {
            return;
        };
        self.confirmed = Some(proceed);
        if proceed {
            classification.category = Category::Scheduled;
            self.commit_message = message.filter(|_| classification.action.commits());
        } else {
            classification.category = Category::Skipped;
        }
        self.classification = Some(classification);
    }

    /// Execute the recommended action; any failure aborts the remaining steps.
    pub fn act(&mut self, vcs: &dyn Vcs) {
        let action = self.action();
        let message = self
            .commit_message
            .clone()
            .unwrap_or_else(|| confirm::default_message(&self.name()));
        for op in action.steps(&message) {
            if self.call(vcs, op).is_none() {
                return;
            }
        }
        self.acted = true;
    }

    /// Re-gather and re-classify after an action.
    ///
    /// A record still verified but not `Complete` gets an explanatory error.
    pub fn reverify(&mut self, vcs: &dyn Vcs) {
        let before = self.action();
        self.gather_info(vcs);
        if !self.verified {
            return;
        }
        self.classify();
        if !self.verified {
            return;
        }
        if self.category() != Category::Complete {
            let status = self
                .status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unclassified".to_string());
            self.error = Some(RecordError::labelled(
                format!("still {status} after {before}"),
                labels::UNRESOLVED,
            ));
        }
    }

    /// Like [`call`](Self::call), but a silent failure is reported as `on_silent`.
    fn call_with(&mut self, vcs: &dyn Vcs, op: VcsOp, on_silent: &str) -> Option<String> {
        let mut output = vcs.run(&self.working_copy(), &op);
        if !output.success && output.stderr.trim().is_empty() && output.stdout.trim().is_empty() {
            output.stderr = on_silent.to_string();
        }
        self.assess(&op, output)
    }

    fn assess(&mut self, op: &VcsOp, output: VcsOutput) -> Option<String> {
        tracing::debug!(
            repo = %self.identity,
            op = op.name(),
            success = output.success,
            "adapter call"
        );
        if output.success {
            let stderr = output.stderr.trim();
            if !stderr.is_empty() {
                self.warnings.push(stderr.to_string());
            }
            return Some(output.stdout);
        }
        let text = output.failure_text();
        if labels::is_redirect_warning(&text, &self.url) {
            self.warnings.push(text);
            return Some(output.stdout);
        }
        self.fail(RecordError::new(text));
        None
    }
}

fn lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn short_ref(reference: &str) -> &str {
    if reference.is_empty() {
        return "-";
    }
    reference.get(..8).unwrap_or(reference)
}
