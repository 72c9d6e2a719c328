//! The verification and action pipeline.
//!
//! Stages run strictly in order, each ending in a full barrier:
//!
//! | # | stage            | execution                  |
//! |---|------------------|----------------------------|
//! | 1 | workspace sync   | concurrent per workspace   |
//! | 2 | clone scheduling | sequential, filesystem only|
//! | 3 | clone            | concurrent per record      |
//! | 4 | info gather      | concurrent per record      |
//! | 5 | classify         | sequential, pure           |
//! | 6 | confirm          | sequential, operator I/O   |
//! | 7 | action           | concurrent per record      |
//! | 8 | re-verify        | concurrent per record      |
//!
//! Every stage only dispatches to verified records. A snapshot of
//! [`RunStats`] goes to the [`Reporter`] after each barrier.

use std::future::Future;
use std::sync::Arc;

use crate::classify::{Category, Status};
use crate::confirm::{default_message, ConfirmRequest, Confirmer};
use crate::error::SyncError;
use crate::fleet::Fleet;
use crate::stats::{Reporter, RunStats, Stage};
use crate::vcs::Vcs;

/// Default number of concurrent tasks per stage.
pub const DEFAULT_JOBS: usize = 8;

/// Run-wide knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Upper bound on concurrent tasks in one stage.
    pub jobs: usize,
    /// Report clones and actions without executing them.
    pub dry_run: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            jobs: DEFAULT_JOBS,
            dry_run: false,
        }
    }
}

/// Drives a [`Fleet`] through the stages against one adapter.
#[derive(Clone)]
pub struct Pipeline {
    vcs: Arc<dyn Vcs>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(vcs: Arc<dyn Vcs>, options: PipelineOptions) -> Result<Self, SyncError> {
        if options.jobs == 0 {
            return Err(SyncError::InvalidOptions(
                "jobs must be at least 1".to_string(),
            ));
        }
        Ok(Self { vcs, options })
    }

    // -----------------------------------------------------------------------
    // Runs
    // -----------------------------------------------------------------------

    /// Stages 1 to 5: find out where every repository stands.
    pub async fn verify(&self, fleet: &mut Fleet, reporter: &mut dyn Reporter) -> RunStats {
        self.sync_workspaces(fleet).await;
        report(Stage::Workspaces, fleet, reporter);

        self.schedule_clones(fleet);
        report(Stage::CloneSchedule, fleet, reporter);

        self.clone_pending(fleet).await;
        report(Stage::Clone, fleet, reporter);

        self.gather_info(fleet).await;
        report(Stage::InfoGather, fleet, reporter);

        self.classify(fleet);
        report(Stage::Classify, fleet, reporter)
    }

    /// All eight stages.
    pub async fn run(
        &self,
        fleet: &mut Fleet,
        confirmer: &mut dyn Confirmer,
        reporter: &mut dyn Reporter,
    ) -> RunStats {
        self.verify(fleet, reporter).await;

        self.confirm(fleet, confirmer);
        report(Stage::Confirm, fleet, reporter);

        self.act(fleet).await;
        report(Stage::Act, fleet, reporter);

        self.reverify(fleet).await;
        report(Stage::Reverify, fleet, reporter)
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    /// Stage 1.
    pub async fn sync_workspaces(&self, fleet: &mut Fleet) {
        fleet.sync_workspaces(self.options.jobs).await;
    }

    /// Stage 2.
    pub fn schedule_clones(&self, fleet: &mut Fleet) {
        fleet.for_each_verified(|_| true, |record| record.schedule_clone());
    }

    /// Stage 3. Skipped under dry run; scheduled clones stay pending.
    pub async fn clone_pending(&self, fleet: &mut Fleet) {
        if self.options.dry_run {
            return;
        }
        let vcs = Arc::clone(&self.vcs);
        fleet
            .run_concurrent(
                self.options.jobs,
                |record| record.pending_clone,
                move |record| record.clone_repo(vcs.as_ref()),
            )
            .await;
    }

    /// Stage 4. Records still waiting for a clone have nothing to inspect.
    pub async fn gather_info(&self, fleet: &mut Fleet) {
        let vcs = Arc::clone(&self.vcs);
        fleet
            .run_concurrent(
                self.options.jobs,
                |record| !record.pending_clone,
                move |record| record.gather_info(vcs.as_ref()),
            )
            .await;
    }

    /// Stage 5.
    pub fn classify(&self, fleet: &mut Fleet) {
        fleet.for_each_verified(|record| !record.pending_clone, |record| record.classify());
    }

    /// Stage 6. Offers each pending record to `confirmer` in fleet order.
    pub fn confirm(&self, fleet: &mut Fleet, confirmer: &mut dyn Confirmer) {
        fleet.for_each_verified(
            |record| record.classification.is_some() && record.category() == Category::Pending,
            |record| {
                let request = ConfirmRequest {
                    name: record.name(),
                    status: record.status().unwrap_or(Status::Error),
                    action: record.action(),
                    summary: record.signals.porcelain.clone(),
                };
                let response = confirmer.confirm(&request);
                let message = if response.message.trim().is_empty() {
                    default_message(&request.name)
                } else {
                    response.message
                };
                tracing::debug!(repo = %request.name, proceed = response.proceed, "confirmation");
                record.apply_confirmation(response.proceed, Some(message));
            },
        );
    }

    /// Stage 7. Skipped under dry run; scheduled records stay scheduled.
    pub async fn act(&self, fleet: &mut Fleet) {
        if self.options.dry_run {
            return;
        }
        let vcs = Arc::clone(&self.vcs);
        fleet
            .run_concurrent(
                self.options.jobs,
                |record| record.category() == Category::Scheduled,
                move |record| record.act(vcs.as_ref()),
            )
            .await;
    }

    /// Stage 8.
    pub async fn reverify(&self, fleet: &mut Fleet) {
        let vcs = Arc::clone(&self.vcs);
        fleet
            .run_concurrent(
                self.options.jobs,
                |record| record.acted,
                move |record| record.reverify(vcs.as_ref()),
            )
            .await;
    }
}

fn report(stage: Stage, fleet: &Fleet, reporter: &mut dyn Reporter) -> RunStats {
    let stats = RunStats::collect(stage, fleet);
    tracing::info!(
        stage = %stage,
        complete = stats.complete_count(),
        pending = stats.pending_count(),
        skipped = stats.skipped_count(),
        "stage finished"
    );
    reporter.stage(&stats);
    stats
}

/// Drive `future` to completion on a fresh multi-threaded runtime sized for
/// `jobs` blocking adapter calls.
pub fn run_blocking<F: Future>(jobs: usize, future: F) -> Result<F::Output, SyncError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(jobs.max(1))
        .build()
        .map_err(SyncError::Runtime)?;
    Ok(runtime.block_on(future))
}
