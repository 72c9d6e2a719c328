//! # gitfleet-sync
//!
//! Verification and reconciliation engine for a fleet of git checkouts.
//!
//! Build a [`Fleet`] from the manifest, then drive it with a [`Pipeline`]:
//! [`Pipeline::verify`] for a read-only status run, [`Pipeline::run`] for the
//! full confirm/act/re-verify cycle. Per-repository failures never surface as
//! `Err`; they are recorded on the [`RepoRecord`] and show up as skipped.

pub mod classify;
pub mod confirm;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod fakes;
pub mod fleet;
pub mod labels;
pub mod pipeline;
pub mod record;
pub mod stats;
pub mod vcs;
pub mod workspace;

pub use classify::{Action, Category, Classification, Status, UpstreamPosition};
pub use confirm::{AutoConfirm, ConfirmRequest, ConfirmResponse, Confirmer, DeclineAll};
pub use error::SyncError;
pub use fleet::Fleet;
pub use pipeline::{run_blocking, Pipeline, PipelineOptions, DEFAULT_JOBS};
pub use record::{RecordError, RepoRecord};
pub use stats::{ErrorEntry, NullReporter, Reporter, RunStats, Stage};
pub use vcs::{GitCli, Vcs, VcsOp, VcsOutput, WorkingCopy};
