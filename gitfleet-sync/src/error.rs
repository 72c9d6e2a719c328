//! Error types for gitfleet-sync.
//!
//! Only setup failures surface here. Per-repository failures are recorded on
//! the [`RepoRecord`](crate::record::RepoRecord) and never abort a run.

use thiserror::Error;

use gitfleet_core::ManifestError;

/// All errors that can arise while preparing or driving a pipeline run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from manifest loading.
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// The async runtime could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// Pipeline options that cannot drive a run.
    #[error("invalid pipeline options: {0}")]
    InvalidOptions(String),

    /// Stage report serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
