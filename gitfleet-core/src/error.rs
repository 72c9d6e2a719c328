//! Error types for gitfleet-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from manifest operations.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Underlying I/O failure (permission denied, is a directory, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse manifest at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.gitfleet/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The manifest file did not exist at the expected path.
    #[error("manifest not found at {path}")]
    ManifestNotFound { path: PathBuf },

    /// A zone or repository entry cannot be turned into a checkout path.
    #[error("invalid manifest entry in zone {zone}: {reason}")]
    Invalid { zone: usize, reason: String },
}

/// Convenience constructor for [`ManifestError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ManifestError {
    ManifestError::Io {
        path: path.into(),
        source,
    }
}
