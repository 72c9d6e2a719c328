//! Manifest discovery, loading and flattening.
//!
//! # Storage layout
//!
//! ```text
//! ~/.gitfleet/
//!   manifest.yaml   (default location; any path can be passed explicitly)
//! ```
//!
//! # API pattern
//!
//! Every home-dependent function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use crate::error::{io_err, ManifestError};
use crate::types::{FleetEntry, Manifest, RepoIdentity, RepoPaths};

pub const MANIFEST_DIR: &str = ".gitfleet";
pub const MANIFEST_FILE: &str = "manifest.yaml";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.gitfleet/manifest.yaml`: pure, no I/O.
pub fn manifest_path_at(home: &Path) -> PathBuf {
    home.join(MANIFEST_DIR).join(MANIFEST_FILE)
}

/// `manifest_path_at` convenience wrapper.
pub fn manifest_path() -> Result<PathBuf, ManifestError> {
    Ok(manifest_path_at(&home()?))
}

/// Expand a leading `~` in the manifest's base path against `home`.
pub fn expand_base_path(base: &Path, home: &Path) -> PathBuf {
    match base.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => base.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load and validate a manifest from an explicit path.
///
/// Returns `ManifestError::ManifestNotFound` if absent,
/// `ManifestError::Parse` (with path + line context) if malformed YAML,
/// `ManifestError::Invalid` if an entry cannot name a checkout directory.
pub fn load_from(path: &Path) -> Result<Manifest, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::ManifestNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let manifest: Manifest = serde_yaml::from_str(&contents).map_err(|e| ManifestError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&manifest)?;
    Ok(manifest)
}

/// Load `<home>/.gitfleet/manifest.yaml`.
pub fn load_at(home: &Path) -> Result<Manifest, ManifestError> {
    load_from(&manifest_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Manifest, ManifestError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Validate
// ---------------------------------------------------------------------------

/// Reject entries that would escape their workspace or name nothing.
pub fn validate(manifest: &Manifest) -> Result<(), ManifestError> {
    if manifest.base_path.as_os_str().is_empty() {
        return Err(ManifestError::Invalid {
            zone: 0,
            reason: "base_path is empty".to_string(),
        });
    }
    for (index, zone) in manifest.zones.iter().enumerate() {
        let invalid = |reason: String| ManifestError::Invalid {
            zone: index,
            reason,
        };
        if zone.remote.as_str().trim().is_empty() {
            return Err(invalid("remote is empty".to_string()));
        }
        check_component("user", zone.user.as_str()).map_err(invalid)?;
        check_component("workspace", zone.workspace.as_str()).map_err(invalid)?;
        for repo in &zone.repositories {
            check_component("repository", repo.as_str()).map_err(invalid)?;
        }
    }
    Ok(())
}

fn check_component(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} is empty"));
    }
    if value == "." || value == ".." {
        return Err(format!("{field} '{value}' is not a directory name"));
    }
    if value.contains('/') || value.contains('\\') {
        return Err(format!("{field} '{value}' contains a path separator"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Flatten
// ---------------------------------------------------------------------------

/// Flatten every zone into one entry per listed repository, in manifest order.
///
/// Duplicates are preserved; the fleet collection owns deduplication.
pub fn entries_at(manifest: &Manifest, home: &Path) -> Vec<FleetEntry> {
    let base = expand_base_path(&manifest.base_path, home);
    manifest
        .zones
        .iter()
        .flat_map(|zone| {
            let base = base.clone();
            zone.repositories.iter().map(move |name| {
                let identity = RepoIdentity {
                    user: zone.user.clone(),
                    remote: zone.remote.clone(),
                    workspace: zone.workspace.clone(),
                    name: name.clone(),
                };
                FleetEntry {
                    url: identity.remote_url(zone.scheme),
                    paths: RepoPaths::compose(&base, &zone.workspace, name),
                    scheme: zone.scheme,
                    identity,
                }
            })
        })
        .collect()
}

/// `entries_at` convenience wrapper.
pub fn entries(manifest: &Manifest) -> Result<Vec<FleetEntry>, ManifestError> {
    Ok(entries_at(manifest, &home()?))
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ManifestError> {
    dirs::home_dir().ok_or(ManifestError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
