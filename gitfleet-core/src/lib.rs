//! gitfleet core library: domain types, manifest loading, errors.
//!
//! - [`types`]: newtypes, the manifest document, fleet entries
//! - [`error`]: [`ManifestError`]
//! - [`manifest`]: locate / load / validate / flatten

pub mod error;
pub mod manifest;
pub mod types;

pub use error::ManifestError;
pub use types::{
    FleetEntry, Manifest, RemoteHost, RepoIdentity, RepoName, RepoPaths, Scheme, UserName,
    WorkspaceName, Zone,
};
