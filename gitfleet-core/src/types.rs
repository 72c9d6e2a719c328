//! Domain types for the gitfleet manifest.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Document types are serializable/deserializable via serde + serde_yaml.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

macro_rules! name_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

name_newtype!(
    /// Account or organisation that owns a repository on its remote.
    UserName
);
name_newtype!(
    /// Remote host (`github.com`), or a local directory for `file` zones.
    RemoteHost
);
name_newtype!(
    /// Directory under the base path that groups repositories.
    WorkspaceName
);
name_newtype!(
    /// Repository name; also the checkout directory name.
    RepoName
);

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Transport used to compose a repository's remote URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Https,
    Ssh,
    File,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Https => write!(f, "https"),
            Scheme::Ssh => write!(f, "ssh"),
            Scheme::File => write!(f, "file"),
        }
    }
}

// ---------------------------------------------------------------------------
// Manifest document
// ---------------------------------------------------------------------------

/// One group of repositories sharing user, remote and workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub user: UserName,
    pub remote: RemoteHost,
    pub workspace: WorkspaceName,
    #[serde(default)]
    pub scheme: Scheme,
    #[serde(default)]
    pub repositories: Vec<RepoName>,
}

/// Root of the manifest YAML document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Directory every workspace lives under. A leading `~` is expanded.
    #[serde(alias = "basePath")]
    pub base_path: PathBuf,
    #[serde(default)]
    pub zones: Vec<Zone>,
}

// ---------------------------------------------------------------------------
// Fleet entries
// ---------------------------------------------------------------------------

/// The immutable identity of one tracked repository.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RepoIdentity {
    pub user: UserName,
    pub remote: RemoteHost,
    pub workspace: WorkspaceName,
    pub name: RepoName,
}

impl RepoIdentity {
    /// Compose the URL `origin` is expected to point at.
    pub fn remote_url(&self, scheme: Scheme) -> String {
        let remote = self.remote.as_str().trim_end_matches('/');
        match scheme {
            Scheme::Https => format!("https://{remote}/{}/{}.git", self.user, self.name),
            Scheme::Ssh => format!("git@{remote}:{}/{}.git", self.user, self.name),
            Scheme::File => format!("file://{remote}/{}/{}.git", self.user, self.name),
        }
    }
}

impl fmt::Display for RepoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workspace, self.name)
    }
}

/// Filesystem locations derived from an identity and the base path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoPaths {
    pub workspace: PathBuf,
    pub repo: PathBuf,
    pub git_dir: PathBuf,
}

impl RepoPaths {
    /// Pure composition, no I/O.
    pub fn compose(base: &Path, workspace: &WorkspaceName, name: &RepoName) -> Self {
        let workspace = base.join(workspace.as_str());
        let repo = workspace.join(name.as_str());
        let git_dir = repo.join(".git");
        Self {
            workspace,
            repo,
            git_dir,
        }
    }
}

/// A manifest repository flattened out of its zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FleetEntry {
    pub identity: RepoIdentity,
    pub scheme: Scheme,
    pub url: String,
    pub paths: RepoPaths,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> RepoIdentity {
        RepoIdentity {
            user: UserName::from("alice"),
            remote: RemoteHost::from("github.com"),
            workspace: WorkspaceName::from("personal"),
            name: RepoName::from("dotfiles"),
        }
    }

    #[test]
    fn newtype_display() {
        assert_eq!(UserName::from("alice").to_string(), "alice");
        assert_eq!(RepoName::from(String::from("notes")).to_string(), "notes");
    }

    #[test]
    fn remote_url_per_scheme() {
        let id = identity();
        assert_eq!(
            id.remote_url(Scheme::Https),
            "https://github.com/alice/dotfiles.git"
        );
        assert_eq!(id.remote_url(Scheme::Ssh), "git@github.com:alice/dotfiles.git");
        let mirror = RepoIdentity {
            remote: RemoteHost::from("/srv/mirror/"),
            ..identity()
        };
        assert_eq!(
            mirror.remote_url(Scheme::File),
            "file:///srv/mirror/alice/dotfiles.git"
        );
    }

    #[test]
    fn paths_are_composed_from_base() {
        let id = identity();
        let paths = RepoPaths::compose(Path::new("/src"), &id.workspace, &id.name);
        assert_eq!(paths.workspace, PathBuf::from("/src/personal"));
        assert_eq!(paths.repo, PathBuf::from("/src/personal/dotfiles"));
        assert_eq!(paths.git_dir, PathBuf::from("/src/personal/dotfiles/.git"));
    }

    #[test]
    fn manifest_accepts_camel_case_base_path() {
        let yaml = "basePath: /src\nzones: []\n";
        let manifest: Manifest = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(manifest.base_path, PathBuf::from("/src"));
    }

    #[test]
    fn scheme_defaults_to_https() {
        let yaml = "user: a\nremote: r\nworkspace: w\nrepositories: [x]\n";
        let zone: Zone = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(zone.scheme, Scheme::Https);
        assert_eq!(Scheme::File.to_string(), "file");
    }
}
