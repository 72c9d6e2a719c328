//! Workspace directory creation and inspection.
//!
//! Several records may share one workspace and the fleet may check distinct
//! workspaces concurrently, so creation must tolerate a concurrent creator.
//! `create_dir_all` already treats "created by someone else" as success.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::labels;

/// Why a workspace cannot host checkouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceFault {
    /// The path (or one of its ancestors) is a plain file.
    Blocked { path: PathBuf },
    /// The directory exists but cannot be read or written.
    PermissionDenied { path: PathBuf },
    /// The directory is absent and could not be created.
    Missing { path: PathBuf, reason: String },
}

impl WorkspaceFault {
    pub fn label(&self) -> &'static str {
        match self {
            WorkspaceFault::Blocked { .. } => labels::PATH_BLOCKED,
            WorkspaceFault::PermissionDenied { .. } => labels::PERMISSION_DENIED,
            WorkspaceFault::Missing { .. } => labels::WORKSPACE_MISSING,
        }
    }
}

impl fmt::Display for WorkspaceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceFault::Blocked { path } => {
                write!(f, "workspace {} is blocked by a file", path.display())
            }
            WorkspaceFault::PermissionDenied { path } => {
                write!(f, "workspace {} is not writable", path.display())
            }
            WorkspaceFault::Missing { path, reason } => {
                write!(f, "workspace {} could not be created: {reason}", path.display())
            }
        }
    }
}

/// Create `path` if absent, then verify it is a usable directory.
pub fn ensure_workspace(path: &Path) -> Result<(), WorkspaceFault> {
    match fs::metadata(path) {
        Ok(meta) if !meta.is_dir() => {
            return Err(WorkspaceFault::Blocked {
                path: path.to_path_buf(),
            })
        }
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => create(path)?,
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            return Err(WorkspaceFault::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(err) => {
            // ENOTDIR: an ancestor is a file.
            if has_file_ancestor(path) {
                return Err(WorkspaceFault::Blocked {
                    path: path.to_path_buf(),
                });
            }
            return Err(WorkspaceFault::Missing {
                path: path.to_path_buf(),
                reason: err.to_string(),
            });
        }
    }
    inspect(path)
}

fn create(path: &Path) -> Result<(), WorkspaceFault> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            Err(WorkspaceFault::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) if path.is_file() || has_file_ancestor(path) => Err(WorkspaceFault::Blocked {
            path: path.to_path_buf(),
        }),
        Err(err) => Err(WorkspaceFault::Missing {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }),
    }
}

/// Post-creation checks: exists, is a directory, readable, writable.
fn inspect(path: &Path) -> Result<(), WorkspaceFault> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            return Err(WorkspaceFault::Missing {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })
        }
    };
    if !meta.is_dir() {
        return Err(WorkspaceFault::Blocked {
            path: path.to_path_buf(),
        });
    }
    if fs::read_dir(path).is_err() || !writable(path) {
        return Err(WorkspaceFault::PermissionDenied {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Permission bits alone miss ownership, so try an actual write.
fn writable(path: &Path) -> bool {
    tempfile::Builder::new()
        .prefix(".gitfleet-write-check")
        .tempfile_in(path)
        .is_ok()
}

fn has_file_ancestor(path: &Path) -> bool {
    path.ancestors().skip(1).any(|ancestor| ancestor.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_missing_workspace() {
        let root = TempDir::new().expect("tempdir");
        let path = root.path().join("a").join("b");
        ensure_workspace(&path).expect("ensure");
        assert!(path.is_dir());
    }

    #[test]
    fn existing_directory_is_fine() {
        let root = TempDir::new().expect("tempdir");
        ensure_workspace(root.path()).expect("ensure");
    }

    #[test]
    fn file_in_place_is_blocked() {
        let root = TempDir::new().expect("tempdir");
        let path = root.path().join("ws");
        fs::write(&path, "not a dir").expect("write");
        let fault = ensure_workspace(&path).unwrap_err();
        assert_eq!(fault.label(), "path blocked");
        assert!(fault.to_string().contains("blocked by a file"));
    }

    #[test]
    fn file_ancestor_is_blocked() {
        let root = TempDir::new().expect("tempdir");
        let file = root.path().join("ws");
        fs::write(&file, "not a dir").expect("write");
        let fault = ensure_workspace(&file.join("nested")).unwrap_err();
        assert_eq!(fault.label(), "path blocked");
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_directory_is_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().expect("tempdir");
        let path = root.path().join("locked");
        fs::create_dir(&path).expect("mkdir");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o555)).expect("chmod");
        // Privileged users write regardless of mode bits.
        let privileged = fs::write(path.join("canary"), "x").is_ok();
        let result = ensure_workspace(&path);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        if privileged {
            return;
        }
        let fault = result.unwrap_err();
        assert_eq!(fault.label(), "permission denied");
        assert!(fault.to_string().contains("not writable"));
    }

    #[test]
    fn writable_check_leaves_no_files_behind() {
        let root = TempDir::new().expect("tempdir");
        ensure_workspace(root.path()).expect("ensure");
        assert_eq!(fs::read_dir(root.path()).expect("read_dir").count(), 0);
    }

    #[test]
    fn concurrent_creation_is_idempotent() {
        let root = TempDir::new().expect("tempdir");
        let path = root.path().join("shared").join("workspace");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || ensure_workspace(&path))
            })
            .collect();
        for handle in handles {
            handle.join().expect("join").expect("ensure");
        }
        assert!(path.is_dir());
    }
}
