use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn gitfleet_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gitfleet"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

/// Manifest with a workspace blocked by a plain file and one repository
/// whose checkout does not exist yet.
fn write_manifest(home: &Path) -> PathBuf {
    let base = home.join("src");
    fs::create_dir_all(&base).expect("mkdir base");
    fs::write(base.join("blocked"), "not a directory").expect("write blocker");

    let manifest = format!(
        "base_path: {base}\n\
         zones:\n\
         \x20 - user: alice\n\
         \x20   remote: github.com\n\
         \x20   workspace: blocked\n\
         \x20   repositories: [dotfiles]\n\
         \x20 - user: alice\n\
         \x20   remote: {remotes}\n\
         \x20   workspace: mirror\n\
         \x20   scheme: file\n\
         \x20   repositories: [tools]\n",
        base = base.display(),
        remotes = home.join("remotes").display(),
    );
    let path = home.join("fleet.yaml");
    fs::write(&path, manifest).expect("write manifest");
    path
}

#[test]
fn missing_manifest_is_reported() {
    let home = TempDir::new().expect("home");
    gitfleet_cmd(home.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(contains("manifest not found"));
}

#[test]
fn list_shows_urls_and_paths() {
    let home = TempDir::new().expect("home");
    let manifest = write_manifest(home.path());
    gitfleet_cmd(home.path())
        .args(["--manifest"])
        .arg(&manifest)
        .arg("list")
        .assert()
        .success()
        .stdout(contains("blocked/dotfiles"))
        .stdout(contains("https://github.com/alice/dotfiles.git"))
        .stdout(contains("mirror/tools"))
        .stdout(contains("2 repositories in 2 zones"));
}

#[test]
fn status_json_reports_blocked_workspace() {
    let home = TempDir::new().expect("home");
    let manifest = write_manifest(home.path());
    // The mirror checkout is missing and its remote does not exist, so the
    // clone fails; neither outcome depends on network access.
    gitfleet_cmd(home.path())
        .arg("--manifest")
        .arg(&manifest)
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(contains("\"label\": \"path blocked\""))
        .stdout(contains("\"name\": \"blocked/dotfiles\""))
        .stdout(contains("\"skipped\": 2"));
}

#[test]
fn status_table_reports_blocked_workspace() {
    let home = TempDir::new().expect("home");
    let manifest = write_manifest(home.path());
    gitfleet_cmd(home.path())
        .arg("--manifest")
        .arg(&manifest)
        .arg("status")
        .assert()
        .success()
        .stdout(contains("path blocked"))
        .stdout(contains("BLOCKED"))
        .stdout(contains("skipped"));
}

#[test]
fn dry_run_sync_reports_clone_without_running_it() {
    let home = TempDir::new().expect("home");
    let manifest = write_manifest(home.path());
    gitfleet_cmd(home.path())
        .arg("--manifest")
        .arg(&manifest)
        .args(["sync", "--dry-run", "--yes", "--json"])
        .assert()
        .success()
        .stdout(contains("\"pending_clone\": true"))
        .stdout(contains("\"dry_run\": true"));
    assert!(!home.path().join("src/mirror/tools").exists());
    assert!(home.path().join("src/mirror").is_dir());
}

#[test]
fn zero_jobs_is_rejected() {
    let home = TempDir::new().expect("home");
    gitfleet_cmd(home.path())
        .args(["-j", "0", "status"])
        .assert()
        .failure()
        .stderr(contains("must be at least 1"));
}

#[test]
fn json_sync_requires_yes() {
    let home = TempDir::new().expect("home");
    gitfleet_cmd(home.path())
        .args(["sync", "--json"])
        .assert()
        .failure()
        .stderr(contains("--yes"));
}

#[test]
fn default_manifest_lives_under_home() {
    let home = TempDir::new().expect("home");
    let manifest = write_manifest(home.path());
    let default = home.path().join(".gitfleet").join("manifest.yaml");
    fs::create_dir_all(default.parent().expect("parent")).expect("mkdir");
    fs::copy(&manifest, &default).expect("copy");

    gitfleet_cmd(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(contains("mirror/tools").and(contains("blocked/dotfiles")));
}
