//! End-to-end scenarios against a local bare remote
//!
//! Each test drives the public `GitFs` API: open, write through the facade,
//! sync, and inspect both the working copy and the remote.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use gitfs_core::{CancellationToken, Config, Error, GitFs, SshIdentity, StatusCode};
use gitfs_git::Repository;
use gitfs_store::DiskStore;
use gitfs_test_utils::{BareRemote, FAKE_PRIVATE_KEY, write_fake_key};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn identity() -> SshIdentity {
    SshIdentity::from_private_key(FAKE_PRIVATE_KEY, Path::new("test-key")).unwrap()
}

fn open(config: Config) -> gitfs_core::Result<GitFs> {
    GitFs::open_with(&CancellationToken::new(), config, &identity())
}

fn put(fs: &GitFs, path: &str, content: &str) {
    fs.create(path).unwrap().write_all(content.as_bytes()).unwrap();
}

#[test]
fn overwrite_is_modified_until_synced() {
    let remote = BareRemote::new();
    let mut fs = open(Config::new().with_url(remote.url()).use_memory()).unwrap();

    put(&fs, "overwrite.txt", "A");
    fs.sync(false).unwrap();

    put(&fs, "overwrite.txt", "B");
    assert_eq!(
        fs.status().unwrap(),
        HashMap::from([("overwrite.txt".to_string(), StatusCode::Modified)])
    );

    fs.sync(false).unwrap();
    assert_eq!(fs.status().unwrap(), HashMap::new());
    assert_eq!(remote.file("overwrite.txt").as_deref(), Some("B"));
    assert_eq!(remote.depth(), 2);
}

#[test]
fn guarded_bootstrap_rejects_live_repository() {
    let base = TempDir::new().unwrap();
    let remote = BareRemote::new();
    let config = Config::new()
        .with_url(remote.url())
        .use_disk(base.path(), false);

    drop(open(config.clone()).unwrap());
    let err = open(config).unwrap_err();

    assert!(
        matches!(err, Error::Git(gitfs_git::Error::AlreadyExists { .. })),
        "got {err:?}"
    );
}

#[test]
fn reopen_needs_no_network() {
    let base = TempDir::new().unwrap();
    let remote = BareRemote::with_files(&[("seed.txt", "from remote")]);

    let first = open(
        Config::new()
            .with_url(remote.url())
            .use_disk(base.path(), true),
    )
    .unwrap();
    assert!(first.exists("seed.txt").unwrap());
    drop(first);

    // The remote is gone; reopening must not touch it.
    let remote_path = remote.path().to_path_buf();
    drop(remote);
    assert!(!remote_path.exists());

    let reopened = open(
        Config::new()
            .with_url(remote_path.display().to_string())
            .use_disk(base.path(), true),
    )
    .unwrap();
    assert!(reopened.exists("seed.txt").unwrap());
    assert!(reopened.status().unwrap().is_empty());
}

#[test]
fn purge_sync_leaves_single_commit() {
    let remote = BareRemote::new();
    let mut fs = open(Config::new().with_url(remote.url()).use_memory()).unwrap();

    for round in 0..3 {
        put(&fs, "log.txt", &format!("round {round}"));
        fs.sync(false).unwrap();
    }
    assert_eq!(fs.history_depth().unwrap(), 3);

    put(&fs, "log.txt", "final");
    fs.sync(true).unwrap();

    assert_eq!(fs.history_depth().unwrap(), 1);
    assert_eq!(remote.depth(), 1);
    assert_eq!(remote.file("log.txt").as_deref(), Some("final"));
    assert!(fs.status().unwrap().is_empty());
}

/// Renames the remote away for the lifetime of the returned guard.
struct Outage<'a> {
    remote: &'a BareRemote,
    parked: std::path::PathBuf,
}

impl<'a> Outage<'a> {
    fn begin(remote: &'a BareRemote) -> Self {
        let parked = remote.path().with_extension("offline");
        std::fs::rename(remote.path(), &parked).unwrap();
        Self { remote, parked }
    }
}

impl Drop for Outage<'_> {
    fn drop(&mut self) {
        std::fs::rename(&self.parked, self.remote.path()).unwrap();
    }
}

#[test]
fn purge_interrupted_by_outage_is_pushed_on_retry() {
    let remote = BareRemote::with_files(&[("log.txt", "v1")]);
    remote.commit_files(&[("log.txt", "v2")], "second");
    let mut fs = open(Config::new().with_url(remote.url()).use_memory()).unwrap();

    put(&fs, "log.txt", "purged");
    {
        let _outage = Outage::begin(&remote);
        let err = fs.sync(true).unwrap_err();
        assert!(
            matches!(err, Error::Git(gitfs_git::Error::Transport { .. })),
            "got {err:?}"
        );
    }
    assert_eq!(remote.depth(), 2);
    assert_eq!(fs.history_depth().unwrap(), 1);

    fs.push().unwrap();
    assert_eq!(remote.depth(), 1);
    assert_eq!(remote.file("log.txt").as_deref(), Some("purged"));
}

#[test]
fn purge_interrupted_by_outage_is_completed_by_next_sync() {
    let remote = BareRemote::with_files(&[("log.txt", "v1")]);
    remote.commit_files(&[("log.txt", "v2")], "second");
    let mut fs = open(Config::new().with_url(remote.url()).use_memory()).unwrap();

    put(&fs, "log.txt", "purged");
    {
        let _outage = Outage::begin(&remote);
        assert!(fs.sync(true).is_err());
    }

    put(&fs, "log.txt", "after outage");
    fs.sync(false).unwrap();
    assert_eq!(remote.depth(), fs.history_depth().unwrap());
    assert_eq!(remote.depth(), 2);
    assert_eq!(remote.file("log.txt").as_deref(), Some("after outage"));
}

#[test]
fn pull_leaves_unsynced_edits_alone() {
    let remote = BareRemote::with_files(&[("notes.txt", "v1")]);
    let mut fs = open(Config::new().with_url(remote.url()).use_memory()).unwrap();

    put(&fs, "notes.txt", "local draft");
    remote.commit_files(&[("notes.txt", "v2")], "upstream");

    let err = fs.pull().unwrap_err();
    assert!(
        matches!(err, Error::Git(ref git) if git.is_would_overwrite()),
        "got {err:?}"
    );
    assert!(!fs.has_pulled());
    let mut content = String::new();
    std::io::Read::read_to_string(&mut fs.open_read("notes.txt").unwrap(), &mut content).unwrap();
    assert_eq!(content, "local draft");
}

#[test]
fn disk_session_adopts_existing_directory() {
    let base = TempDir::new().unwrap();
    std::fs::write(base.path().join("local.txt"), "before gitfs").unwrap();
    let remote = BareRemote::with_files(&[("seed.txt", "from remote")]);

    let mut fs = open(
        Config::new()
            .with_url(remote.url())
            .use_disk(base.path(), true),
    )
    .unwrap();

    assert!(fs.exists("seed.txt").unwrap());
    assert_eq!(
        fs.status().unwrap(),
        HashMap::from([("local.txt".to_string(), StatusCode::Untracked)])
    );
    fs.sync(false).unwrap();
    assert_eq!(remote.file("local.txt").as_deref(), Some("before gitfs"));
}

#[test]
fn status_is_idempotent_and_hides_metadata() {
    let remote = BareRemote::with_files(&[("kept.txt", "k"), ("edit.txt", "v1")]);
    let fs = open(Config::new().with_url(remote.url()).use_memory()).unwrap();

    put(&fs, "edit.txt", "v2");
    put(&fs, "a/b/c/deep.txt", "deep");
    let first = fs.status().unwrap();
    let second = fs.status().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.get("edit.txt"), Some(&StatusCode::Modified));
    assert_eq!(first.get("a/b/c/deep.txt"), Some(&StatusCode::Untracked));
    assert!(!first.contains_key("kept.txt"));
    assert!(first.keys().all(|k| !k.split('/').any(|c| c == ".git")));
}

#[test]
fn concurrent_writer_is_reported_as_divergence() {
    let remote = BareRemote::with_files(&[("shared.txt", "base")]);
    let mut fs = open(Config::new().with_url(remote.url()).use_memory()).unwrap();
    let theirs = remote.commit_files(&[("shared.txt", "theirs")], "other writer");

    put(&fs, "shared.txt", "ours");
    let err = fs.sync(false).unwrap_err();
    assert!(err.is_diverged(), "got {err:?}");
    // The local commit stays; the remote keeps the other writer's tip.
    assert_eq!(remote.master(), Some(theirs));
    assert_eq!(fs.history_depth().unwrap(), 2);

    // Purging overwrites the remote with local state.
    fs.sync(true).unwrap();
    assert_eq!(remote.file("shared.txt").as_deref(), Some("ours"));
    assert_eq!(remote.depth(), 1);
}

#[test]
fn pull_brings_remote_changes_into_working_copy() {
    let remote = BareRemote::with_files(&[("a.txt", "1")]);
    let mut fs = open(Config::new().with_url(remote.url()).use_memory()).unwrap();

    remote.commit_files(&[("a.txt", "2"), ("b.txt", "new")], "upstream");
    fs.pull().unwrap();

    let mut content = String::new();
    std::io::Read::read_to_string(&mut fs.open_read("a.txt").unwrap(), &mut content).unwrap();
    assert_eq!(content, "2");
    assert!(fs.exists("b.txt").unwrap());
    assert!(fs.status().unwrap().is_empty());

    put(&fs, "c.txt", "local");
    fs.sync(false).unwrap();
    assert_eq!(remote.depth(), 3);
}

#[test]
fn config_file_drives_disk_session() {
    let base = TempDir::new().unwrap();
    let keys = TempDir::new().unwrap();
    let remote = BareRemote::new();
    let key = write_fake_key(keys.path());

    let config_path = keys.path().join("gitfs.toml");
    std::fs::write(
        &config_path,
        format!(
            "url = {:?}\nstorage = \"disk\"\nbase_dir = {:?}\nidentity_file = {:?}\n",
            remote.url(),
            base.path().display().to_string(),
            key.display().to_string(),
        ),
    )
    .unwrap();

    let mut fs = GitFs::open(&CancellationToken::new(), Config::load(&config_path).unwrap())
        .unwrap();
    put(&fs, "persisted.txt", "on disk");
    fs.sync(false).unwrap();

    assert!(base.path().join("persisted.txt").is_file());
    assert!(base.path().join(".git").is_dir());
    assert_eq!(remote.file("persisted.txt").as_deref(), Some("on disk"));
}

#[test]
fn memory_sessions_leave_nothing_behind() {
    let remote = BareRemote::new();
    let fs = open(Config::new().with_url(remote.url()).use_memory()).unwrap();
    let root = fs.root().to_path_buf();
    assert!(root.join(".git").is_dir());

    drop(fs);
    assert!(!root.exists());
}

#[test]
fn repository_layer_sees_facade_writes() {
    let base = TempDir::new().unwrap();
    let remote = BareRemote::new();
    let mut fs = open(
        Config::new()
            .with_url(remote.url())
            .use_disk(base.path(), false),
    )
    .unwrap();
    put(&fs, "x.txt", "x");
    fs.sync(false).unwrap();
    drop(fs);

    let repo = Repository::bootstrap(
        Box::new(DiskStore::new(base.path())),
        &remote.url(),
        identity(),
        false,
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(repo.history_depth().unwrap(), 1);
    assert_eq!(repo.head_commit().unwrap(), remote.master());
}
