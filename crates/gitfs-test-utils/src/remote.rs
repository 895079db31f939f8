//! Bare repositories used as the remote end of push, pull and clone.
//!
//! A [`BareRemote`] lives in its own temp directory and is addressed by
//! path, which libgit2 treats as a local transport.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

const MASTER: &str = "refs/heads/master";

/// A bare repository whose `HEAD` points at `master`.
pub struct BareRemote {
    _dir: TempDir,
    path: PathBuf,
}

impl BareRemote {
    /// Creates an empty bare repository.
    ///
    /// # Panics
    /// Panics if the repository cannot be initialised.
    pub fn new() -> Self {
        let dir = tempfile::tempdir()
            .unwrap_or_else(|e| panic!("BareRemote::new: failed to create temp dir: {e}"));
        let path = dir.path().join("remote.git");

        let mut opts = git2::RepositoryInitOptions::new();
        opts.bare(true).initial_head("master");
        git2::Repository::init_opts(&path, &opts).unwrap_or_else(|e| {
            panic!("BareRemote::new: failed to init {}: {e}", path.display())
        });

        Self { _dir: dir, path }
    }

    /// Creates a bare repository with one commit holding `files`.
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let remote = Self::new();
        remote.commit_files(files, "seed");
        remote
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The URL handed to gitfs. Local paths need no credentials.
    pub fn url(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&self) -> git2::Repository {
        git2::Repository::open_bare(&self.path)
            .unwrap_or_else(|e| panic!("BareRemote: failed to open {}: {e}", self.path.display()))
    }

    /// Commits `files` (flat names only) on top of `master`, replacing the
    /// whole tree. Simulates another writer pushing to the remote.
    ///
    /// # Panics
    /// Panics on any git failure.
    pub fn commit_files(&self, files: &[(&str, &str)], message: &str) -> git2::Oid {
        let repo = self.open();
        let mut builder = repo
            .treebuilder(None)
            .unwrap_or_else(|e| panic!("commit_files: treebuilder: {e}"));
        for (name, content) in files {
            let blob = repo
                .blob(content.as_bytes())
                .unwrap_or_else(|e| panic!("commit_files: blob {name}: {e}"));
            builder
                .insert(name, blob, 0o100644)
                .unwrap_or_else(|e| panic!("commit_files: insert {name}: {e}"));
        }
        let tree_id = builder
            .write()
            .unwrap_or_else(|e| panic!("commit_files: write tree: {e}"));
        let tree = repo.find_tree(tree_id).unwrap_or_else(|e| panic!("commit_files: {e}"));

        let sig = git2::Signature::now("Remote Writer", "remote@test.com")
            .unwrap_or_else(|e| panic!("commit_files: signature: {e}"));
        let parent = self.master().map(|oid| {
            repo.find_commit(oid)
                .unwrap_or_else(|e| panic!("commit_files: parent: {e}"))
        });
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        repo.commit(Some(MASTER), &sig, &sig, message, &tree, &parents)
            .unwrap_or_else(|e| panic!("commit_files: commit: {e}"))
    }

    /// Tip of `master`, or `None` while the remote is empty.
    pub fn master(&self) -> Option<git2::Oid> {
        let repo = self.open();
        repo.find_reference(MASTER).ok().and_then(|r| r.target())
    }

    /// Number of commits reachable from `master`.
    pub fn depth(&self) -> usize {
        let Some(tip) = self.master() else {
            return 0;
        };
        let repo = self.open();
        let mut walk = repo.revwalk().unwrap_or_else(|e| panic!("depth: revwalk: {e}"));
        walk.push(tip).unwrap_or_else(|e| panic!("depth: push: {e}"));
        walk.count()
    }

    /// Content of `name` at the tip of `master`.
    pub fn file(&self, name: &str) -> Option<String> {
        let tip = self.master()?;
        let repo = self.open();
        let tree = repo.find_commit(tip).ok()?.tree().ok()?;
        let entry = tree.get_path(Path::new(name)).ok()?;
        let blob = repo.find_blob(entry.id()).ok()?;
        Some(String::from_utf8_lossy(blob.content()).into_owned())
    }
}

impl Default for BareRemote {
    fn default() -> Self {
        Self::new()
    }
}
