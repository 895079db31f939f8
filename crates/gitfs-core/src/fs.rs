//! The [`GitFs`] handle
//!
//! File operations forward to the backing store untouched. Durability only
//! happens at [`GitFs::sync`], which commits the whole working copy and
//! pushes it to the remote.

use std::fs::File;
use std::path::Path;

use gitfs_git::{
    CancellationToken, CredentialProvider, KeyFileProvider, PullOutcome, Repository, StatusMap,
};
use gitfs_store::{FileInfo, OpenFlags, Store};

use crate::backend::select_store;
use crate::config::Config;
use crate::{Error, Result, sync};

/// A file system whose durable copy is a remote git repository.
///
/// One handle owns one working copy. Every mutating operation takes
/// `&mut self`, and the handle is `Send` but not `Sync`, so callers wanting
/// to share it across threads wrap it in a `Mutex`.
#[derive(Debug)]
pub struct GitFs {
    repo: Repository,
    require_pull: bool,
}

impl GitFs {
    /// Validate `config`, load the SSH identity and bootstrap the repository.
    ///
    /// The identity comes from `config.identity_file`, or `~/.ssh/id_rsa`.
    pub fn open(cancel: &CancellationToken, config: Config) -> Result<Self> {
        let provider = match &config.identity_file {
            Some(path) => KeyFileProvider::new(path),
            None => KeyFileProvider::default_location()?,
        };
        Self::open_with(cancel, config, &provider)
    }

    /// Like [`GitFs::open`] with an explicit credential source.
    pub fn open_with(
        cancel: &CancellationToken,
        config: Config,
        credentials: &dyn CredentialProvider,
    ) -> Result<Self> {
        let config = config.validate()?;
        let identity = credentials.identity()?;
        let store = select_store(&config)?;

        tracing::info!(
            url = %config.url,
            storage = ?config.storage,
            root = %store.root().display(),
            "Opening gitfs"
        );
        let repo = Repository::bootstrap(
            store,
            &config.url,
            identity,
            config.error_if_exists(),
            cancel,
        )?;

        Ok(Self {
            repo,
            require_pull: config.require_pull,
        })
    }

    /// Fast-forward the working copy from the remote.
    pub fn pull(&mut self) -> Result<PullOutcome> {
        Ok(self.repo.pull()?)
    }

    /// Commit every local change and push it. With `purge` the history is
    /// discarded first and the remote branch is overwritten.
    pub fn sync(&mut self, purge: bool) -> Result<()> {
        if self.require_pull && !self.repo.pulled() {
            return Err(Error::PullRequired {
                url: self.repo.url().to_string(),
            });
        }
        sync::sync(&mut self.repo, purge)
    }

    /// Push the current branch without committing.
    ///
    /// Retries the push of a sync that committed but failed to push. After
    /// a purge whose push failed, the push is forced until it succeeds.
    pub fn push(&mut self) -> Result<()> {
        Ok(self.repo.push(false)?)
    }

    pub fn status(&self) -> Result<StatusMap> {
        Ok(self.repo.status()?)
    }

    /// Whether a pull has succeeded on this handle.
    pub fn has_pulled(&self) -> bool {
        self.repo.pulled()
    }

    /// Commits reachable from `HEAD`.
    pub fn history_depth(&self) -> Result<usize> {
        Ok(self.repo.history_depth()?)
    }

    pub fn url(&self) -> &str {
        self.repo.url()
    }

    /// The backing store, for callers wanting the raw [`Store`] API.
    pub fn store(&self) -> &dyn Store {
        self.repo.store()
    }

    pub fn create(&self, path: &str) -> Result<File> {
        Ok(self.store().create(path)?)
    }

    /// Open `path` read-only.
    pub fn open_read(&self, path: &str) -> Result<File> {
        Ok(self.store().open(path)?)
    }

    pub fn open_file(&self, path: &str, flags: OpenFlags, perm: u32) -> Result<File> {
        Ok(self.store().open_file(path, flags, perm)?)
    }

    pub fn stat(&self, path: &str) -> Result<FileInfo> {
        Ok(self.store().stat(path)?)
    }

    pub fn lstat(&self, path: &str) -> Result<FileInfo> {
        Ok(self.store().lstat(path)?)
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        Ok(self.store().rename(from, to)?)
    }

    pub fn remove(&self, path: &str) -> Result<()> {
        Ok(self.store().remove(path)?)
    }

    pub fn remove_all(&self, path: &str) -> Result<()> {
        Ok(self.store().remove_all(path)?)
    }

    pub fn read_dir(&self, path: &str) -> Result<Vec<FileInfo>> {
        Ok(self.store().read_dir(path)?)
    }

    pub fn mkdir_all(&self, path: &str, perm: u32) -> Result<()> {
        Ok(self.store().mkdir_all(path, perm)?)
    }

    pub fn symlink(&self, target: &str, link: &str) -> Result<()> {
        Ok(self.store().symlink(target, link)?)
    }

    pub fn read_link(&self, link: &str) -> Result<String> {
        Ok(self.store().read_link(link)?)
    }

    /// Create a uniquely named file in `dir`; returns its store path.
    pub fn temp_file(&self, dir: &str, prefix: &str) -> Result<(String, File)> {
        Ok(self.store().temp_file(dir, prefix)?)
    }

    pub fn join(&self, elems: &[&str]) -> String {
        self.store().join(elems)
    }

    /// A store view rooted at `path`. Changes made through it are part of
    /// this handle's working copy.
    pub fn chroot(&self, path: &str) -> Result<Box<dyn Store>> {
        Ok(self.store().chroot(path)?)
    }

    pub fn root(&self) -> &Path {
        self.store().root()
    }

    pub fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.store().exists(path)?)
    }
}
