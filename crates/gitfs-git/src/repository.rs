//! Repository handle: bootstrap, reset and the per-handle git operations

use std::path::{Path, PathBuf};

use chrono::Local;
use git2::RepositoryInitOptions;
use gitfs_store::{METADATA_DIR, Store};
use tokio_util::sync::CancellationToken;

use crate::credential::SshIdentity;
use crate::remote::{self, BRANCH, BRANCH_REF, PullOutcome, REMOTE_NAME};
use crate::status::{self, StatusMap};
use crate::{Error, Result, commit};

/// Outcome of inspecting a store for repository metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metadata {
    Absent,
    Present,
}

/// Prefix of the scratch directory a reset builds the new repository in.
pub const RESET_STAGING_PREFIX: &str = ".gitfs-reset-";

/// A store bound to a git repository and its remote.
///
/// Owns the store, the opened repository (whose working copy is the store
/// root), the SSH identity and the remote URL. Mutating operations take
/// `&mut self` and the type is not `Sync`, so a handle has exactly one
/// driver at a time.
pub struct Repository {
    store: Box<dyn Store>,
    repo: git2::Repository,
    identity: SshIdentity,
    url: String,
    pulled: bool,
    /// Set by [`Repository::reset`] until the new lineage reaches the remote
    unpushed_reset: bool,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.store.root())
            .field("url", &self.url)
            .field("pulled", &self.pulled)
            .field("unpushed_reset", &self.unpushed_reset)
            .finish()
    }
}

impl Repository {
    /// Open the repository already in `store`, or clone `url` into it.
    ///
    /// With `error_if_exists` set, existing metadata fails with
    /// [`Error::AlreadyExists`] instead of being opened. Cloning checks
    /// `cancel` while objects are transferred; a canceled or failed clone
    /// leaves no metadata behind.
    pub fn bootstrap(
        store: Box<dyn Store>,
        url: &str,
        identity: SshIdentity,
        error_if_exists: bool,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let repo = match inspect_metadata(store.as_ref(), error_if_exists)? {
            Metadata::Present => {
                tracing::info!(root = %store.root().display(), "Opening existing repository");
                git2::Repository::open(store.root()).map_err(|e| {
                    Error::git(format!("open repository at {}", store.root().display()), e)
                })?
            }
            Metadata::Absent => clone_into(store.as_ref(), url, &identity, cancel)?,
        };
        ensure_branch_head(&repo)?;

        Ok(Self {
            store,
            repo,
            identity,
            url: url.to_string(),
            pulled: false,
            unpushed_reset: false,
        })
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Native directory of the checked-out working copy.
    pub fn workdir(&self) -> &Path {
        self.store.root()
    }

    /// Whether a pull has completed on this handle.
    ///
    /// Survives [`Repository::reset`]: a purge replaces the remote branch
    /// outright, so the new lineage has nothing to pull.
    pub fn pulled(&self) -> bool {
        self.pulled
    }

    /// Whether history was reset and the new lineage has not been pushed.
    /// While set, every push is forced.
    pub fn has_unpushed_reset(&self) -> bool {
        self.unpushed_reset
    }

    /// Discard all history and start over with an empty repository.
    ///
    /// The fresh repository is built in a scratch directory next to the
    /// store root and swapped in by rename, so a crash never leaves staging
    /// files inside the working copy. If the swap fails the previous
    /// metadata is put back; if that also fails the handle is unusable and
    /// [`Error::ResetFailed`] is returned.
    pub fn reset(&mut self) -> Result<()> {
        let root = self.store.root().to_path_buf();
        let live = root.join(METADATA_DIR);

        let scratch_parent = staging_parent(&root);
        let staging = tempfile::Builder::new()
            .prefix(RESET_STAGING_PREFIX)
            .tempdir_in(&scratch_parent)
            .map_err(|e| gitfs_store::Error::io(&scratch_parent, e))?;
        // Only the metadata is kept; the handle is dropped before the swap.
        init_fresh(staging.path(), &self.url)?;

        swap_metadata(&live, &staging.path().join(METADATA_DIR), &staging.path().join("parked"))?;

        self.repo = git2::Repository::open(&root).map_err(|e| Error::ResetFailed {
            path: live.clone(),
            message: format!("reopen after reset: {}", e.message()),
        })?;
        ensure_branch_head(&self.repo)?;
        self.unpushed_reset = true;
        // Parked metadata goes with the staging dir.
        drop(staging);

        tracing::info!(root = %root.display(), url = %self.url, "Reset repository history");
        Ok(())
    }

    /// Current status of every file in the store that differs from `HEAD`.
    pub fn status(&self) -> Result<StatusMap> {
        let raw = status::raw_statuses(&self.repo)?;
        let files = status::collect(self.store.as_ref(), &raw)?;
        tracing::debug!(changed = files.len(), raw = raw.len(), "Collected status");
        Ok(files)
    }

    pub fn stage_all(&self) -> Result<()> {
        commit::stage_all(&self.repo)
    }

    /// Commit the index with a timestamped sync message.
    pub fn commit(&self) -> Result<git2::Oid> {
        let now = Local::now();
        commit::commit(&self.repo, &commit::sync_message(now), now)
    }

    /// Push `master` to `origin`. See [`remote::push`].
    ///
    /// Forced when `force` is set or a reset lineage is still unpushed, so a
    /// purge whose push failed can be retried.
    pub fn push(&mut self, force: bool) -> Result<()> {
        let force = force || self.unpushed_reset;
        remote::push(&self.repo, &self.url, &self.identity, force)?;
        self.unpushed_reset = false;
        Ok(())
    }

    /// Fast-forward from `origin`. "Nothing new" is a success.
    pub fn pull(&mut self) -> Result<PullOutcome> {
        let outcome = remote::pull(&self.repo, &self.url, &self.identity)?;
        self.pulled = true;
        Ok(outcome)
    }

    /// Number of commits reachable from `HEAD`; zero when `HEAD` is unborn.
    pub fn history_depth(&self) -> Result<usize> {
        let Some(head) = self.head_commit()? else {
            return Ok(0);
        };
        let mut walk = self
            .repo
            .revwalk()
            .map_err(|e| Error::git("start revwalk", e))?;
        walk.push(head).map_err(|e| Error::git("walk HEAD", e))?;

        let mut depth = 0;
        for oid in walk {
            oid.map_err(|e| Error::git("walk history", e))?;
            depth += 1;
        }
        Ok(depth)
    }

    /// The commit `HEAD` points at, if any.
    pub fn head_commit(&self) -> Result<Option<git2::Oid>> {
        match self.repo.head() {
            Ok(head) => Ok(head.target()),
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(Error::git("resolve HEAD", e)),
        }
    }
}

/// Classify the metadata directory, enforcing the existence guard.
fn inspect_metadata(store: &dyn Store, error_if_exists: bool) -> Result<Metadata> {
    let info = match store.stat(METADATA_DIR) {
        Ok(info) => info,
        Err(e) if e.is_not_found() => return Ok(Metadata::Absent),
        Err(e) => return Err(e.into()),
    };

    let path = store.root().join(METADATA_DIR);
    if !info.is_dir() {
        return Err(Error::CorruptRepository { path });
    }
    if error_if_exists {
        return Err(Error::AlreadyExists { path });
    }
    Ok(Metadata::Present)
}

fn clone_into(
    store: &dyn Store,
    url: &str,
    identity: &SshIdentity,
    cancel: &CancellationToken,
) -> Result<git2::Repository> {
    if cancel.is_cancelled() {
        return Err(Error::Canceled {
            url: url.to_string(),
        });
    }

    tracing::info!(url, root = %store.root().display(), "Cloning repository");

    match fetch_and_checkout(store.root(), url, identity, cancel) {
        Ok(repo) => {
            tracing::info!(url, "Clone complete");
            Ok(repo)
        }
        Err(e) => {
            if let Err(cleanup) = store.remove_all(METADATA_DIR) {
                tracing::warn!(error = %cleanup, "Failed to remove partial clone metadata");
            }
            if cancel.is_cancelled() {
                Err(Error::Canceled {
                    url: url.to_string(),
                })
            } else {
                Err(e)
            }
        }
    }
}

/// Clone over whatever already sits in `root`.
///
/// Files already present stay in place as untracked content unless the
/// remote tip would replace them, which fails with
/// [`Error::WouldOverwrite`].
fn fetch_and_checkout(
    root: &Path,
    url: &str,
    identity: &SshIdentity,
    cancel: &CancellationToken,
) -> Result<git2::Repository> {
    let repo = init_fresh(root, url)?;
    if let Some(tip) = remote::fetch(&repo, url, identity, Some(cancel))? {
        remote::checkout(&repo, tip)?;
        remote::advance_branch(&repo, tip, &format!("clone: from {url}"))?;
    }
    Ok(repo)
}

/// Directory the reset scratch dir is created in: the root's parent, so a
/// rename into the root stays on one file system.
fn staging_parent(root: &Path) -> PathBuf {
    match root.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => root.to_path_buf(),
    }
}

/// Point an unborn `HEAD` at `master` so commits land on the pushed branch.
fn ensure_branch_head(repo: &git2::Repository) -> Result<()> {
    match repo.head() {
        Ok(_) => Ok(()),
        Err(e)
            if e.code() == git2::ErrorCode::UnbornBranch
                || e.code() == git2::ErrorCode::NotFound =>
        {
            repo.set_head(BRANCH_REF)
                .map_err(|e| Error::git(format!("point HEAD at {BRANCH}"), e))
        }
        Err(e) => Err(Error::git("resolve HEAD", e)),
    }
}

/// Initialize an empty repository at `dir` with `origin` set to `url`.
fn init_fresh(dir: &Path, url: &str) -> Result<git2::Repository> {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head(BRANCH).no_reinit(true);

    let repo = git2::Repository::init_opts(dir, &opts)
        .map_err(|e| Error::git(format!("init repository at {}", dir.display()), e))?;
    repo.remote(REMOTE_NAME, url)
        .map_err(|e| Error::git(format!("add remote {REMOTE_NAME}"), e))?;
    Ok(repo)
}

/// Move `fresh` into `live`, parking the old metadata at `parked`.
fn swap_metadata(live: &Path, fresh: &Path, parked: &Path) -> Result<()> {
    let had_live = match std::fs::rename(live, parked) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(gitfs_store::Error::io(live, e).into()),
    };

    if let Err(e) = std::fs::rename(fresh, live) {
        if had_live
            && let Err(restore) = std::fs::rename(parked, live)
        {
            return Err(Error::ResetFailed {
                path: live.to_path_buf(),
                message: format!("swap failed ({e}) and restore failed ({restore})"),
            });
        }
        return Err(gitfs_store::Error::io(live, e).into());
    }
    Ok(())
}
