//! Status reconciliation
//!
//! git tracks two independent change dimensions per path: what is staged
//! and what differs in the working copy. Callers see exactly one
//! [`StatusCode`] per path, so the pair is collapsed with [`reconcile`].
//! Pairs that disagree collapse into [`StatusCode::Inconsistent`].

use std::collections::HashMap;
use std::fmt;

use git2::{Status, StatusOptions};
use gitfs_store::constants::is_metadata_dir;
use gitfs_store::{NormalizedPath, Store};

use crate::{Error, Result};

/// Repository-relative path (forward slashes, no leading slash) to status.
pub type StatusMap = HashMap<String, StatusCode>;

/// Raw per-path `(staging, worktree)` pairs as reported by git.
pub type RawStatus = HashMap<String, (FileState, FileState)>;

/// One dimension of a path's change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileState {
    Unmodified,
    Untracked,
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    UpdatedButUnmerged,
}

impl FileState {
    pub const ALL: [FileState; 8] = [
        FileState::Unmodified,
        FileState::Untracked,
        FileState::Modified,
        FileState::Added,
        FileState::Deleted,
        FileState::Renamed,
        FileState::Copied,
        FileState::UpdatedButUnmerged,
    ];

    /// The public code for this state taken on its own.
    pub const fn code(self) -> StatusCode {
        match self {
            FileState::Unmodified => StatusCode::Unmodified,
            FileState::Untracked => StatusCode::Untracked,
            FileState::Modified => StatusCode::Modified,
            FileState::Added => StatusCode::Added,
            FileState::Deleted => StatusCode::Deleted,
            FileState::Renamed => StatusCode::Renamed,
            FileState::Copied => StatusCode::Copied,
            FileState::UpdatedButUnmerged => StatusCode::UpdatedButUnmerged,
        }
    }
}

/// Observable status of a path, printed as a git short-status letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Unmodified,
    /// Staged and working-tree states disagree
    Inconsistent,
    Untracked,
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    UpdatedButUnmerged,
}

impl StatusCode {
    pub const fn as_char(self) -> char {
        match self {
            StatusCode::Unmodified => ' ',
            StatusCode::Inconsistent => '!',
            StatusCode::Untracked => '?',
            StatusCode::Modified => 'M',
            StatusCode::Added => 'A',
            StatusCode::Deleted => 'D',
            StatusCode::Renamed => 'R',
            StatusCode::Copied => 'C',
            StatusCode::UpdatedButUnmerged => 'U',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        let code = match c {
            ' ' => StatusCode::Unmodified,
            '!' => StatusCode::Inconsistent,
            '?' => StatusCode::Untracked,
            'M' => StatusCode::Modified,
            'A' => StatusCode::Added,
            'D' => StatusCode::Deleted,
            'R' => StatusCode::Renamed,
            'C' => StatusCode::Copied,
            'U' => StatusCode::UpdatedButUnmerged,
            _ => return None,
        };
        Some(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Split libgit2 status bits into `(staging, worktree)`.
///
/// Untracked paths report `Untracked` on both sides.
pub fn split_status(status: Status) -> (FileState, FileState) {
    if status.is_conflicted() {
        return (FileState::UpdatedButUnmerged, FileState::UpdatedButUnmerged);
    }

    let staging = if status.is_index_new() {
        FileState::Added
    } else if status.is_index_modified() || status.is_index_typechange() {
        FileState::Modified
    } else if status.is_index_deleted() {
        FileState::Deleted
    } else if status.is_index_renamed() {
        FileState::Renamed
    } else if status.is_wt_new() {
        FileState::Untracked
    } else {
        FileState::Unmodified
    };

    let worktree = if status.is_wt_new() {
        FileState::Untracked
    } else if status.is_wt_modified() || status.is_wt_typechange() {
        FileState::Modified
    } else if status.is_wt_deleted() {
        FileState::Deleted
    } else if status.is_wt_renamed() {
        FileState::Renamed
    } else {
        FileState::Unmodified
    };

    (staging, worktree)
}

/// Collapse a raw pair into the single observable code.
///
/// `None` means the path is left out of the status map.
pub fn reconcile(raw: Option<(FileState, FileState)>) -> Option<StatusCode> {
    let (staging, worktree) = raw?;
    match (staging, worktree) {
        (FileState::Unmodified, FileState::Unmodified) => None,
        (FileState::Unmodified, changed) => Some(changed.code()),
        (changed, FileState::Unmodified) => Some(changed.code()),
        (s, w) if s != w => Some(StatusCode::Inconsistent),
        (same, _) => Some(same.code()),
    }
}

/// Ask git for the raw pair of every changed path.
pub fn raw_statuses(repo: &git2::Repository) -> Result<RawStatus> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);

    let statuses = repo
        .statuses(Some(&mut opts))
        .map_err(|e| Error::git("read status", e))?;

    let mut raw = RawStatus::with_capacity(statuses.len());
    for entry in statuses.iter() {
        let Some(path) = entry.path() else {
            tracing::warn!("Skipping status entry with non UTF-8 path");
            continue;
        };
        raw.insert(path.to_string(), split_status(entry.status()));
    }
    Ok(raw)
}

/// Build the status map by walking the store and reconciling each file.
///
/// Only paths present in the store are reported, so deletions in the
/// working copy never appear.
pub fn collect(store: &dyn Store, raw: &RawStatus) -> Result<StatusMap> {
    let mut files = StatusMap::new();
    walk_files(store, &NormalizedPath::root(), &mut |path: &str| {
        if let Some(code) = reconcile(raw.get(path).copied()) {
            files.insert(path.to_string(), code);
        }
        Ok(())
    })?;
    Ok(files)
}

/// Depth-first, pre-order walk over every non-directory entry.
///
/// Metadata directories are skipped wherever they occur. Paths handed to
/// `visit` are store-relative with forward slashes.
pub fn walk_files(
    store: &dyn Store,
    dir: &NormalizedPath,
    visit: &mut dyn FnMut(&str) -> Result<()>,
) -> Result<()> {
    tracing::trace!(dir = %dir, "Traversing directory");

    for entry in store.read_dir(dir.as_str())? {
        if is_metadata_dir(&entry.name) {
            continue;
        }

        let path = dir.join(&entry.name)?;
        if entry.is_dir() {
            walk_files(store, &path, visit)?;
        } else {
            visit(path.as_str())?;
        }
    }
    Ok(())
}
