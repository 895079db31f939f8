//! The write path: optional purge, stage, commit, push

use gitfs_git::Repository;

use crate::Result;

/// Capture every local change in one commit and push it.
///
/// Stops at the first failing stage. A failed push leaves the commit in
/// place locally; [`crate::GitFs::push`] retries it without a new commit.
/// The remote is overwritten by the push following a purge, including a
/// retry after that push failed.
pub fn sync(repo: &mut Repository, purge: bool) -> Result<()> {
    let url = repo.url().to_string();

    if purge {
        tracing::info!(url = %url, "Purging history before sync");
        repo.reset()?;
    }

    repo.stage_all()?;
    tracing::debug!(url = %url, "Staged working copy");

    let commit = repo.commit()?;
    tracing::debug!(url = %url, %commit, "Committed working copy");

    // History was replaced, so the remote branch can only be overwritten.
    repo.push(purge)?;
    tracing::info!(url = %url, %commit, purge, "Sync complete");
    Ok(())
}
