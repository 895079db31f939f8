//! Push and pull against the `origin` remote

use std::path::PathBuf;

use git2::build::CheckoutBuilder;
use git2::{FetchOptions, Oid, PushOptions, RemoteCallbacks, StatusOptions};
use tokio_util::sync::CancellationToken;

use crate::credential::SshIdentity;
use crate::{Error, Result};

/// Remote every repository is bound to.
pub const REMOTE_NAME: &str = "origin";

/// The only branch gitfs reads and writes.
pub const BRANCH: &str = "master";

pub(crate) const BRANCH_REF: &str = "refs/heads/master";
pub(crate) const TRACKING_REF: &str = "refs/remotes/origin/master";

/// What a pull did to the local branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// Nothing new upstream, or the remote branch does not exist yet
    UpToDate,
    FastForwarded { commit: String },
}

/// Remote callbacks that authenticate with `identity`.
///
/// libgit2 keeps asking for credentials while the server rejects them, so
/// only a single attempt is offered.
pub(crate) fn callbacks<'a>(identity: &SshIdentity) -> RemoteCallbacks<'a> {
    let identity = identity.clone();
    let mut attempted = false;

    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, _username_from_url, _allowed| {
        if attempted {
            return Err(git2::Error::from_str("SSH authentication rejected"));
        }
        attempted = true;
        identity.to_cred()
    });
    callbacks
}

/// Push `master` to `origin`.
///
/// Without `force` a remote that moved ahead is reported as
/// [`Error::DivergedHistory`]; with `force` the remote branch is replaced.
pub fn push(repo: &git2::Repository, url: &str, identity: &SshIdentity, force: bool) -> Result<()> {
    let mut remote = repo
        .find_remote(REMOTE_NAME)
        .map_err(|e| Error::git(format!("find remote {REMOTE_NAME}"), e))?;

    let refspec = if force {
        format!("+{BRANCH_REF}:{BRANCH_REF}")
    } else {
        format!("{BRANCH_REF}:{BRANCH_REF}")
    };

    let mut rejection: Option<String> = None;
    {
        let mut callbacks = callbacks(identity);
        callbacks.push_update_reference(|refname, status| {
            if let Some(message) = status {
                rejection = Some(format!("{refname}: {message}"));
            }
            Ok(())
        });

        let mut opts = PushOptions::new();
        opts.remote_callbacks(callbacks);
        remote
            .push(&[refspec.as_str()], Some(&mut opts))
            .map_err(|e| Error::transport("push", url, e))?;
    }

    if let Some(message) = rejection {
        tracing::warn!(url, %message, "Remote rejected push");
        return Err(classify_rejection(url, message));
    }

    tracing::info!(url, force, "Pushed {BRANCH}");
    Ok(())
}

fn classify_rejection(url: &str, message: String) -> Error {
    let lowered = message.to_lowercase();
    if lowered.contains("non-fast-forward") || lowered.contains("fetch first") {
        Error::DivergedHistory {
            url: url.to_string(),
            message,
        }
    } else {
        Error::Transport {
            operation: "push".into(),
            url: url.to_string(),
            source: git2::Error::from_str(&message),
        }
    }
}

/// Fetch `master` from `origin` into the tracking ref.
///
/// Returns the fetched tip, or `None` when the remote has no `master` yet.
/// With `cancel`, the transfer stops once the token fires.
pub(crate) fn fetch(
    repo: &git2::Repository,
    url: &str,
    identity: &SshIdentity,
    cancel: Option<&CancellationToken>,
) -> Result<Option<Oid>> {
    let mut remote = repo
        .find_remote(REMOTE_NAME)
        .map_err(|e| Error::git(format!("find remote {REMOTE_NAME}"), e))?;

    let mut callbacks = callbacks(identity);
    if let Some(token) = cancel.cloned() {
        callbacks.transfer_progress(move |progress| {
            tracing::trace!(
                received = progress.received_objects(),
                total = progress.total_objects(),
                "Fetch progress"
            );
            !token.is_cancelled()
        });
    }

    let mut opts = FetchOptions::new();
    opts.remote_callbacks(callbacks);
    let refspec = format!("+{BRANCH_REF}:{TRACKING_REF}");
    remote
        .fetch(&[refspec.as_str()], Some(&mut opts), None)
        .map_err(|e| Error::transport("fetch", url, e))?;

    match repo.find_reference(TRACKING_REF) {
        Ok(reference) => {
            let commit = reference
                .peel_to_commit()
                .map_err(|e| Error::git(format!("resolve {TRACKING_REF}"), e))?;
            Ok(Some(commit.id()))
        }
        Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
        Err(e) => Err(Error::git(format!("resolve {TRACKING_REF}"), e)),
    }
}

/// Check out `commit` without touching files git does not know to be safe.
///
/// Untracked files in the way and locally modified tracked files make the
/// checkout fail with [`Error::WouldOverwrite`] before anything is written.
pub(crate) fn checkout(repo: &git2::Repository, commit: Oid) -> Result<()> {
    let target = repo
        .find_commit(commit)
        .map_err(|e| Error::git(format!("find commit {commit}"), e))?;

    let mut builder = CheckoutBuilder::new();
    builder.safe();
    repo.checkout_tree(target.as_object(), Some(&mut builder))
        .map_err(|e| {
            if e.code() == git2::ErrorCode::Conflict {
                Error::WouldOverwrite {
                    path: workdir(repo),
                    message: e.message().to_string(),
                }
            } else {
                Error::git(format!("checkout {commit}"), e)
            }
        })
}

/// Point `master` (and `HEAD`) at `commit`.
pub(crate) fn advance_branch(repo: &git2::Repository, commit: Oid, reason: &str) -> Result<()> {
    repo.reference(BRANCH_REF, commit, true, reason)
        .map_err(|e| Error::git(format!("update {BRANCH_REF}"), e))?;
    repo.set_head(BRANCH_REF)
        .map_err(|e| Error::git("set HEAD", e))?;
    Ok(())
}

/// Tracked paths whose index or working copy differs from `HEAD`.
fn unsynced_changes(repo: &git2::Repository) -> Result<Vec<String>> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(false).include_ignored(false);
    let statuses = repo
        .statuses(Some(&mut opts))
        .map_err(|e| Error::git("read status", e))?;

    let mut changed: Vec<String> = statuses
        .iter()
        .filter(|entry| !entry.status().is_empty())
        .filter_map(|entry| entry.path().map(str::to_string))
        .collect();
    changed.sort();
    Ok(changed)
}

fn workdir(repo: &git2::Repository) -> PathBuf {
    repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf()
}

/// Fetch `master` from `origin` and fast-forward the local branch.
///
/// A dirty working copy is never overwritten: unsynced changes to tracked
/// files, or untracked files the new tip would replace, fail with
/// [`Error::WouldOverwrite`] and leave the branch where it was. A remote
/// that cannot be fast-forwarded to is [`Error::DivergedHistory`].
pub fn pull(repo: &git2::Repository, url: &str, identity: &SshIdentity) -> Result<PullOutcome> {
    let Some(fetched) = fetch(repo, url, identity, None)? else {
        tracing::debug!(url, "Remote has no {BRANCH} branch yet");
        return Ok(PullOutcome::UpToDate);
    };

    let annotated = repo
        .find_annotated_commit(fetched)
        .map_err(|e| Error::git("annotate fetched commit", e))?;
    let (analysis, _) = repo
        .merge_analysis(&[&annotated])
        .map_err(|e| Error::git("merge analysis", e))?;

    if analysis.is_up_to_date() {
        return Ok(PullOutcome::UpToDate);
    }

    if analysis.is_fast_forward() || analysis.is_unborn() {
        let changed = unsynced_changes(repo)?;
        if !changed.is_empty() {
            tracing::warn!(url, changed = changed.len(), "Refusing to pull over unsynced changes");
            return Err(Error::WouldOverwrite {
                path: workdir(repo),
                message: format!("unsynced changes to {}", changed.join(", ")),
            });
        }

        checkout(repo, fetched)?;
        advance_branch(repo, fetched, &format!("pull: fast-forward to {fetched}"))?;

        tracing::info!(url, commit = %fetched, "Fast-forwarded {BRANCH}");
        return Ok(PullOutcome::FastForwarded {
            commit: fetched.to_string(),
        });
    }

    let head = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .map(|c| c.id().to_string())
        .unwrap_or_else(|_| "HEAD".to_string());
    Err(Error::DivergedHistory {
        url: url.to_string(),
        message: format!("cannot fast-forward {BRANCH} from {head} to {fetched}"),
    })
}
