//! Staging and committing the working copy

use chrono::{DateTime, Local, SecondsFormat};
use git2::{IndexAddOption, Oid, Signature, Time};

use crate::{Error, Result};

/// Author and committer name on every sync commit.
pub const AUTHOR_NAME: &str = "gitfs";
pub const AUTHOR_EMAIL: &str = "gitfs@github.com";

/// Stage every change under the root, deletions included.
pub fn stage_all(repo: &git2::Repository) -> Result<()> {
    let mut index = repo.index().map_err(|e| Error::git("open index", e))?;
    index
        .add_all(["*"], IndexAddOption::DEFAULT, None)
        .map_err(|e| Error::git("stage new and modified files", e))?;
    index
        .update_all(["*"], None)
        .map_err(|e| Error::git("stage deleted files", e))?;
    index.write().map_err(|e| Error::git("write index", e))?;
    Ok(())
}

/// Human-readable sync message stamped with `when` (RFC 3339, `Z` for UTC).
pub fn sync_message(when: DateTime<Local>) -> String {
    format!(
        "gitfs sync - {}",
        when.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Commit the index onto `HEAD` with the gitfs identity.
///
/// An unborn `HEAD` produces a root commit.
pub fn commit(repo: &git2::Repository, message: &str, when: DateTime<Local>) -> Result<Oid> {
    let mut index = repo.index().map_err(|e| Error::git("open index", e))?;
    let tree_id = index.write_tree().map_err(|e| Error::git("write tree", e))?;
    let tree = repo
        .find_tree(tree_id)
        .map_err(|e| Error::git("find tree", e))?;

    let time = Time::new(when.timestamp(), when.offset().local_minus_utc() / 60);
    let signature = Signature::new(AUTHOR_NAME, AUTHOR_EMAIL, &time)
        .map_err(|e| Error::git("build signature", e))?;

    let parent = match repo.head() {
        Ok(head) => Some(
            head.peel_to_commit()
                .map_err(|e| Error::git("resolve HEAD", e))?,
        ),
        Err(e)
            if e.code() == git2::ErrorCode::UnbornBranch
                || e.code() == git2::ErrorCode::NotFound =>
        {
            None
        }
        Err(e) => return Err(Error::git("resolve HEAD", e)),
    };
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    let oid = repo
        .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .map_err(|e| Error::git("commit", e))?;

    tracing::debug!(%oid, parents = parents.len(), "Created commit");
    Ok(oid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sync_message_embeds_timestamp() {
        let when = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let message = sync_message(when);

        assert!(message.starts_with("gitfs sync - 2024-03-09T14:05:07"));
        // Offset is either Z or +hh:mm / -hh:mm
        let suffix = &message["gitfs sync - 2024-03-09T14:05:07".len()..];
        assert!(suffix == "Z" || suffix.len() == 6, "unexpected offset {suffix}");
    }

    #[test]
    fn first_commit_has_no_parent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("a.txt"), "A").unwrap();

        stage_all(&repo).unwrap();
        let oid = commit(&repo, "first", Local::now()).unwrap();

        let created = repo.find_commit(oid).unwrap();
        assert_eq!(created.parent_count(), 0);
        assert_eq!(created.author().name(), Some(AUTHOR_NAME));
        assert_eq!(created.author().email(), Some(AUTHOR_EMAIL));
    }

    #[test]
    fn stage_all_records_deletions() {
        let dir = tempfile::tempdir().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("gone.txt"), "bye").unwrap();
        stage_all(&repo).unwrap();
        commit(&repo, "add", Local::now()).unwrap();

        std::fs::remove_file(dir.path().join("gone.txt")).unwrap();
        stage_all(&repo).unwrap();
        let oid = commit(&repo, "remove", Local::now()).unwrap();

        let tree = repo.find_commit(oid).unwrap().tree().unwrap();
        assert!(tree.get_name("gone.txt").is_none());
        assert_eq!(repo.find_commit(oid).unwrap().parent_count(), 1);
    }
}
