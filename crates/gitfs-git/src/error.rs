//! Error types for gitfs-git

use std::path::PathBuf;

/// Result type for gitfs-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gitfs-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error during {operation}: {source}")]
    Git {
        operation: String,
        #[source]
        source: git2::Error,
    },

    #[error(transparent)]
    Store(#[from] gitfs_store::Error),

    #[error("Cannot load SSH identity from {path}: {message}")]
    Credential { path: PathBuf, message: String },

    #[error("Repository metadata at {path} is not a directory")]
    CorruptRepository { path: PathBuf },

    #[error("Repository already exists at {path}")]
    AlreadyExists { path: PathBuf },

    #[error("Transport failure during {operation} with {url}: {source}")]
    Transport {
        operation: String,
        url: String,
        #[source]
        source: git2::Error,
    },

    #[error("Remote {url} has diverged ({message}). Manual reconciliation required.")]
    DivergedHistory { url: String, message: String },

    #[error("Checkout into {path} would overwrite local files: {message}")]
    WouldOverwrite { path: PathBuf, message: String },

    #[error("Clone of {url} was canceled")]
    Canceled { url: String },

    #[error("Reset of {path} left no usable repository: {message}")]
    ResetFailed { path: PathBuf, message: String },
}

impl Error {
    pub(crate) fn git(operation: impl Into<String>, source: git2::Error) -> Self {
        Self::Git {
            operation: operation.into(),
            source,
        }
    }

    /// Classify a remote failure. Non-fast-forward rejections become
    /// [`Error::DivergedHistory`]; everything else is a transport error.
    pub(crate) fn transport(
        operation: impl Into<String>,
        url: impl Into<String>,
        source: git2::Error,
    ) -> Self {
        if source.code() == git2::ErrorCode::NotFastForward {
            return Self::DivergedHistory {
                url: url.into(),
                message: source.message().to_string(),
            };
        }
        Self::Transport {
            operation: operation.into(),
            url: url.into(),
            source,
        }
    }

    /// True when the remote advanced and needs manual reconciliation.
    pub fn is_diverged(&self) -> bool {
        matches!(self, Self::DivergedHistory { .. })
    }

    /// True when a checkout was refused to protect unsynced local files.
    pub fn is_would_overwrite(&self) -> bool {
        matches!(self, Self::WouldOverwrite { .. })
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_fast_forward_is_diverged() {
        let source = git2::Error::new(
            git2::ErrorCode::NotFastForward,
            git2::ErrorClass::Reference,
            "cannot push non-fastforwardable reference",
        );
        let err = Error::transport("push", "git@example.com:a/b.git", source);
        assert!(err.is_diverged());
        assert!(err.to_string().contains("git@example.com:a/b.git"));
    }

    #[test]
    fn other_codes_are_transport() {
        let source = git2::Error::from_str("connection reset");
        let err = Error::transport("fetch", "git@example.com:a/b.git", source);
        assert!(matches!(err, Error::Transport { .. }));
        assert!(!err.is_diverged());
    }
}
