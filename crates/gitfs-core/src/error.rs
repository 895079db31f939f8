//! Error types for gitfs-core

use std::path::PathBuf;

/// Result type for gitfs-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gitfs-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration fields are missing or contradict each other
    #[error("Invalid configuration: {message}")]
    ConfigValidation { message: String },

    /// Configuration file could not be read
    #[error("Cannot read configuration at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sync attempted before any pull while the pull gate is enabled
    #[error("Sync of {url} requires a successful pull first")]
    PullRequired { url: String },

    // Transparent wrappers for underlying crate errors
    /// Git error from gitfs-git
    #[error(transparent)]
    Git(#[from] gitfs_git::Error),

    /// Store error from gitfs-store
    #[error(transparent)]
    Store(#[from] gitfs_store::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// True for a missing path in the backing store, wherever it surfaced.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Store(e) => e.is_not_found(),
            Self::Git(gitfs_git::Error::Store(e)) => e.is_not_found(),
            _ => false,
        }
    }

    /// True when the remote advanced and needs manual reconciliation.
    pub fn is_diverged(&self) -> bool {
        matches!(self, Self::Git(e) if e.is_diverged())
    }
}
