//! Error types for gitfs-store

use std::io;
use std::path::PathBuf;

/// Result type for gitfs-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gitfs-store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Path escapes store root: {path}")]
    PathEscapesRoot { path: String },

    #[error("Operation '{operation}' not supported on this platform")]
    Unsupported { operation: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The underlying I/O error kind, if this error came from the OS.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            Self::PathEscapesRoot { .. } => Some(io::ErrorKind::PermissionDenied),
            Self::Unsupported { .. } => Some(io::ErrorKind::Unsupported),
        }
    }

    /// True when the target path does not exist.
    pub fn is_not_found(&self) -> bool {
        self.io_kind() == Some(io::ErrorKind::NotFound)
    }
}
