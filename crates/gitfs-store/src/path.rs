//! Store-relative path handling

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// A path relative to a store root, normalized to forward slashes.
///
/// Leading separators are dropped, `.` segments vanish and `..` segments
/// pop their parent. A `..` that would climb above the root is rejected, so
/// every `NormalizedPath` stays inside the store it is resolved against.
/// The root itself is the empty path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes, no leading slash
    inner: String,
}

impl NormalizedPath {
    /// The store root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse any path-like input into a store-relative path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let raw = path.as_ref().to_string_lossy().replace('\\', "/");
        let mut segments: Vec<&str> = Vec::new();

        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(Error::PathEscapesRoot { path: raw.clone() });
                    }
                }
                other => segments.push(other),
            }
        }

        Ok(Self {
            inner: segments.join("/"),
        })
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn is_root(&self) -> bool {
        self.inner.is_empty()
    }

    /// Resolve against a native root directory for I/O.
    pub fn to_native(&self, root: &Path) -> PathBuf {
        if self.is_root() {
            root.to_path_buf()
        } else {
            self.inner.split('/').fold(root.to_path_buf(), |acc, s| acc.join(s))
        }
    }

    /// Join this path with a relative segment.
    pub fn join(&self, segment: &str) -> Result<Self> {
        if self.is_root() {
            Self::new(segment)
        } else {
            Self::new(format!("{}/{}", self.inner, segment))
        }
    }

    /// Get the parent directory, `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.inner.rfind('/') {
            Some(idx) => Some(Self {
                inner: self.inner[..idx].to_string(),
            }),
            None => Some(Self::root()),
        }
    }

    /// Get the final path component.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.inner.rsplit('/').next()
        }
    }

    /// Iterate over the path components.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.inner.split('/').filter(|s| !s.is_empty())
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.inner)
    }
}

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}
