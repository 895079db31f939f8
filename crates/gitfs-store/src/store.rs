//! The backing store trait and its metadata types

use std::fs::{self, File};
use std::path::Path;
use std::time::SystemTime;

use crate::{NormalizedPath, Result};

/// Kind of store entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
}

/// Metadata for a single store entry.
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Name of the entry (not full path). Empty for the store root.
    pub name: String,
    pub kind: FileKind,
    /// Size in bytes
    pub size: u64,
    pub modified: Option<SystemTime>,
    /// Unix permission bits, if available
    pub permissions: Option<u32>,
}

impl FileInfo {
    pub(crate) fn from_metadata(name: impl Into<String>, meta: &fs::Metadata) -> Self {
        let file_type = meta.file_type();
        let kind = if file_type.is_symlink() {
            FileKind::Symlink
        } else if file_type.is_dir() {
            FileKind::Directory
        } else {
            FileKind::File
        };

        Self {
            name: name.into(),
            kind,
            size: meta.len(),
            modified: meta.modified().ok(),
            permissions: permission_bits(meta),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn permission_bits(_meta: &fs::Metadata) -> Option<u32> {
    None
}

/// Flags for [`Store::open_file`], modelled on `open(2)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub create: bool,
    pub truncate: bool,
    /// Fail if the file already exists (requires `create`)
    pub exclusive: bool,
}

impl OpenFlags {
    pub const READ_ONLY: Self = Self {
        read: true,
        write: false,
        append: false,
        create: false,
        truncate: false,
        exclusive: false,
    };

    pub const WRITE_ONLY: Self = Self {
        read: false,
        write: true,
        append: false,
        create: false,
        truncate: false,
        exclusive: false,
    };

    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
        append: false,
        create: false,
        truncate: false,
        exclusive: false,
    };

    pub const fn with_create(mut self) -> Self {
        self.create = true;
        self
    }

    pub const fn with_truncate(mut self) -> Self {
        self.truncate = true;
        self
    }

    pub const fn with_append(mut self) -> Self {
        self.append = true;
        self
    }

    pub const fn with_exclusive(mut self) -> Self {
        self.create = true;
        self.exclusive = true;
        self
    }

    /// Translate into `std` open options, applying `perm` to newly created files.
    pub(crate) fn to_open_options(self, perm: u32) -> fs::OpenOptions {
        let mut opts = fs::OpenOptions::new();
        opts.read(self.read)
            .write(self.write)
            .append(self.append)
            .truncate(self.truncate);
        if self.exclusive {
            opts.create_new(true);
        } else {
            opts.create(self.create);
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(perm);
        }
        #[cfg(not(unix))]
        let _ = perm;

        opts
    }
}

/// Path-addressable byte storage with directory listing.
///
/// All paths are relative to the store root; a leading `/` is ignored and
/// `..` may not climb above the root. Implementations are polymorphic over
/// this capability set so the git layer never needs to know which one it
/// is driving.
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Native directory backing the store root.
    fn root(&self) -> &Path;

    /// Open a file with explicit flags and permission bits.
    ///
    /// Parent directories are created when `flags.create` is set.
    fn open_file(&self, path: &str, flags: OpenFlags, perm: u32) -> Result<File>;

    /// Metadata, following symlinks.
    fn stat(&self, path: &str) -> Result<FileInfo>;

    /// Metadata, without following symlinks.
    fn lstat(&self, path: &str) -> Result<FileInfo>;

    /// Move `from` to `to`, replacing a non-directory target.
    fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Remove a file or an empty directory.
    fn remove(&self, path: &str) -> Result<()>;

    /// Remove a path and everything below it. Missing paths are not an error.
    fn remove_all(&self, path: &str) -> Result<()>;

    /// List a directory, sorted by name. Entries are not followed through symlinks.
    fn read_dir(&self, path: &str) -> Result<Vec<FileInfo>>;

    /// Create a directory and any missing parents.
    fn mkdir_all(&self, path: &str, perm: u32) -> Result<()>;

    /// Create `link` pointing at `target`. The target is stored verbatim.
    fn symlink(&self, target: &str, link: &str) -> Result<()>;

    fn read_link(&self, link: &str) -> Result<String>;

    /// Create a uniquely named file in `dir` whose name starts with `prefix`.
    ///
    /// Returns the store-relative path alongside the open handle. The file is
    /// not removed automatically.
    fn temp_file(&self, dir: &str, prefix: &str) -> Result<(String, File)>;

    /// A view of this store rooted at `path`.
    fn chroot(&self, path: &str) -> Result<Box<dyn Store>>;

    /// Create or truncate a file for reading and writing (mode `0o666`).
    fn create(&self, path: &str) -> Result<File> {
        self.open_file(
            path,
            OpenFlags::READ_WRITE.with_create().with_truncate(),
            0o666,
        )
    }

    /// Open a file read-only.
    fn open(&self, path: &str) -> Result<File> {
        self.open_file(path, OpenFlags::READ_ONLY, 0)
    }

    /// Join path elements into a normalized store-relative path.
    ///
    /// Empty elements are ignored. A result that would climb above the root
    /// is returned unnormalized so the next operation on it fails.
    fn join(&self, elems: &[&str]) -> String {
        let joined = elems
            .iter()
            .filter(|e| !e.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("/");
        match NormalizedPath::new(&joined) {
            Ok(path) => path.as_str().to_string(),
            Err(_) => joined,
        }
    }

    /// Whether `path` exists. Errors other than not-found are propagated.
    fn exists(&self, path: &str) -> Result<bool> {
        match self.stat(path) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
