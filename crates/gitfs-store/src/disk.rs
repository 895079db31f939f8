//! Durable store rooted at a directory on disk

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::store::{FileInfo, OpenFlags, Store};
use crate::{Error, NormalizedPath, Result};

/// Store backed by ordinary files under `root`.
///
/// File handles are plain OS files; nothing is cached or buffered here.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Create a store rooted at `root`. The directory need not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a store-relative path to a native path under the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        Ok(NormalizedPath::new(path)?.to_native(&self.root))
    }

    fn ensure_parent(native: &Path) -> Result<()> {
        if let Some(parent) = native.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        Ok(())
    }

    fn entry_name(path: &str) -> Result<String> {
        Ok(NormalizedPath::new(path)?
            .file_name()
            .unwrap_or_default()
            .to_string())
    }
}

impl Store for DiskStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn open_file(&self, path: &str, flags: OpenFlags, perm: u32) -> Result<File> {
        let native = self.resolve(path)?;
        if flags.create {
            Self::ensure_parent(&native)?;
        }
        flags
            .to_open_options(perm)
            .open(&native)
            .map_err(|e| Error::io(&native, e))
    }

    fn stat(&self, path: &str) -> Result<FileInfo> {
        let native = self.resolve(path)?;
        let meta = fs::metadata(&native).map_err(|e| Error::io(&native, e))?;
        Ok(FileInfo::from_metadata(Self::entry_name(path)?, &meta))
    }

    fn lstat(&self, path: &str) -> Result<FileInfo> {
        let native = self.resolve(path)?;
        let meta = fs::symlink_metadata(&native).map_err(|e| Error::io(&native, e))?;
        Ok(FileInfo::from_metadata(Self::entry_name(path)?, &meta))
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let src = self.resolve(from)?;
        let dst = self.resolve(to)?;
        Self::ensure_parent(&dst)?;
        fs::rename(&src, &dst).map_err(|e| Error::io(&src, e))
    }

    fn remove(&self, path: &str) -> Result<()> {
        let native = self.resolve(path)?;
        let meta = fs::symlink_metadata(&native).map_err(|e| Error::io(&native, e))?;
        if meta.is_dir() {
            fs::remove_dir(&native).map_err(|e| Error::io(&native, e))
        } else {
            fs::remove_file(&native).map_err(|e| Error::io(&native, e))
        }
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        let native = self.resolve(path)?;
        let result = match fs::symlink_metadata(&native) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&native),
            Ok(_) => fs::remove_file(&native),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(&native, e)),
        }
    }

    fn read_dir(&self, path: &str) -> Result<Vec<FileInfo>> {
        let native = self.resolve(path)?;
        let mut entries = Vec::new();

        for entry in fs::read_dir(&native).map_err(|e| Error::io(&native, e))? {
            let entry = entry.map_err(|e| Error::io(&native, e))?;
            let entry_path = entry.path();
            let meta = fs::symlink_metadata(&entry_path).map_err(|e| Error::io(&entry_path, e))?;
            entries.push(FileInfo::from_metadata(
                entry.file_name().to_string_lossy(),
                &meta,
            ));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn mkdir_all(&self, path: &str, perm: u32) -> Result<()> {
        let native = self.resolve(path)?;
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(perm);
        }
        #[cfg(not(unix))]
        let _ = perm;

        builder.create(&native).map_err(|e| Error::io(&native, e))
    }

    #[cfg(unix)]
    fn symlink(&self, target: &str, link: &str) -> Result<()> {
        let native = self.resolve(link)?;
        Self::ensure_parent(&native)?;
        std::os::unix::fs::symlink(target, &native).map_err(|e| Error::io(&native, e))
    }

    #[cfg(not(unix))]
    fn symlink(&self, _target: &str, _link: &str) -> Result<()> {
        Err(Error::Unsupported {
            operation: "symlink".into(),
        })
    }

    fn read_link(&self, link: &str) -> Result<String> {
        let native = self.resolve(link)?;
        let target = fs::read_link(&native).map_err(|e| Error::io(&native, e))?;
        Ok(target.to_string_lossy().replace('\\', "/"))
    }

    fn temp_file(&self, dir: &str, prefix: &str) -> Result<(String, File)> {
        let dir_path = NormalizedPath::new(dir)?;
        let native_dir = dir_path.to_native(&self.root);
        fs::create_dir_all(&native_dir).map_err(|e| Error::io(&native_dir, e))?;

        let named = tempfile::Builder::new()
            .prefix(prefix)
            .tempfile_in(&native_dir)
            .map_err(|e| Error::io(&native_dir, e))?;
        let (file, native) = named.keep().map_err(|e| Error::io(&native_dir, e.error))?;

        let name = native
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok((dir_path.join(&name)?.as_str().to_string(), file))
    }

    fn chroot(&self, path: &str) -> Result<Box<dyn Store>> {
        Ok(Box::new(DiskStore::new(self.resolve(path)?)))
    }
}
