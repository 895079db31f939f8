//! Volatile store that lives only as long as the process holds it

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use crate::constants::VOLATILE_PREFIX;
use crate::store::{FileInfo, OpenFlags, Store};
use crate::{DiskStore, Error, Result};

/// Store for the `memory` storage kind.
///
/// Contents live in a private scratch directory under the system temp dir
/// and are deleted once the last view of the store (chroot views included)
/// is dropped. No persistence is promised beyond that.
#[derive(Debug, Clone)]
pub struct VolatileStore {
    scratch: Arc<TempDir>,
    view: DiskStore,
}

impl VolatileStore {
    pub fn new() -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix(VOLATILE_PREFIX)
            .tempdir()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;
        tracing::debug!(root = %scratch.path().display(), "Created volatile store");

        let view = DiskStore::new(scratch.path());
        Ok(Self {
            scratch: Arc::new(scratch),
            view,
        })
    }
}

impl Store for VolatileStore {
    fn root(&self) -> &Path {
        self.view.root()
    }

    fn open_file(&self, path: &str, flags: OpenFlags, perm: u32) -> Result<File> {
        self.view.open_file(path, flags, perm)
    }

    fn stat(&self, path: &str) -> Result<FileInfo> {
        self.view.stat(path)
    }

    fn lstat(&self, path: &str) -> Result<FileInfo> {
        self.view.lstat(path)
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.view.rename(from, to)
    }

    fn remove(&self, path: &str) -> Result<()> {
        self.view.remove(path)
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        self.view.remove_all(path)
    }

    fn read_dir(&self, path: &str) -> Result<Vec<FileInfo>> {
        self.view.read_dir(path)
    }

    fn mkdir_all(&self, path: &str, perm: u32) -> Result<()> {
        self.view.mkdir_all(path, perm)
    }

    fn symlink(&self, target: &str, link: &str) -> Result<()> {
        self.view.symlink(target, link)
    }

    fn read_link(&self, link: &str) -> Result<String> {
        self.view.read_link(link)
    }

    fn temp_file(&self, dir: &str, prefix: &str) -> Result<(String, File)> {
        self.view.temp_file(dir, prefix)
    }

    fn chroot(&self, path: &str) -> Result<Box<dyn Store>> {
        // The sub-view keeps the scratch directory alive.
        Ok(Box::new(Self {
            scratch: Arc::clone(&self.scratch),
            view: DiskStore::new(self.view.resolve(path)?),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_is_removed_on_drop() {
        let store = VolatileStore::new().unwrap();
        store.create("file.txt").unwrap();
        let root = store.root().to_path_buf();
        assert!(root.exists());

        drop(store);
        assert!(!root.exists());
    }

    #[test]
    fn chroot_view_outlives_parent() {
        let store = VolatileStore::new().unwrap();
        store.mkdir_all("sub", 0o755).unwrap();
        let sub = store.chroot("sub").unwrap();
        let root = store.root().to_path_buf();
        drop(store);

        assert!(root.exists());
        sub.create("inner.txt").unwrap();
        assert!(sub.exists("inner.txt").unwrap());
    }
}
