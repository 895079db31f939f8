//! Backing store selection

use gitfs_store::{DiskStore, Store, VolatileStore};

use crate::config::{Config, StorageKind};
use crate::{Error, Result};

/// Build the store a validated [`Config`] asks for.
pub fn select_store(config: &Config) -> Result<Box<dyn Store>> {
    match (config.storage, &config.base_dir) {
        (StorageKind::Memory, _) => {
            let store = VolatileStore::new()?;
            tracing::debug!(root = %store.root().display(), "Using volatile store");
            Ok(Box::new(store))
        }
        (StorageKind::Disk, Some(base_dir)) => {
            tracing::debug!(root = %base_dir.display(), "Using disk store");
            Ok(Box::new(DiskStore::new(base_dir)))
        }
        (StorageKind::Disk, None) => Err(Error::config("disk storage requires a base directory")),
    }
}
