//! Backing stores for gitfs
//!
//! Provides a path-addressable byte store with directory listing, in a
//! durable disk-rooted flavor and a volatile process-lifetime flavor.

pub mod constants;
pub mod disk;
pub mod error;
pub mod path;
pub mod store;
pub mod volatile;

pub use constants::METADATA_DIR;
pub use disk::DiskStore;
pub use error::{Error, Result};
pub use path::NormalizedPath;
pub use store::{FileInfo, FileKind, OpenFlags, Store};
pub use volatile::VolatileStore;
