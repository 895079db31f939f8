//! Reserved names inside a backing store.

/// Top-level directory holding all repository metadata.
///
/// Everything else under a store root is caller-visible content.
pub const METADATA_DIR: &str = ".git";

/// Prefix for the scratch directory backing a [`crate::VolatileStore`].
pub const VOLATILE_PREFIX: &str = "gitfs-mem-";

/// Returns true if `name` is the reserved metadata directory name.
pub fn is_metadata_dir(name: &str) -> bool {
    name == METADATA_DIR
}
