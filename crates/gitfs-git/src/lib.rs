//! Git plumbing for gitfs
//!
//! Binds a [`gitfs_store::Store`] to a git repository whose durable copy is a
//! remote reached over SSH. Covers bootstrap (open, clone, reset), the status
//! reconciler, and the stage/commit/push/pull primitives the sync engine
//! drives.

pub mod commit;
pub mod credential;
pub mod error;
pub mod remote;
pub mod repository;
pub mod status;

pub use credential::{CredentialProvider, KeyFileProvider, SshIdentity};
pub use error::{Error, Result};
pub use remote::{BRANCH, PullOutcome, REMOTE_NAME};
pub use repository::Repository;
pub use status::{FileState, StatusCode, StatusMap};
pub use tokio_util::sync::CancellationToken;
