//! A file-system API whose durable backing store is a remote git repository
//!
//! Callers read and write files through [`GitFs`] as if it were ordinary
//! storage. [`GitFs::sync`] turns the working copy into a commit and pushes
//! it; [`GitFs::pull`] fast-forwards from the remote.
//!
//! # Architecture
//!
//! ```text
//!                 gitfs-core
//!                     |
//!              +------+------+
//!              |             |
//!          gitfs-git -> gitfs-store
//! ```
//!
//! # Example
//!
//! ```no_run
//! use gitfs_core::{CancellationToken, Config, GitFs};
//! use std::io::Write;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new()
//!         .with_url("git@github.com:team/data.git")
//!         .use_memory();
//!     let mut fs = GitFs::open(&CancellationToken::new(), config)?;
//!     fs.create("notes.txt")?.write_all(b"hello")?;
//!     fs.sync(false)?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod fs;
pub mod logging;
pub mod sync;

pub use backend::select_store;
pub use config::{Config, StorageKind};
pub use error::{Error, Result};
pub use fs::GitFs;
pub use gitfs_git::{
    CancellationToken, CredentialProvider, KeyFileProvider, PullOutcome, SshIdentity, StatusCode,
    StatusMap,
};
pub use gitfs_store::{FileInfo, FileKind, OpenFlags, Store};
