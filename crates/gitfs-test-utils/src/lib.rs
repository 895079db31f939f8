//! Shared test utilities for the gitfs workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`remote`]: bare repositories standing in for the SSH remote
//! - [`identity`]: throwaway private key material

pub mod identity;
pub mod remote;

pub use identity::{FAKE_PRIVATE_KEY, write_fake_key};
pub use remote::BareRemote;
