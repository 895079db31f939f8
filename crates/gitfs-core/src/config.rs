//! Session configuration
//!
//! A [`Config`] names the remote and the kind of backing store. It is built
//! once, validated, and then handed to [`crate::GitFs::open`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Which backing store holds the working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Private scratch directory removed when the session ends
    #[default]
    Memory,
    /// Durable directory supplied by the caller
    Disk,
}

/// Remote, store and credential settings for one session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub url: String,
    pub storage: StorageKind,
    pub base_dir: Option<PathBuf>,
    /// Reopen a repository already present under `base_dir` instead of failing
    pub open_existing: bool,
    /// Private key file; `~/.ssh/id_rsa` when unset
    pub identity_file: Option<PathBuf>,
    /// Refuse to sync until a pull has succeeded on the handle
    pub require_pull: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Keep the working copy in a volatile store.
    pub fn use_memory(mut self) -> Self {
        self.storage = StorageKind::Memory;
        self.base_dir = None;
        self.open_existing = false;
        self
    }

    /// Keep the working copy under `base_dir`.
    pub fn use_disk(mut self, base_dir: impl Into<PathBuf>, open_existing: bool) -> Self {
        self.storage = StorageKind::Disk;
        self.base_dir = Some(base_dir.into());
        self.open_existing = open_existing;
        self
    }

    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    pub fn require_pull_before_sync(mut self, require: bool) -> Self {
        self.require_pull = require;
        self
    }

    /// Read a TOML configuration file. The result is not validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Trim and check the configuration.
    ///
    /// The URL must be non-empty. A disk store needs a base directory and a
    /// memory store must not have one.
    pub fn validate(mut self) -> Result<Self> {
        self.url = self.url.trim().to_string();
        if self.url.is_empty() {
            return Err(Error::config("remote URL is required"));
        }

        self.base_dir = self
            .base_dir
            .take()
            .map(|dir| trimmed_path(&dir))
            .filter(|dir| !dir.as_os_str().is_empty());

        match (self.storage, &self.base_dir) {
            (StorageKind::Memory, Some(dir)) => Err(Error::config(format!(
                "memory storage cannot use base directory {}",
                dir.display()
            ))),
            (StorageKind::Disk, None) => Err(Error::config("disk storage requires a base directory")),
            _ => Ok(self),
        }
    }

    /// Whether bootstrap must refuse existing repository metadata.
    pub(crate) fn error_if_exists(&self) -> bool {
        !self.open_existing
    }
}

fn trimmed_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(s.trim()),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const URL: &str = "git@github.com:team/data.git";

    #[test]
    fn builder_switches_storage() {
        let config = Config::new()
            .with_url(URL)
            .use_disk("/srv/data", true)
            .use_memory();
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.base_dir, None);
        assert!(!config.open_existing);
    }

    #[rstest]
    #[case::memory(Config::new().with_url(URL).use_memory(), true)]
    #[case::disk(Config::new().with_url(URL).use_disk("/srv/data", false), true)]
    #[case::missing_url(Config::new().use_memory(), false)]
    #[case::blank_url(Config::new().with_url("   ").use_memory(), false)]
    #[case::disk_without_dir(Config { url: URL.into(), storage: StorageKind::Disk, ..Config::default() }, false)]
    #[case::disk_blank_dir(Config::new().with_url(URL).use_disk("  ", false), false)]
    #[case::memory_with_dir(Config { url: URL.into(), base_dir: Some("/srv".into()), ..Config::default() }, false)]
    fn validation(#[case] config: Config, #[case] ok: bool) {
        assert_eq!(config.validate().is_ok(), ok);
    }

    #[test]
    fn validate_trims_fields() {
        let config = Config::new()
            .with_url(format!("  {URL}\n"))
            .use_disk(" /srv/data ", false)
            .validate()
            .unwrap();
        assert_eq!(config.url, URL);
        assert_eq!(config.base_dir, Some(PathBuf::from("/srv/data")));
    }

    #[test]
    fn open_existing_lifts_guard() {
        assert!(Config::new().use_memory().error_if_exists());
        assert!(!Config::new().use_disk("/srv", true).error_if_exists());
    }

    #[test]
    fn load_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitfs.toml");
        std::fs::write(
            &path,
            r#"
url = "git@github.com:team/data.git"
storage = "disk"
base_dir = "/srv/data"
open_existing = true
require_pull = true
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap().validate().unwrap();
        assert_eq!(config.storage, StorageKind::Disk);
        assert_eq!(config.base_dir, Some(PathBuf::from("/srv/data")));
        assert!(config.open_existing);
        assert!(config.require_pull);
        assert_eq!(config.identity_file, None);
    }

    #[test]
    fn load_missing_file_fails() {
        let err = Config::load(Path::new("/nonexistent/gitfs.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn load_rejects_unknown_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitfs.toml");
        std::fs::write(&path, "url = \"x\"\nstorage = \"tape\"\n").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::TomlDe(_))));
    }
}
