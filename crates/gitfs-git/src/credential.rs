//! SSH identity resolution
//!
//! Remote authentication always uses a private key bound to the
//! conventional `git` user. Where the key comes from is injected through
//! [`CredentialProvider`] rather than looked up ambiently, so tests and
//! callers juggling several identities can supply their own.

use std::fmt;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::{Error, Result};

/// Remote user name every SSH identity authenticates as.
pub const REMOTE_USER: &str = "git";

/// Key file location relative to the home directory.
pub const DEFAULT_KEY_FILE: &str = ".ssh/id_rsa";

/// Signing material for remote operations.
#[derive(Clone)]
pub struct SshIdentity {
    user: String,
    private_key: String,
}

impl SshIdentity {
    /// Build an identity from an armored private key.
    ///
    /// The armor is decoded and the key structure checked, so a key that
    /// cannot be parsed fails here rather than at the first remote call.
    /// `origin` names where the key came from and only appears in errors.
    pub fn from_private_key(private_key: impl Into<String>, origin: &Path) -> Result<Self> {
        let private_key = private_key.into();
        parse_private_key(&private_key).map_err(|message| Error::Credential {
            path: origin.to_path_buf(),
            message,
        })?;
        Ok(Self {
            user: REMOTE_USER.to_string(),
            private_key,
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Produce a libgit2 credential for one authentication attempt.
    pub(crate) fn to_cred(&self) -> std::result::Result<git2::Cred, git2::Error> {
        git2::Cred::ssh_key_from_memory(&self.user, None, &self.private_key, None)
    }
}

impl fmt::Debug for SshIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshIdentity")
            .field("user", &self.user)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Source of the SSH identity used for every remote operation.
pub trait CredentialProvider {
    fn identity(&self) -> Result<SshIdentity>;
}

impl CredentialProvider for SshIdentity {
    fn identity(&self) -> Result<SshIdentity> {
        Ok(self.clone())
    }
}

/// Reads the identity from a private key file. No retries.
#[derive(Debug, Clone)]
pub struct KeyFileProvider {
    path: PathBuf,
}

impl KeyFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The conventional `~/.ssh/id_rsa` location.
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| Error::Credential {
            path: PathBuf::from("~").join(DEFAULT_KEY_FILE),
            message: "home directory could not be determined".into(),
        })?;
        Ok(Self::new(home.join(DEFAULT_KEY_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialProvider for KeyFileProvider {
    fn identity(&self) -> Result<SshIdentity> {
        let key = std::fs::read_to_string(&self.path).map_err(|e| Error::Credential {
            path: self.path.clone(),
            message: format!("error reading private key: {e}"),
        })?;
        tracing::debug!(path = %self.path.display(), "Loaded SSH private key");
        SshIdentity::from_private_key(key, &self.path)
    }
}

const OPENSSH_MAGIC: &[u8] = b"openssh-key-v1\0";

/// Decode an armored private key and check its structure.
///
/// Accepts OpenSSH (`openssh-key-v1`) keys and PEM keys whose body is a DER
/// sequence. Encrypted keys are accepted as long as their framing parses.
fn parse_private_key(key: &str) -> std::result::Result<(), String> {
    let mut lines = key.lines().map(str::trim).filter(|l| !l.is_empty());
    let kind = lines
        .next()
        .and_then(|first| first.strip_prefix("-----BEGIN "))
        .and_then(|rest| rest.strip_suffix("-----"))
        .filter(|kind| kind.ends_with("PRIVATE KEY"))
        .ok_or("missing -----BEGIN ... PRIVATE KEY----- line")?;

    let end = format!("-----END {kind}-----");
    let mut body = String::new();
    let mut closed = false;
    for line in lines {
        if line == end {
            closed = true;
            break;
        }
        // PEM encapsulation headers such as Proc-Type and DEK-Info
        if line.contains(':') {
            continue;
        }
        body.push_str(line);
    }
    if !closed {
        return Err(format!("missing {end} line"));
    }

    let der = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| format!("key body is not valid base64: {e}"))?;
    if kind == "OPENSSH PRIVATE KEY" {
        parse_openssh(&der)
    } else if der.len() > 2 && der[0] == 0x30 {
        Ok(())
    } else {
        Err(format!("{kind} body is not a DER sequence"))
    }
}

/// Walk the `openssh-key-v1` container far enough to know it is intact.
fn parse_openssh(data: &[u8]) -> std::result::Result<(), String> {
    let mut reader = data
        .strip_prefix(OPENSSH_MAGIC)
        .ok_or("not an openssh-key-v1 container")?;

    let cipher = read_string(&mut reader)?;
    let _kdf = read_string(&mut reader)?;
    let _kdf_options = read_string(&mut reader)?;
    let count = read_u32(&mut reader)?;
    if count == 0 {
        return Err("key file holds no keys".into());
    }
    for _ in 0..count {
        if read_string(&mut reader)?.is_empty() {
            return Err("empty public key".into());
        }
    }

    let mut private = read_string(&mut reader)?;
    if private.is_empty() || private.len() % 8 != 0 {
        return Err("private section is not block aligned".into());
    }
    // Unencrypted keys repeat a check value; a mismatch means corruption.
    if cipher == b"none" && read_u32(&mut private)? != read_u32(&mut private)? {
        return Err("private section check values differ".into());
    }
    Ok(())
}

fn read_u32<'a>(reader: &mut &'a [u8]) -> std::result::Result<u32, String> {
    let data: &'a [u8] = *reader;
    let Some((bytes, rest)) = data.split_first_chunk::<4>() else {
        return Err("truncated key data".into());
    };
    *reader = rest;
    Ok(u32::from_be_bytes(*bytes))
}

fn read_string<'a>(reader: &mut &'a [u8]) -> std::result::Result<&'a [u8], String> {
    let len = read_u32(reader)? as usize;
    let data: &'a [u8] = *reader;
    if data.len() < len {
        return Err("truncated key data".into());
    }
    let (value, rest) = data.split_at(len);
    *reader = rest;
    Ok(value)
}
