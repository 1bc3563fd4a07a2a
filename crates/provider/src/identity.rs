//! Resource identity and its workspace directory name.

use crate::error::{Error, Result};
use std::fmt;

const PLAIN_PREFIX: &str = "tf-";
const ENCODED_PREFIX: &str = "tfx-";

/// Stable key routing a reconcile to its workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    /// Validate an identity. Only the empty string is rejected.
    pub fn new(identity: impl Into<String>) -> Result<Self> {
        let identity = identity.into();
        if identity.is_empty() {
            return Err(Error::InvalidIdentity {
                identity,
                reason: "identity must not be empty",
            });
        }
        Ok(Self(identity))
    }

    /// The identity as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory name for this identity.
    ///
    /// Plain names (`[a-z0-9._-]`, not `.` or `..`) stay readable as
    /// `tf-<name>`; anything else is hex-encoded as `tfx-<hex>`. The two
    /// prefixes never overlap, so distinct identities never share a directory.
    pub fn dir_name(&self) -> String {
        if is_plain(&self.0) {
            format!("{PLAIN_PREFIX}{}", self.0)
        } else {
            format!("{ENCODED_PREFIX}{}", hex::encode(self.0.as_bytes()))
        }
    }

    /// Recover an identity from a directory name produced by [`dir_name`](Self::dir_name).
    pub fn from_dir_name(name: &str) -> Option<Self> {
        if let Some(encoded) = name.strip_prefix(ENCODED_PREFIX) {
            let bytes = hex::decode(encoded).ok()?;
            let identity = String::from_utf8(bytes).ok()?;
            return (!identity.is_empty() && !is_plain(&identity)).then(|| Self(identity));
        }
        name.strip_prefix(PLAIN_PREFIX)
            .filter(|plain| is_plain(plain))
            .map(|plain| Self(plain.to_string()))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_plain(identity: &str) -> bool {
    !identity.is_empty()
        && identity != "."
        && identity != ".."
        && identity
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'_' | b'-'))
}
