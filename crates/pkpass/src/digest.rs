//! SHA-1 content digests for pass members.
//!
//! Every file placed in a pass, including `pass.json`, is listed in the
//! manifest by the hex-encoded SHA-1 of its bytes.

use sha1::{Digest, Sha1};
use std::fmt;

/// Length in bytes of a SHA-1 digest.
pub const DIGEST_LEN: usize = 20;

/// A 160-bit SHA-1 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha1Digest([u8; DIGEST_LEN]);

impl Sha1Digest {
    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex encoding, the form used in `manifest.json`.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Sha1Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute the SHA-1 digest of `data`.
pub fn digest(data: &[u8]) -> Sha1Digest {
    let mut hasher = Sha1::new();
    hasher.update(data);
    Sha1Digest(hasher.finalize().into())
}
