//! 20-byte content digests.
//!
//! The external form is 20 raw bytes or 40 lowercase hex characters. The
//! all-zero digest is the reserved "unknown" sentinel: stores return it for
//! slots never written, and it must never be treated as a legitimate
//! content or bootstrap digest.

use std::fmt;

use sha1::{Digest as _, Sha1};

/// A 20-byte digest identifying chunk content or a merged subtree.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Digest(pub [u8; 20]);

impl Digest {
    /// The number of raw bytes in a digest.
    pub const SIZE: usize = 20;

    /// The all-zero "unknown" sentinel.
    pub const ZERO: Digest = Digest([0u8; 20]);

    /// Digest of raw content bytes.
    pub fn of(data: &[u8]) -> Digest {
        Digest(Sha1::digest(data).into())
    }

    /// Digest of two child digests concatenated left-to-right.
    pub fn join(left: &Digest, right: &Digest) -> Digest {
        let mut hasher = Sha1::new();
        hasher.update(left.0);
        hasher.update(right.0);
        Digest(hasher.finalize().into())
    }

    /// Whether this is the all-zero sentinel.
    pub fn is_zero(&self) -> bool {
        *self == Digest::ZERO
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// The canonical lowercase 40-character hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the 40-character hex form (either case accepted).
    pub fn from_hex(s: &str) -> Option<Digest> {
        if s.len() != Self::SIZE * 2 {
            return None;
        }
        let bytes = hex::decode(s).ok()?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Some(Digest(out))
    }
}

impl From<[u8; 20]> for Digest {
    fn from(bytes: [u8; 20]) -> Digest {
        Digest(bytes)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
