use swifttree_bin::Bin;

use crate::{Digest, Result};

/// Random-access chunk byte storage.
///
/// Uses `&self` (interior mutability) so a store can be shared with
/// whatever owns the underlying resource. Chunk `index` addresses bytes
/// `[index * 1024, index * 1024 + len)`.
pub trait ContentStore {
    /// Read up to `buf.len()` bytes of chunk `index`; returns the number of
    /// bytes read (short at end of content).
    fn read_chunk(&self, index: u64, buf: &mut [u8]) -> Result<usize>;

    /// Write the bytes of chunk `index`, growing the store if needed.
    fn write_chunk(&self, index: u64, data: &[u8]) -> Result<()>;

    /// The current content length in bytes.
    fn byte_len(&self) -> Result<u64>;

    /// Resize the content to exactly `len` bytes.
    fn set_byte_len(&self, len: u64) -> Result<()>;
}

/// Digest storage keyed by bin number.
///
/// Slot key is the bin's raw `u64` value; a sized tree of `n` chunks uses
/// slots `[0, 2n)`. Unwritten slots read back as [`Digest::ZERO`].
pub trait HashStore {
    /// The digest recorded at `bin`, or `Digest::ZERO` when unknown.
    fn hash_at(&self, bin: Bin) -> Result<Digest>;

    /// Record `digest` at `bin`, overwriting any previous value.
    fn set_hash(&self, bin: Bin, digest: Digest) -> Result<()>;

    /// Resize to hold `slots` digests (`2 × chunk count` once sized).
    fn reserve(&self, slots: u64) -> Result<()>;
}
