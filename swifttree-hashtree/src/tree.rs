//! The Merkle verification tree.
//!
//! Chunk `i` of the content is leaf bin `(0, i)`; an internal bin's digest
//! is the digest of its children's digests concatenated left-to-right. The
//! trusted root is derived by climbing from the known peaks toward the
//! conceptual top, padding unknown right subtrees with the zero digest.
//!
//! A tree is either *unsized* (total length unknown, only peak-hash
//! candidates accepted) or *sized*; the transition happens exactly once,
//! when an accumulated peak run reproduces the trusted root. All protocol
//! verdicts are `Ok(bool)`; `Err` is reserved for storage failures, after
//! which the size counters are zeroed and the tree is inert.

use swifttree_bin::{Bin, BinMap};

use crate::{ContentStore, Digest, HashStore, HashTreeError, Result};

/// The fixed transfer granularity in bytes.
pub const CHUNK_SIZE: usize = 1024;

/// Storage-backed Merkle verification tree over fixed-size chunks.
pub struct HashTree<C, H> {
    content: C,
    hashes: H,
    root: Digest,
    verified: BinMap,
    peaks: Vec<(Bin, Digest)>,
    size_bytes: u64,
    size_chunks: u64,
    complete_bytes: u64,
    complete_chunks: u64,
}

impl<C: ContentStore, H: HashStore> HashTree<C, H> {
    /// A fresh unsized tree trusting `root`, awaiting peak-hash candidates.
    pub fn new(content: C, hashes: H, root: Digest) -> HashTree<C, H> {
        HashTree {
            content,
            hashes,
            root,
            verified: BinMap::new(Bin::new(62, 0)),
            peaks: Vec::new(),
            size_bytes: 0,
            size_chunks: 0,
            complete_bytes: 0,
            complete_chunks: 0,
        }
    }

    /// Hash fully-known content and derive its root.
    ///
    /// Splits the content into 1024-byte chunks, hashes every leaf,
    /// recombines upward, persists the whole tree to the hash store, and
    /// records the peak digests. The resulting tree is sized and complete;
    /// its [`root_hash`](Self::root_hash) is what a receiver must be given.
    pub fn submit(content: C, hashes: H) -> Result<HashTree<C, H>> {
        let mut tree = HashTree::new(content, hashes, Digest::ZERO);
        let size = tree.content.byte_len()?;
        if size == 0 {
            return Err(HashTreeError::InvalidInput(
                "cannot submit empty content".into(),
            ));
        }
        let size_chunks = size.div_ceil(CHUNK_SIZE as u64);
        tree.hashes.reserve(size_chunks * 2)?;

        for i in 0..size_chunks {
            let mut buf = [0u8; CHUNK_SIZE];
            let rd = tree.content.read_chunk(i, &mut buf)?;
            if rd < CHUNK_SIZE && i != size_chunks - 1 {
                return Err(HashTreeError::Store(format!(
                    "short read of {rd} bytes at chunk {i}"
                )));
            }
            let mut pos = Bin::new(0, i);
            tree.hashes.set_hash(pos, Digest::of(&buf[..rd]))?;
            while pos.is_right() {
                pos = pos.parent();
                let combined = Digest::join(
                    &tree.hashes.hash_at(pos.left())?,
                    &tree.hashes.hash_at(pos.right())?,
                );
                tree.hashes.set_hash(pos, combined)?;
            }
            tree.verified.set(Bin::new(0, i));
            tree.complete_bytes += rd as u64;
            tree.complete_chunks += 1;
        }

        for bin in Bin::peaks(size_chunks) {
            let digest = tree.hashes.hash_at(bin)?;
            tree.peaks.push((bin, digest));
        }
        tree.size_bytes = size;
        tree.size_chunks = size_chunks;
        tree.root = tree.derive_root();
        Ok(tree)
    }

    /// Open existing (possibly partial) storage against a trusted root.
    ///
    /// Re-feeds the persisted peak digests through the bootstrap path and,
    /// when they reproduce `root`, re-verifies every already-hashed chunk.
    /// When nothing on disk checks out the tree simply stays unsized.
    pub fn open(content: C, hashes: H, root: Digest) -> Result<HashTree<C, H>> {
        let mut tree = HashTree::new(content, hashes, root);
        tree.recover_progress()?;
        Ok(tree)
    }

    // Simulates having received every chunk, minus the network.
    fn recover_progress(&mut self) -> Result<()> {
        let size = self.content.byte_len()?;
        let size_chunks = size.div_ceil(CHUNK_SIZE as u64);
        for bin in Bin::peaks(size_chunks) {
            let candidate = self.hashes.hash_at(bin)?;
            self.offer_peak_hash(bin, candidate)?;
        }
        if self.size_bytes == 0 {
            // No valid peak set on disk; start over from the network.
            return Ok(());
        }

        let zero_chunk = Digest::of(&[0u8; CHUNK_SIZE]);
        for i in 0..self.size_chunks {
            let pos = Bin::new(0, i);
            if self.hashes.hash_at(pos)?.is_zero() {
                continue;
            }
            let mut buf = [0u8; CHUNK_SIZE];
            let rd = self.content.read_chunk(i, &mut buf)?;
            if rd < CHUNK_SIZE && i != self.size_chunks - 1 {
                break;
            }
            // Heuristic: an all-zero chunk whose recorded digest is not the
            // zero-chunk digest is taken as never-written backing space and
            // skipped. A legitimate all-zero chunk under a stale digest is
            // indistinguishable from that; it will be re-fetched.
            if rd == CHUNK_SIZE
                && buf.iter().all(|&b| b == 0)
                && self.hashes.hash_at(pos)? != zero_chunk
            {
                continue;
            }
            if !self.offer_hash(pos, Digest::of(&buf[..rd]))? {
                continue;
            }
            self.verified.set(pos);
            self.complete_chunks += 1;
            self.complete_bytes += rd as u64;
            if rd < CHUNK_SIZE && i == self.size_chunks - 1 {
                self.size_bytes = ((self.size_chunks - 1) << 10) + rd as u64;
            }
        }
        Ok(())
    }

    /// Offer an untrusted peak-hash candidate while the tree is unsized.
    ///
    /// Candidates must descend strictly in layer and run contiguously left
    /// to right; anything else resets the accumulated run to just this
    /// candidate. Whenever the run reproduces the trusted root the tree
    /// becomes sized: storage is resized, peak digests are persisted, and
    /// further candidates are refused.
    pub fn offer_peak_hash(&mut self, pos: Bin, hash: Digest) -> Result<bool> {
        if self.size_bytes != 0 || pos.is_none() || pos.is_all() {
            return Ok(false);
        }
        if let Some(&(last, _)) = self.peaks.last() {
            if pos.layer() >= last.layer()
                || pos.base_offset() != last.base_offset() + last.base_length()
            {
                self.peaks.clear();
            }
        }
        self.peaks.push((pos, hash));
        if self.derive_root() != self.root {
            return Ok(false);
        }

        // The candidates add up to the root: the file size is now known.
        let size_chunks: u64 = self.peaks.iter().map(|(b, _)| b.base_length()).sum();
        self.size_chunks = size_chunks;
        self.size_bytes = size_chunks << 10;
        self.complete_bytes = 0;
        self.complete_chunks = 0;

        let result = self.allocate_storage();
        if result.is_err() {
            self.reset_sizes();
        }
        result.map(|()| true)
    }

    // Resize the backing stores for a freshly-established size and persist
    // the accepted peak digests.
    fn allocate_storage(&mut self) -> Result<()> {
        let current = self.content.byte_len()?;
        if current <= (self.size_chunks - 1) << 10 || current > self.size_chunks << 10 {
            self.content.set_byte_len(self.size_bytes)?;
        }
        self.hashes.reserve(self.size_chunks * 2)?;
        for &(bin, digest) in &self.peaks {
            self.hashes.set_hash(bin, digest)?;
        }
        Ok(())
    }

    fn reset_sizes(&mut self) {
        self.size_bytes = 0;
        self.size_chunks = 0;
        self.complete_bytes = 0;
        self.complete_chunks = 0;
    }

    /// Recombine the accepted peaks into a root digest.
    ///
    /// Climbs from the smallest (last) peak: a left child pairs with a
    /// phantom zero digest for its unknown right sibling; a right child
    /// requires the next peak to be exactly its sibling. A missing sibling
    /// yields [`Digest::ZERO`], an inconsistency signal that is never a
    /// valid root.
    pub fn derive_root(&self) -> Digest {
        let Some(&(last, last_hash)) = self.peaks.last() else {
            return Digest::ZERO;
        };
        let mut pos = last;
        let mut hash = last_hash;
        let mut remaining = self.peaks.len() - 1;
        while !pos.is_all() {
            if pos.is_left() {
                hash = Digest::join(&hash, &Digest::ZERO);
            } else {
                if remaining == 0 || self.peaks[remaining - 1].0 != pos.sibling() {
                    return Digest::ZERO;
                }
                remaining -= 1;
                hash = Digest::join(&self.peaks[remaining].1, &hash);
            }
            pos = pos.parent();
        }
        hash
    }

    /// The accepted peak whose range contains `pos`, or `NONE` when `pos`
    /// lies outside the known extent.
    pub fn peak_for(&self, pos: Bin) -> Bin {
        self.peaks
            .iter()
            .find(|(peak, _)| peak.contains(pos))
            .map_or(Bin::NONE, |&(peak, _)| peak)
    }

    /// Offer an untrusted digest claim for `pos`.
    ///
    /// While unsized this delegates to [`offer_peak_hash`](Self::offer_peak_hash).
    /// Otherwise: bins outside the known extent are refused; digests of
    /// peaks and of already-proven subtrees are immutable, so the claim is
    /// just compared against them. A new claim is recorded provisionally;
    /// for a base bin the tree then climbs, recombining sibling digests
    /// upward until it reaches a proven bin or the peak, and the verdict is
    /// whether the recombined digest matches there. A `true` establishes
    /// consistency of the hash chain, not authenticity of any bytes.
    pub fn offer_hash(&mut self, pos: Bin, hash: Digest) -> Result<bool> {
        if self.size_bytes == 0 {
            return self.offer_peak_hash(pos, hash);
        }
        if pos.is_none() {
            return Ok(false);
        }
        let peak = self.peak_for(pos);
        if peak.is_none() {
            return Ok(false);
        }
        if peak == pos {
            return Ok(hash == self.hashes.hash_at(pos)?);
        }
        if !self.verified.is_empty(pos.parent()) {
            // Some chunk beneath the parent is already verified, so the
            // digest recorded at `pos` took part in a proven chain.
            return Ok(hash == self.hashes.hash_at(pos)?);
        }
        self.hashes.set_hash(pos, hash)?;
        if !pos.is_base() {
            return Ok(false); // unverified until leaf data confirms it
        }
        // Climb to the nearest proven bin (or the peak), recombining.
        let mut pos = pos;
        let mut uphash = hash;
        while pos != peak && self.verified.is_empty(pos) {
            self.hashes.set_hash(pos, uphash)?;
            pos = pos.parent();
            uphash = Digest::join(
                &self.hashes.hash_at(pos.left())?,
                &self.hashes.hash_at(pos.right())?,
            );
        }
        Ok(uphash == self.hashes.hash_at(pos)?)
    }

    /// Offer chunk bytes for base bin `pos`.
    ///
    /// `data` must be a full 1024-byte chunk unless `pos` is the final
    /// chunk. Re-offering a verified chunk is accepted idempotently without
    /// rehashing. Otherwise the bytes are digested and gated through
    /// [`offer_hash`](Self::offer_hash); on success they are persisted, the
    /// chunk is marked verified, and a short final chunk pins the exact
    /// content size.
    pub fn offer_data(&mut self, pos: Bin, data: &[u8]) -> Result<bool> {
        if self.size_bytes == 0 || !pos.is_base() || data.len() > CHUNK_SIZE {
            return Ok(false);
        }
        if data.len() < CHUNK_SIZE && pos != Bin::new(0, self.size_chunks - 1) {
            return Ok(false);
        }
        if self.verified.is_filled(pos) {
            return Ok(true);
        }
        if self.peak_for(pos).is_none() {
            return Ok(false);
        }
        if !self.offer_hash(pos, Digest::of(data))? {
            return Ok(false);
        }

        let result = self.persist_chunk(pos, data);
        if result.is_err() {
            self.reset_sizes();
        }
        result.map(|()| true)
    }

    fn persist_chunk(&mut self, pos: Bin, data: &[u8]) -> Result<()> {
        self.content.write_chunk(pos.base_offset(), data)?;
        self.verified.set(pos);
        self.complete_bytes += data.len() as u64;
        self.complete_chunks += 1;
        if pos.base_offset() == self.size_chunks - 1 && data.len() < CHUNK_SIZE {
            // Short final chunk: the exact byte size is now known.
            self.size_bytes = ((self.size_chunks - 1) << 10) + data.len() as u64;
            if self.content.byte_len()? != self.size_bytes {
                self.content.set_byte_len(self.size_bytes)?;
            }
        }
        Ok(())
    }

    /// Reserved extension point for live (growing) content; currently a
    /// no-op returning the number of fresh tail peaks (always 0).
    pub fn append_data(&mut self, _data: &[u8]) -> usize {
        0
    }

    /// Byte length of the longest fully-verified prefix.
    ///
    /// Distinct from [`complete`](Self::complete): received chunks beyond
    /// the first gap do not count.
    pub fn seq_complete(&self) -> u64 {
        let gap = self.verified.find_empty();
        if gap.is_none() || gap.base_offset() >= self.size_chunks {
            self.size_bytes
        } else {
            gap.base_offset() << 10
        }
    }

    /// The trusted (or derived) root digest.
    pub fn root_hash(&self) -> Digest {
        self.root
    }

    /// Total content size in bytes; 0 while unsized.
    pub fn size(&self) -> u64 {
        self.size_bytes
    }

    /// Total content size in chunks; 0 while unsized.
    pub fn chunk_count(&self) -> u64 {
        self.size_chunks
    }

    /// Whether the size transition has happened.
    pub fn is_sized(&self) -> bool {
        self.size_bytes != 0
    }

    /// Verified bytes so far (possibly discontiguous).
    pub fn complete(&self) -> u64 {
        self.complete_bytes
    }

    /// Verified chunks so far.
    pub fn complete_chunks(&self) -> u64 {
        self.complete_chunks
    }

    /// Whether every chunk is verified.
    pub fn is_complete(&self) -> bool {
        self.size_bytes != 0 && self.complete_bytes == self.size_bytes
    }

    /// The number of accepted peaks.
    pub fn peak_count(&self) -> usize {
        self.peaks.len()
    }

    /// The `i`-th accepted peak bin.
    pub fn peak(&self, i: usize) -> Bin {
        self.peaks.get(i).map_or(Bin::NONE, |&(bin, _)| bin)
    }

    /// The `i`-th accepted peak digest.
    pub fn peak_hash(&self, i: usize) -> Digest {
        self.peaks.get(i).map_or(Digest::ZERO, |&(_, hash)| hash)
    }

    /// The digest recorded at `pos` (`ZERO` when unknown). Only digests
    /// under verified bins are trustworthy.
    pub fn hash(&self, pos: Bin) -> Result<Digest> {
        self.hashes.hash_at(pos)
    }

    /// The completion bitmap of verified chunks.
    pub fn verified(&self) -> &BinMap {
        &self.verified
    }

    /// Read back the bytes of a verified chunk; the number of bytes is
    /// short only for the final chunk.
    pub fn read_chunk(&self, index: u64, buf: &mut [u8]) -> Result<usize> {
        self.content.read_chunk(index, buf)
    }
}
