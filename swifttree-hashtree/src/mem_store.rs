//! In-memory stores, for tests and ephemeral transfers.

use std::{cell::RefCell, collections::BTreeMap};

use swifttree_bin::Bin;

use crate::{ContentStore, Digest, HashStore, Result};

/// In-memory content store backed by a `Vec<u8>`.
#[derive(Clone, Default)]
pub struct MemContentStore(RefCell<Vec<u8>>);

impl MemContentStore {
    /// An empty store.
    pub fn new() -> MemContentStore {
        MemContentStore::default()
    }

    /// A store pre-filled with `bytes`.
    pub fn from_bytes(bytes: Vec<u8>) -> MemContentStore {
        MemContentStore(RefCell::new(bytes))
    }

    /// Consume the store and return the content.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0.into_inner()
    }

    /// A copy of the current content.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }
}

impl ContentStore for MemContentStore {
    fn read_chunk(&self, index: u64, buf: &mut [u8]) -> Result<usize> {
        let data = self.0.borrow();
        let off = (index as usize) << 10;
        if off >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - off);
        buf[..n].copy_from_slice(&data[off..off + n]);
        Ok(n)
    }

    fn write_chunk(&self, index: u64, chunk: &[u8]) -> Result<()> {
        let mut data = self.0.borrow_mut();
        let off = (index as usize) << 10;
        if data.len() < off + chunk.len() {
            data.resize(off + chunk.len(), 0);
        }
        data[off..off + chunk.len()].copy_from_slice(chunk);
        Ok(())
    }

    fn byte_len(&self) -> Result<u64> {
        Ok(self.0.borrow().len() as u64)
    }

    fn set_byte_len(&self, len: u64) -> Result<()> {
        self.0.borrow_mut().resize(len as usize, 0);
        Ok(())
    }
}

/// Sparse in-memory hash store backed by a `BTreeMap` keyed by bin value.
#[derive(Clone, Default)]
pub struct MemHashStore(RefCell<BTreeMap<u64, Digest>>);

impl MemHashStore {
    /// An empty store.
    pub fn new() -> MemHashStore {
        MemHashStore::default()
    }
}

impl HashStore for MemHashStore {
    fn hash_at(&self, bin: Bin) -> Result<Digest> {
        Ok(self
            .0
            .borrow()
            .get(&bin.to_u64())
            .copied()
            .unwrap_or(Digest::ZERO))
    }

    fn set_hash(&self, bin: Bin, digest: Digest) -> Result<()> {
        self.0.borrow_mut().insert(bin.to_u64(), digest);
        Ok(())
    }

    fn reserve(&self, slots: u64) -> Result<()> {
        // Sparse map: shrinking drops slots past the new end.
        self.0.borrow_mut().retain(|&k, _| k < slots);
        Ok(())
    }
}
