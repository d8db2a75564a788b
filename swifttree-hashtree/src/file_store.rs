//! File-backed stores.
//!
//! The content file holds the chunks at their natural byte offsets; the
//! hash file holds one 20-byte digest per bin slot at `slot * 20`. Reads
//! past the end of either file report short counts / [`Digest::ZERO`], so
//! a half-written pair of files recovers cleanly.

use std::{
    cell::RefCell,
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
};

use swifttree_bin::Bin;

use crate::{ContentStore, Digest, HashStore, Result};

fn open_rw(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?)
}

// Read until `buf` is full or EOF; returns the number of bytes read.
fn read_at(file: &mut File, offset: u64, buf: &mut [u8]) -> Result<usize> {
    file.seek(SeekFrom::Start(offset))?;
    let mut n = 0;
    while n < buf.len() {
        match file.read(&mut buf[n..]) {
            Ok(0) => break,
            Ok(k) => n += k,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(n)
}

fn write_at(file: &mut File, offset: u64, data: &[u8]) -> Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(data)?;
    Ok(())
}

/// Content store over a read-write file.
pub struct FileContentStore(RefCell<File>);

impl FileContentStore {
    /// Open (or create) the content file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<FileContentStore> {
        Ok(FileContentStore(RefCell::new(open_rw(path.as_ref())?)))
    }

    /// Wrap an already-open read-write file.
    pub fn from_file(file: File) -> FileContentStore {
        FileContentStore(RefCell::new(file))
    }
}

impl ContentStore for FileContentStore {
    fn read_chunk(&self, index: u64, buf: &mut [u8]) -> Result<usize> {
        read_at(&mut self.0.borrow_mut(), index << 10, buf)
    }

    fn write_chunk(&self, index: u64, data: &[u8]) -> Result<()> {
        write_at(&mut self.0.borrow_mut(), index << 10, data)
    }

    fn byte_len(&self) -> Result<u64> {
        Ok(self.0.borrow().metadata()?.len())
    }

    fn set_byte_len(&self, len: u64) -> Result<()> {
        Ok(self.0.borrow().set_len(len)?)
    }
}

/// Hash store over a read-write file of 20-byte digest slots.
pub struct FileHashStore(RefCell<File>);

impl FileHashStore {
    /// Open (or create) the hash file at `path`.
    ///
    /// The conventional name is the content path with a `.mhash` suffix.
    pub fn open(path: impl AsRef<Path>) -> Result<FileHashStore> {
        Ok(FileHashStore(RefCell::new(open_rw(path.as_ref())?)))
    }

    /// Wrap an already-open read-write file.
    pub fn from_file(file: File) -> FileHashStore {
        FileHashStore(RefCell::new(file))
    }
}

impl HashStore for FileHashStore {
    fn hash_at(&self, bin: Bin) -> Result<Digest> {
        let mut buf = [0u8; Digest::SIZE];
        let offset = bin.to_u64() * Digest::SIZE as u64;
        let n = read_at(&mut self.0.borrow_mut(), offset, &mut buf)?;
        if n < Digest::SIZE {
            return Ok(Digest::ZERO);
        }
        Ok(Digest(buf))
    }

    fn set_hash(&self, bin: Bin, digest: Digest) -> Result<()> {
        let offset = bin.to_u64() * Digest::SIZE as u64;
        write_at(&mut self.0.borrow_mut(), offset, digest.as_bytes())
    }

    fn reserve(&self, slots: u64) -> Result<()> {
        Ok(self.0.borrow().set_len(slots * Digest::SIZE as u64)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_store_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileContentStore::open(dir.path().join("data")).expect("open");
        assert_eq!(0, store.byte_len().expect("len"));

        store.write_chunk(1, &[0xAB; 1024]).expect("write");
        assert_eq!(2048, store.byte_len().expect("len"));

        let mut buf = [0u8; 1024];
        assert_eq!(1024, store.read_chunk(1, &mut buf).expect("read"));
        assert_eq!([0xAB; 1024], buf);
        // Chunk 0 was never written: zero-filled by the resize.
        assert_eq!(1024, store.read_chunk(0, &mut buf).expect("read"));
        assert_eq!([0u8; 1024], buf);
        // Past the end.
        assert_eq!(0, store.read_chunk(5, &mut buf).expect("read"));
    }

    #[test]
    fn test_hash_store_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileHashStore::open(dir.path().join("data.mhash")).expect("open");
        let bin = Bin::new(1, 1);

        assert!(store.hash_at(bin).expect("read").is_zero());
        let d = Digest::of(b"x");
        store.set_hash(bin, d).expect("write");
        assert_eq!(d, store.hash_at(bin).expect("read"));

        store.reserve(16).expect("reserve");
        assert!(store.hash_at(Bin::new(0, 7)).expect("read").is_zero());
    }
}
