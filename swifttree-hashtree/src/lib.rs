//! Incrementally verified Merkle hash tree over fixed 1024-byte chunks.
//!
//! A receiver pulls chunks of a file from untrusted peers in arbitrary
//! order, holding only one trusted 20-byte root digest. [`HashTree`] builds
//! the full hash tree locally (`submit`), bootstraps the file size from
//! untrusted *peak* hashes checked against the root, and then accepts or
//! rejects individual hash and data offers chunk by chunk. Bytes and
//! digests live behind pluggable [`ContentStore`] / [`HashStore`] traits so
//! the same engine runs over memory or files.
//!
//! # Core types
//!
//! - [`HashTree`] — the verification engine (submit, recover, peak
//!   bootstrap, hash/data offers, completion queries).
//! - [`Digest`] — 20-byte content digest; all-zero is the reserved
//!   "unknown" sentinel.
//!
//! # Store traits
//!
//! - [`ContentStore`] — random-access chunk bytes.
//! - [`HashStore`] — digests keyed by bin number.
//! - [`MemContentStore`] / [`MemHashStore`] — in-memory stores.
//! - [`FileContentStore`] / [`FileHashStore`] — file-backed stores.

#![warn(missing_docs)]

mod digest;
mod error;
mod file_store;
mod mem_store;
mod store;
mod tree;

#[cfg(test)]
mod tests;

pub use digest::Digest;
pub use error::{HashTreeError, Result};
pub use file_store::{FileContentStore, FileHashStore};
pub use mem_store::{MemContentStore, MemHashStore};
pub use store::{ContentStore, HashStore};
pub use swifttree_bin::{Bin, BinMap};
pub use tree::{HashTree, CHUNK_SIZE};
