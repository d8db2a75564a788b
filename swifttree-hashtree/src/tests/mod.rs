mod test_tree;

use crate::{Bin, ContentStore, HashStore, HashTree, MemContentStore, MemHashStore};

/// Deterministic test content of the given byte length.
pub(crate) fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 1024) as u8).collect()
}

/// Hash `data` into fresh in-memory stores.
pub(crate) fn submit_mem(data: &[u8]) -> HashTree<MemContentStore, MemHashStore> {
    HashTree::submit(
        MemContentStore::from_bytes(data.to_vec()),
        MemHashStore::new(),
    )
    .expect("submit")
}

/// A fresh receiver for `src`'s root, sized via its peak hashes.
pub(crate) fn bootstrap(
    src: &HashTree<MemContentStore, MemHashStore>,
) -> HashTree<MemContentStore, MemHashStore> {
    let mut rx = HashTree::new(MemContentStore::new(), MemHashStore::new(), src.root_hash());
    for i in 0..src.peak_count() {
        rx.offer_peak_hash(src.peak(i), src.peak_hash(i))
            .expect("offer peak hash");
    }
    assert!(rx.is_sized(), "peak bootstrap should size the receiver");
    assert_eq!(src.chunk_count(), rx.chunk_count());
    rx
}

/// Send the uncle digests for `chunk` from `src`, then the chunk bytes.
/// Returns the receiver's verdict on the data.
pub(crate) fn deliver<C1, H1, C2, H2>(
    src: &HashTree<C1, H1>,
    rx: &mut HashTree<C2, H2>,
    chunk: u64,
    data: &[u8],
) -> bool
where
    C1: ContentStore,
    H1: HashStore,
    C2: ContentStore,
    H2: HashStore,
{
    let pos = Bin::new(0, chunk);
    let peak = src.peak_for(pos);
    let mut p = pos;
    while p != peak {
        let uncle = p.sibling();
        rx.offer_hash(uncle, src.hash(uncle).expect("source hash"))
            .expect("offer uncle hash");
        p = p.parent();
    }
    rx.offer_data(pos, data).expect("offer data")
}

/// The chunk-`i` slice of `data`.
pub(crate) fn chunk_of(data: &[u8], i: u64) -> &[u8] {
    let start = (i as usize) << 10;
    &data[start..data.len().min(start + 1024)]
}
