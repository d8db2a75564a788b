use rand::seq::SliceRandom;

use super::{bootstrap, chunk_of, content, deliver, submit_mem};
use crate::{Bin, Digest, HashTree, MemContentStore, MemHashStore, CHUNK_SIZE};

#[test]
fn test_submit_sizes_and_peaks() {
    let data = content(7 * CHUNK_SIZE);
    let src = submit_mem(&data);
    assert!(src.is_sized());
    assert!(src.is_complete());
    assert_eq!(7, src.chunk_count());
    assert_eq!(data.len() as u64, src.size());
    assert_eq!(data.len() as u64, src.complete());
    assert_eq!(3, src.peak_count());
    assert_eq!(Bin::new(2, 0), src.peak(0));
    assert_eq!(Bin::new(1, 2), src.peak(1));
    assert_eq!(Bin::new(0, 6), src.peak(2));
    assert!(!src.root_hash().is_zero());
    assert_eq!(src.root_hash(), src.derive_root());
}

#[test]
fn test_submit_is_deterministic() {
    let data = content(5 * CHUNK_SIZE + 77);
    assert_eq!(submit_mem(&data).root_hash(), submit_mem(&data).root_hash());
    // Different content, different root.
    let mut other = data.clone();
    other[3000] ^= 1;
    assert_ne!(submit_mem(&data).root_hash(), submit_mem(&other).root_hash());
}

#[test]
fn test_submit_empty_content_refused() {
    assert!(HashTree::submit(MemContentStore::new(), MemHashStore::new()).is_err());
}

#[test]
fn test_round_trip_random_order() {
    let data = content(7 * CHUNK_SIZE + 300);
    let src = submit_mem(&data);
    let mut rx = bootstrap(&src);
    assert_eq!(8 * CHUNK_SIZE as u64, rx.size()); // rounded until the tail arrives

    let mut order: Vec<u64> = (0..src.chunk_count()).collect();
    order.shuffle(&mut rand::rng());
    for i in order {
        assert!(deliver(&src, &mut rx, i, chunk_of(&data, i)), "chunk {i}");
    }

    assert!(rx.is_complete());
    assert_eq!(data.len() as u64, rx.size());
    assert_eq!(data.len() as u64, rx.complete());
    assert_eq!(data.len() as u64, rx.seq_complete());

    // Byte-identical reconstruction.
    let mut rebuilt = vec![0u8; data.len()];
    for i in 0..rx.chunk_count() {
        let start = (i as usize) << 10;
        let end = data.len().min(start + CHUNK_SIZE);
        let n = rx
            .read_chunk(i, &mut rebuilt[start..end])
            .expect("read back");
        assert_eq!(end - start, n);
    }
    assert_eq!(data, rebuilt);
}

#[test]
fn test_single_chunk_file() {
    let data = content(CHUNK_SIZE);
    let src = submit_mem(&data);
    assert_eq!(1, src.peak_count());
    assert_eq!(Bin::new(0, 0), src.peak(0));

    let mut rx = bootstrap(&src);
    assert!(deliver(&src, &mut rx, 0, &data));
    assert!(rx.is_complete());
}

#[test]
fn test_tamper_detection() {
    let data = content(4 * CHUNK_SIZE);
    let src = submit_mem(&data);
    let mut rx = bootstrap(&src);

    let mut bad = chunk_of(&data, 2).to_vec();
    bad[17] ^= 0xFF;
    assert!(!deliver(&src, &mut rx, 2, &bad));
    assert!(rx.verified().is_empty(Bin::new(0, 2)));
    assert_eq!(0, rx.complete());

    // The genuine bytes still go through afterwards.
    assert!(deliver(&src, &mut rx, 2, chunk_of(&data, 2)));
    assert!(rx.verified().is_filled(Bin::new(0, 2)));
}

#[test]
fn test_data_needs_uncle_hashes() {
    let data = content(4 * CHUNK_SIZE);
    let src = submit_mem(&data);
    let mut rx = bootstrap(&src);

    // Without sibling digests the chain cannot reach the peak.
    assert!(!rx.offer_data(Bin::new(0, 0), chunk_of(&data, 0)).unwrap());
    assert!(rx.verified().is_empty(Bin::new(0, 0)));
    // With them it verifies.
    assert!(deliver(&src, &mut rx, 0, chunk_of(&data, 0)));
}

#[test]
fn test_offer_data_idempotent() {
    let data = content(2 * CHUNK_SIZE);
    let src = submit_mem(&data);
    let mut rx = bootstrap(&src);

    assert!(deliver(&src, &mut rx, 0, chunk_of(&data, 0)));
    let complete = rx.complete();
    // Re-offering a verified chunk is accepted without recounting.
    assert!(rx.offer_data(Bin::new(0, 0), chunk_of(&data, 0)).unwrap());
    assert_eq!(complete, rx.complete());
}

#[test]
fn test_structural_rejection() {
    let data = content(4 * CHUNK_SIZE);
    let src = submit_mem(&data);
    let mut rx = bootstrap(&src);

    // Outside the known extent.
    assert!(!rx.offer_hash(Bin::new(0, 100), Digest::of(b"x")).unwrap());
    assert!(!rx.offer_data(Bin::new(0, 100), &[0u8; 1024]).unwrap());
    // Not a base bin.
    assert!(!rx.offer_data(Bin::new(1, 0), &[0u8; 1024]).unwrap());
    // Short chunk that is not the final one.
    assert!(!rx.offer_data(Bin::new(0, 0), &[0u8; 100]).unwrap());
    assert_eq!(0, rx.complete());
}

#[test]
fn test_peak_digests_immutable() {
    let data = content(4 * CHUNK_SIZE);
    let src = submit_mem(&data);
    let mut rx = bootstrap(&src);

    let peak = src.peak(0);
    assert!(rx.offer_hash(peak, src.peak_hash(0)).unwrap());
    assert!(!rx.offer_hash(peak, Digest::of(b"forged")).unwrap());
    // The recorded digest is untouched by the forged claim.
    assert_eq!(src.peak_hash(0), rx.hash(peak).unwrap());
}

#[test]
fn test_peak_bootstrap_order_enforced() {
    let src = submit_mem(&content(7 * CHUNK_SIZE));
    let mut rx = HashTree::new(MemContentStore::new(), MemHashStore::new(), src.root_hash());

    assert!(!rx.offer_peak_hash(Bin::new(2, 0), src.peak_hash(0)).unwrap());
    assert_eq!(1, rx.peak_count());
    // Equal layer: not strictly decreasing, run resets to the new candidate.
    assert!(!rx.offer_peak_hash(Bin::new(2, 1), src.peak_hash(0)).unwrap());
    assert_eq!(1, rx.peak_count());
    assert_eq!(Bin::new(2, 1), rx.peak(0));
    // Non-contiguous: resets again.
    assert!(!rx.offer_peak_hash(Bin::new(0, 0), src.peak_hash(2)).unwrap());
    assert_eq!(1, rx.peak_count());
    assert!(!rx.is_sized());

    // A correct run still gets through afterwards.
    for i in 0..src.peak_count() {
        rx.offer_peak_hash(src.peak(i), src.peak_hash(i)).unwrap();
    }
    assert!(rx.is_sized());
    assert_eq!(7, rx.chunk_count());
}

#[test]
fn test_bootstrap_mismatch_not_terminal() {
    let src = submit_mem(&content(3 * CHUNK_SIZE));
    let mut rx = HashTree::new(MemContentStore::new(), MemHashStore::new(), src.root_hash());

    // Garbage candidates never size the tree but never wedge it either.
    assert!(!rx.offer_peak_hash(Bin::new(3, 0), Digest::of(b"junk")).unwrap());
    assert!(!rx.offer_peak_hash(Bin::new(5, 1), Digest::of(b"junk")).unwrap());
    assert!(!rx.is_sized());

    assert!(!rx.offer_peak_hash(src.peak(0), src.peak_hash(0)).unwrap());
    assert!(rx.offer_peak_hash(src.peak(1), src.peak_hash(1)).unwrap());
    assert!(rx.is_sized());
}

#[test]
fn test_derive_root_missing_sibling() {
    let src = submit_mem(&content(7 * CHUNK_SIZE));
    let mut rx = HashTree::new(MemContentStore::new(), MemHashStore::new(), src.root_hash());
    // The climb from a lone interior peak hits a right child whose sibling
    // peak was never recorded: inconsistent.
    rx.offer_peak_hash(Bin::new(1, 2), src.peak_hash(1)).unwrap();
    assert!(rx.derive_root().is_zero());
}

#[test]
fn test_seq_complete_stops_at_gap() {
    let data = content(4 * CHUNK_SIZE);
    let src = submit_mem(&data);
    let mut rx = bootstrap(&src);

    for i in [0u64, 1, 3] {
        assert!(deliver(&src, &mut rx, i, chunk_of(&data, i)));
    }
    assert_eq!(2048, rx.seq_complete());
    assert_eq!(3 * CHUNK_SIZE as u64, rx.complete());
    assert!(!rx.is_complete());

    assert!(deliver(&src, &mut rx, 2, chunk_of(&data, 2)));
    assert_eq!(data.len() as u64, rx.seq_complete());
    assert!(rx.is_complete());
}

#[test]
fn test_short_final_chunk_pins_size() {
    let data = content(2 * CHUNK_SIZE + 100);
    let src = submit_mem(&data);
    assert_eq!(data.len() as u64, src.size());

    let mut rx = bootstrap(&src);
    assert_eq!(3 * CHUNK_SIZE as u64, rx.size());
    assert!(deliver(&src, &mut rx, 2, chunk_of(&data, 2)));
    assert_eq!(data.len() as u64, rx.size());

    for i in [0u64, 1] {
        assert!(deliver(&src, &mut rx, i, chunk_of(&data, i)));
    }
    assert!(rx.is_complete());
}

#[test]
fn test_unsized_tree_refuses_data() {
    let mut rx = HashTree::new(
        MemContentStore::new(),
        MemHashStore::new(),
        Digest::of(b"some root"),
    );
    assert!(!rx.offer_data(Bin::new(0, 0), &[0u8; 1024]).unwrap());
    assert_eq!(0, rx.seq_complete());
    assert_eq!(0, rx.append_data(&[0u8; 1024]));
}
