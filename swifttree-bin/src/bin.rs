//! Bin numbers: binary-tree interval addressing in one `u64`.
//!
//! Encoding ("tail of ones"): the number of trailing 1-bits is the layer,
//! the remaining high bits are the offset at that layer. `0b1011` is the bin
//! at layer 2, offset 1; `0b1001` is layer 1, offset 2. Layer-0 bins (even
//! values) are *base bins* and stand for exactly one chunk.
//!
//! Two values are reserved: [`Bin::NONE`] (all ones, "no bin") and
//! [`Bin::ALL`] (the conceptual whole-tree root above every finite bin).
//! Undefined navigation (a child of a base bin, the parent of `ALL`)
//! yields `NONE` rather than panicking; callers check [`Bin::is_none`].

use std::fmt;

/// A bin number: one aligned dyadic interval of chunk indices.
///
/// Copyable value type; all navigation is O(1) bit arithmetic.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bin(u64);

/// 32-bit wire value reserved for `NONE` (and bins too large to fit).
pub const NONE32: u32 = u32::MAX;
/// 32-bit wire value reserved for `ALL`.
pub const ALL32: u32 = 0x7fff_ffff;

impl Bin {
    /// The undefined/absent bin.
    pub const NONE: Bin = Bin(u64::MAX);
    /// The conceptual root covering every finite bin.
    pub const ALL: Bin = Bin(u64::MAX >> 1);

    /// Encode a (layer, offset) pair.
    ///
    /// Valid for `layer < 63` and `offset < 2^(63 - layer)`; anything else is
    /// a precondition violation (debug-asserted, no silent wrap).
    pub fn new(layer: u32, offset: u64) -> Bin {
        debug_assert!(layer < 63, "bin layer {layer} out of range");
        debug_assert!(
            layer == 0 || offset < 1u64 << (63 - layer),
            "bin offset {offset} out of range for layer {layer}"
        );
        Bin((offset << (layer + 1)) | ((1u64 << layer) - 1))
    }

    /// Reconstruct a bin from its raw `u64` value.
    pub fn from_u64(v: u64) -> Bin {
        Bin(v)
    }

    /// The raw `u64` value (also the hash-store slot key).
    pub fn to_u64(self) -> u64 {
        self.0
    }

    /// Whether this is the `NONE` sentinel.
    pub fn is_none(self) -> bool {
        self == Bin::NONE
    }

    /// Whether this is the `ALL` sentinel.
    pub fn is_all(self) -> bool {
        self == Bin::ALL
    }

    /// Whether this is a layer-0 (base) bin.
    pub fn is_base(self) -> bool {
        self.0 & 1 == 0
    }

    // The tail mask `0..0111..1`: low bit of the offset and all layer bits.
    fn tail_bits(self) -> u64 {
        self.0 ^ self.0.wrapping_add(1)
    }

    // `2^layer`; 0 for NONE (whose tail wraps).
    fn tail_bit(self) -> u64 {
        (self.tail_bits().wrapping_add(1)) >> 1
    }

    /// The layer (height) of this bin: 0 for base bins.
    pub fn layer(self) -> u32 {
        self.0.trailing_ones()
    }

    /// The offset at this bin's own layer, e.g. 2 for (1,2).
    pub fn layer_offset(self) -> u64 {
        if self.is_none() {
            return 0;
        }
        (self.0 >> 1) >> self.layer()
    }

    /// The first chunk index covered by this bin, e.g. 4 for (1,2).
    pub fn base_offset(self) -> u64 {
        (self.0 & !self.tail_bits()) >> 1
    }

    /// The number of chunks covered: `2^layer`. 0 for `NONE`.
    pub fn base_length(self) -> u64 {
        self.tail_bit()
    }

    /// The leftmost base bin under this bin; `NONE` for `NONE`.
    pub fn base_left(self) -> Bin {
        if self.is_none() {
            return Bin::NONE;
        }
        Bin::new(0, self.base_offset())
    }

    /// The other half of this bin's parent; `NONE` for sentinels.
    pub fn sibling(self) -> Bin {
        if self.is_none() || self.is_all() {
            return Bin::NONE;
        }
        Bin(self.0 ^ (self.tail_bit() << 1))
    }

    /// The bin one layer up that covers this bin and its sibling.
    ///
    /// The parent of `ALL` (and of `NONE`) is `NONE`.
    pub fn parent(self) -> Bin {
        let tbs = self.tail_bits();
        let ntbs = tbs.wrapping_add(1) | tbs;
        Bin((self.0 & !ntbs) | tbs)
    }

    /// A child bin: right when `right` is true, left otherwise.
    ///
    /// `NONE` for base bins and for the sentinels.
    pub fn child(self, right: bool) -> Bin {
        if self.is_none() || self.is_base() {
            return Bin::NONE;
        }
        let tb = ((self.tail_bits() >> 1) + 1) >> 1;
        if right {
            Bin(self.0 + tb)
        } else {
            Bin(self.0 ^ tb)
        }
    }

    /// The left child; `NONE` for base bins.
    pub fn left(self) -> Bin {
        self.child(false)
    }

    /// The right child; `NONE` for base bins.
    pub fn right(self) -> Bin {
        self.child(true)
    }

    /// Whether this bin is the left child of its parent.
    pub fn is_left(self) -> bool {
        self.0 & (self.tail_bit() << 1) == 0
    }

    /// Whether this bin is the right child of its parent.
    pub fn is_right(self) -> bool {
        !self.is_left()
    }

    /// Whether `other`'s chunk range is a subset of this bin's range.
    ///
    /// `false` whenever either side is `NONE`; `ALL` contains every finite
    /// bin.
    pub fn contains(self, other: Bin) -> bool {
        if self.is_none() || other.is_none() {
            return false;
        }
        (self.0 & (self.0 + 1)) <= other.0 && other.0 < (self.0 | (self.0 + 1))
    }

    /// The child whose range contains `dest`; `NONE` when `dest` is not a
    /// strict descendant of this bin.
    pub fn towards(self, dest: Bin) -> Bin {
        if !self.contains(dest) || self == dest {
            return Bin::NONE;
        }
        let left = self.left();
        if left.contains(dest) {
            left
        } else {
            self.right()
        }
    }

    /// Decompose `[0, length)` into the minimal ordered run of maximal
    /// disjoint bins: one peak per set bit of `length`, descending layer,
    /// contiguous left to right.
    ///
    /// `peaks(7)` is `[(2,0), (1,2), (0,6)]`.
    pub fn peaks(length: u64) -> Vec<Bin> {
        let mut peaks = Vec::with_capacity(length.count_ones() as usize);
        let mut covered: u64 = 0;
        for layer in (0..63).rev() {
            if (length >> layer) & 1 == 1 {
                peaks.push(Bin::new(layer, covered >> layer));
                covered += 1u64 << layer;
            }
        }
        peaks
    }

    /// The compact 32-bit wire form.
    ///
    /// `ALL` maps to [`ALL32`]; `NONE` and any bin whose value does not fit
    /// below `ALL32` map to [`NONE32`].
    pub fn to_u32(self) -> u32 {
        if self.is_all() {
            ALL32
        } else if self.0 < ALL32 as u64 {
            self.0 as u32
        } else {
            NONE32
        }
    }

    /// Decode the compact 32-bit wire form.
    pub fn from_u32(v: u32) -> Bin {
        match v {
            ALL32 => Bin::ALL,
            NONE32 => Bin::NONE,
            _ => Bin(v as u64),
        }
    }
}

impl fmt::Display for Bin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            write!(f, "(ALL)")
        } else if self.is_none() {
            write!(f, "(NONE)")
        } else {
            write!(f, "({},{})", self.layer(), self.layer_offset())
        }
    }
}

impl fmt::Debug for Bin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
