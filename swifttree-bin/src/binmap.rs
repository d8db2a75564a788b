//! Completion bitmap over the leaf span of a root bin.
//!
//! Internal bins carry no truth of their own: a bin is *filled* iff every
//! base bin beneath it is present and *empty* iff none is. The map stores
//! the present set as an ordered run of disjoint, non-adjacent stripes
//! (`[start, end)` chunk ranges), so every operation touches only the
//! stripes adjacent to the queried range and stays near-logarithmic even
//! for spans of 2^30+ chunks.

use std::collections::BTreeMap;

use crate::Bin;

/// Presence bitmap over the chunk range of a chosen root bin.
#[derive(Clone, Debug)]
pub struct BinMap {
    root: Bin,
    // start -> end, disjoint and never touching (merged eagerly).
    stripes: BTreeMap<u64, u64>,
    present: u64,
}

impl BinMap {
    /// An empty map over `root`'s chunk span.
    ///
    /// `root` must be a finite bin (not `NONE`/`ALL`).
    pub fn new(root: Bin) -> BinMap {
        debug_assert!(!root.is_none() && !root.is_all());
        BinMap {
            root,
            stripes: BTreeMap::new(),
            present: 0,
        }
    }

    /// The root bin this map is bound to.
    pub fn root(&self) -> Bin {
        self.root
    }

    /// Rebind to a new root, clearing all presence state.
    pub fn reset_to(&mut self, root: Bin) {
        debug_assert!(!root.is_none() && !root.is_all());
        self.root = root;
        self.stripes.clear();
        self.present = 0;
    }

    // The covered chunk range `[lo, hi)`.
    fn span(&self) -> (u64, u64) {
        let lo = self.root.base_offset();
        (lo, lo + self.root.base_length())
    }

    // `bin`'s chunk range clipped to the span; `None` when nothing remains.
    fn clamp(&self, bin: Bin) -> Option<(u64, u64)> {
        if bin.is_none() {
            return None;
        }
        let (lo, hi) = self.span();
        if bin.is_all() {
            return Some((lo, hi));
        }
        let s = bin.base_offset().max(lo);
        let e = (bin.base_offset() + bin.base_length()).min(hi);
        (s < e).then_some((s, e))
    }

    /// Mark every base bin under `bin` present. Idempotent; `NONE` is a
    /// no-op and out-of-span parts are ignored.
    pub fn set(&mut self, bin: Bin) {
        let Some((s, e)) = self.clamp(bin) else {
            return;
        };
        let mut start = s;
        let mut end = e;
        let mut absorbed = Vec::new();
        // Walk left over stripes that overlap or touch [s, e).
        for (&ss, &se) in self.stripes.range(..=end).rev() {
            if se < start {
                break;
            }
            absorbed.push(ss);
            start = start.min(ss);
            end = end.max(se);
        }
        for ss in absorbed {
            let se = self.stripes.remove(&ss).unwrap_or(ss);
            self.present -= se - ss;
        }
        self.present += end - start;
        self.stripes.insert(start, end);
    }

    /// Mark every base bin under `bin` absent. Idempotent.
    pub fn clear(&mut self, bin: Bin) {
        let Some((s, e)) = self.clamp(bin) else {
            return;
        };
        let mut split = Vec::new();
        for (&ss, &se) in self.stripes.range(..e).rev() {
            if se <= s {
                break;
            }
            split.push((ss, se));
        }
        for (ss, se) in split {
            self.stripes.remove(&ss);
            self.present -= se.min(e) - ss.max(s);
            if ss < s {
                self.stripes.insert(ss, s);
            }
            if se > e {
                self.stripes.insert(e, se);
            }
        }
    }

    /// Whether no base bin under `bin` is present.
    pub fn is_empty(&self, bin: Bin) -> bool {
        let Some((s, e)) = self.clamp(bin) else {
            return true;
        };
        match self.stripes.range(..e).next_back() {
            Some((_, &se)) => se <= s,
            None => true,
        }
    }

    /// Whether every base bin under `bin` is present.
    pub fn is_filled(&self, bin: Bin) -> bool {
        let Some((s, e)) = self.clamp(bin) else {
            return false;
        };
        match self.stripes.range(..=s).next_back() {
            Some((_, &se)) => se >= e,
            None => false,
        }
    }

    /// Whether the whole span is empty.
    pub fn is_empty_all(&self) -> bool {
        self.stripes.is_empty()
    }

    /// Some maximal filled bin within `from`'s span, or `NONE`.
    pub fn find(&self, from: Bin) -> Bin {
        let Some((s, e)) = self.clamp(from) else {
            return Bin::NONE;
        };
        let Some((&ss, &se)) = self.stripes.range(..e).next_back() else {
            return Bin::NONE;
        };
        if se <= s {
            return Bin::NONE;
        }
        max_bin_in(ss.max(s), se.min(e))
    }

    /// The smallest-offset maximal empty bin, or `NONE` when the span is
    /// completely filled.
    pub fn find_empty(&self) -> Bin {
        let (lo, hi) = self.span();
        let gap = match self.stripes.iter().next() {
            Some((&ss, &se)) if ss <= lo => se,
            _ => lo,
        };
        if gap >= hi {
            return Bin::NONE;
        }
        let bound = self
            .stripes
            .range(gap..)
            .next()
            .map(|(&ss, _)| ss)
            .unwrap_or(hi)
            .min(hi);
        max_bin_in(gap, bound)
    }

    /// The number of present base bins.
    pub fn size(&self) -> u64 {
        self.present
    }

    /// The present set as a minimal ordered list of `[start, end)` chunk
    /// ranges.
    pub fn stripes(&self) -> Vec<(u64, u64)> {
        self.stripes.iter().map(|(&s, &e)| (s, e)).collect()
    }
}

// The largest aligned dyadic bin anchored at `lo` that fits within
// `[lo, hi)`.
fn max_bin_in(lo: u64, hi: u64) -> Bin {
    debug_assert!(lo < hi);
    let align = if lo == 0 { 62 } else { lo.trailing_zeros() };
    let fit = 63 - (hi - lo).leading_zeros();
    let layer = align.min(fit).min(62);
    Bin::new(layer, lo >> layer)
}
