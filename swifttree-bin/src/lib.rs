//! Bin-number addressing and completion bitmaps.
//!
//! A *bin* identifies one aligned dyadic interval `[o * 2^l, (o + 1) * 2^l)`
//! of chunk indices with a single `u64`, so a whole binary tree of intervals
//! can be navigated with plain bit arithmetic and no node allocation.
//!
//! # Core types
//!
//! - [`Bin`] — the interval address (layer/offset encode, parent/child/
//!   sibling navigation, containment, peak decomposition).
//! - [`BinMap`] — a presence bitmap over the leaf span of a root bin, with
//!   range set/clear/query and gap search.

#![warn(missing_docs)]

mod bin;
mod binmap;

pub use bin::{Bin, ALL32, NONE32};
pub use binmap::BinMap;
