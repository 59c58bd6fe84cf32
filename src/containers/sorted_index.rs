//! SortedHashIndex: the ascending hash-code array behind set and map
//!
//! The index is a contiguous array of `u64` hash codes kept non-decreasing
//! at all times, positionally aligned with the owning engine's element
//! buffer: `hashes[i]` is always the hash of the key at slot `i`. Lookup
//! binary-searches for the left boundary of the run of equal hash codes,
//! then scans the run comparing actual keys, so distinct keys that collide
//! on hash are disambiguated by equality and never by hash alone.
//!
//! The engine owning the index tracks the shared live count and keeps the
//! two arrays in lockstep: every `record_insert`/`record_remove` here is
//! paired with the matching shift in the element buffer.

use crate::error::Result;
use crate::memory::PooledBuffer;

/// Outcome of a run-aware lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotLookup {
    /// An equal entry lives at this slot
    Found(usize),
    /// No equal entry; inserting at this slot preserves the sort order
    Vacant(usize),
}

/// Parallel ascending array of hash codes enabling binary-search lookup
pub(crate) struct SortedHashIndex {
    hashes: PooledBuffer<u64>,
}

impl SortedHashIndex {
    /// Create an empty index with no allocation
    pub const fn new() -> Self {
        Self {
            hashes: PooledBuffer::new(),
        }
    }

    /// Create an index with at least the specified capacity
    pub fn with_capacity(cap: usize) -> Result<Self> {
        Ok(Self {
            hashes: PooledBuffer::with_capacity(cap)?,
        })
    }

    /// Create an index over fixed, non-growable storage
    pub fn with_fixed_capacity(cap: usize) -> Self {
        Self {
            hashes: PooledBuffer::with_fixed_capacity(cap),
        }
    }

    /// Capacity of the hash array in slots
    pub fn capacity(&self) -> usize {
        self.hashes.capacity()
    }

    /// The live hash codes, ascending
    #[inline]
    pub fn hashes(&self, len: usize) -> &[u64] {
        debug_assert!(len <= self.hashes.capacity());
        if len == 0 {
            return &[];
        }
        // SAFETY: the owning engine keeps [0, len) initialized and in
        // lockstep with its element buffer.
        unsafe { std::slice::from_raw_parts(self.hashes.as_ptr(), len) }
    }

    /// Hash code at slot `index`
    #[inline]
    pub fn hash_at(&self, len: usize, index: usize) -> u64 {
        debug_assert!(index < len);
        self.hashes(len)[index]
    }

    /// Find the left boundary of the run of entries equal to `hash`: the
    /// smallest index `i` with `hashes[i] >= hash`.
    ///
    /// Binary search may land anywhere inside a run of equal hash codes;
    /// the partition-point invariant lands on the first slot of the run,
    /// so the subsequent scan sees every member exactly once.
    #[inline]
    pub fn start_of_run(&self, len: usize, hash: u64) -> usize {
        self.hashes(len).partition_point(|&h| h < hash)
    }

    /// Run-aware exact-match scan.
    ///
    /// Scans forward from the start of the run while the hash still
    /// matches, applying the caller's equality probe to each slot. Equality
    /// is the final arbiter: distinct keys sharing a hash coexist in one
    /// run. The vacant position reported on a miss is the correct
    /// insertion index to preserve the sort order.
    pub fn locate(
        &self,
        len: usize,
        hash: u64,
        mut eq: impl FnMut(usize) -> bool,
    ) -> SlotLookup {
        let mut index = self.start_of_run(len, hash);
        while index < len && self.hash_at(len, index) == hash {
            if eq(index) {
                return SlotLookup::Found(index);
            }
            index += 1;
        }
        SlotLookup::Vacant(index)
    }

    /// Ensure room for at least `min_cap` hash codes
    pub fn ensure_capacity(&mut self, len: usize, min_cap: usize) -> Result<()> {
        // SAFETY: [0, len) is the initialized live region.
        unsafe { self.hashes.ensure_capacity(len, min_cap) }
    }

    /// Shrink the hash array to exactly `len` slots
    pub fn trim_excess(&mut self, len: usize) -> Result<()> {
        // SAFETY: [0, len) is the initialized live region.
        unsafe { self.hashes.trim_excess(len) }
    }

    /// Open a slot at `index` and record `hash` there.
    ///
    /// Capacity for `len + 1` slots must already be ensured; the caller
    /// performs the matching shift in the element buffer.
    pub fn record_insert(&mut self, len: usize, index: usize, hash: u64) {
        debug_assert!(index <= len);
        debug_assert!(len < self.hashes.capacity());
        debug_assert!(index == 0 || self.hash_at(len, index - 1) <= hash);
        debug_assert!(index == len || self.hash_at(len, index) >= hash);
        // SAFETY: capacity was ensured by the caller and [0, len) is live.
        unsafe {
            self.hashes.shift_right(index, len);
            self.hashes.write(index, hash);
        }
    }

    /// Close the slot at `index`.
    ///
    /// The caller performs the matching shift in the element buffer.
    pub fn record_remove(&mut self, len: usize, index: usize) {
        debug_assert!(index < len);
        // SAFETY: [0, len) is live; the slot is vacated by shifting.
        unsafe {
            self.hashes.shift_left(index, len);
        }
    }

    /// Return the hash storage to the pool and reset to empty
    pub fn dispose(&mut self) {
        self.hashes.dispose();
    }
}
