//! PooledSet: hash set over a sorted hash index and a pooled buffer
//!
//! Elements live in one contiguous pooled buffer ordered by their hash
//! codes; a parallel sorted hash index gives membership tests
//! O(log n + run length) binary-search lookup without buckets or
//! chaining. Insert and remove shift the tail of both arrays, keeping
//! storage contiguous and cache-friendly for small-to-moderate element
//! counts.

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::slice;

use ahash::RandomState;

use crate::containers::sorted_index::{SlotLookup, SortedHashIndex};
use crate::error::Result;
use crate::memory::PooledBuffer;

/// Hash set over pool-leased contiguous storage
///
/// Equality, not hash equality, is the final arbiter of membership:
/// distinct elements sharing a hash code coexist and are disambiguated by
/// `Eq`. Iteration order follows the hash order and is deterministic for
/// a fixed hasher and a fixed operation sequence.
///
/// # Examples
///
/// ```rust
/// use repool::PooledSet;
///
/// let mut set = PooledSet::new();
/// assert!(set.insert(3)?);
/// assert!(!set.insert(3)?);
/// assert!(set.contains(&3));
/// assert!(set.remove(&3));
/// assert!(set.is_empty());
/// # Ok::<(), repool::RepoolError>(())
/// ```
pub struct PooledSet<T, S = RandomState> {
    entries: PooledBuffer<T>,
    index: SortedHashIndex,
    len: usize,
    hash_builder: S,
}

impl<T: Hash + Eq> PooledSet<T, RandomState> {
    /// Create a new empty set
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    /// Create a set with at least the specified capacity
    pub fn with_capacity(cap: usize) -> Result<Self> {
        Self::with_capacity_and_hasher(cap, RandomState::new())
    }

    /// Create a set over fixed, non-growable storage of exactly `cap` slots
    pub fn with_fixed_capacity(cap: usize) -> Self {
        Self::with_fixed_capacity_and_hasher(cap, RandomState::new())
    }

    /// Create a set holding the distinct elements of `items`
    pub fn from_slice(items: &[T]) -> Result<Self>
    where
        T: Clone,
    {
        let mut set = Self::with_capacity(items.len())?;
        for item in items {
            set.insert(item.clone())?;
        }
        Ok(set)
    }
}

impl<T: Hash + Eq, S: BuildHasher> PooledSet<T, S> {
    /// Create a new empty set using the given hasher
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            entries: PooledBuffer::new(),
            index: SortedHashIndex::new(),
            len: 0,
            hash_builder,
        }
    }

    /// Create a set with at least the specified capacity and the given hasher
    pub fn with_capacity_and_hasher(cap: usize, hash_builder: S) -> Result<Self> {
        Ok(Self {
            entries: PooledBuffer::with_capacity(cap)?,
            index: SortedHashIndex::with_capacity(cap)?,
            len: 0,
            hash_builder,
        })
    }

    /// Create a set over fixed storage of exactly `cap` slots and the given
    /// hasher
    ///
    /// Both the element and hash arrays are non-growable; exceeding the
    /// capacity surfaces `CapacityExceeded` before any mutation.
    pub fn with_fixed_capacity_and_hasher(cap: usize, hash_builder: S) -> Self {
        Self {
            entries: PooledBuffer::with_fixed_capacity(cap),
            index: SortedHashIndex::with_fixed_capacity(cap),
            len: 0,
            hash_builder,
        }
    }

    /// Get the number of elements in the set
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the set is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the capacity of the set
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Get a reference to the set's hasher
    #[inline]
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Get the elements as a slice, in hash order
    ///
    /// The borrow is a view into the live region; it ends before the next
    /// mutating call, which the borrow checker enforces.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        if self.len == 0 {
            &[]
        } else {
            // SAFETY: [0, len) is initialized.
            unsafe { slice::from_raw_parts(self.entries.as_ptr(), self.len) }
        }
    }

    /// Iterate over the elements in hash order
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    #[inline]
    fn hash_of(&self, value: &T) -> u64 {
        self.hash_builder.hash_one(value)
    }

    /// Locate `value`: the slot holding it, or the sort-preserving
    /// insertion slot.
    fn find_slot(&self, hash: u64, value: &T) -> SlotLookup {
        let entries = &self.entries;
        self.index.locate(self.len, hash, |i| {
            // SAFETY: the index only probes slots inside the live region.
            unsafe { entries.get_unchecked(i) == value }
        })
    }

    /// Add a value to the set
    ///
    /// Returns `true` when the value was inserted, `false` when it was
    /// already present (the set is left unchanged).
    pub fn insert(&mut self, value: T) -> Result<bool> {
        let hash = self.hash_of(&value);
        match self.find_slot(hash, &value) {
            SlotLookup::Found(_) => Ok(false),
            SlotLookup::Vacant(index) => {
                self.insert_at(index, value, hash)?;
                Ok(true)
            }
        }
    }

    /// Remove a value from the set
    ///
    /// Returns `true` when the value was present and removed.
    pub fn remove(&mut self, value: &T) -> bool {
        match self.find_slot(self.hash_of(value), value) {
            SlotLookup::Found(index) => {
                self.remove_at(index);
                true
            }
            SlotLookup::Vacant(_) => false,
        }
    }

    /// Remove a value from the set, yielding the stored element
    pub fn take(&mut self, value: &T) -> Option<T> {
        match self.find_slot(self.hash_of(value), value) {
            SlotLookup::Found(index) => Some(self.remove_at(index)),
            SlotLookup::Vacant(_) => None,
        }
    }

    /// Check whether the set contains a value
    pub fn contains(&self, value: &T) -> bool {
        matches!(self.find_slot(self.hash_of(value), value), SlotLookup::Found(_))
    }

    /// Get a reference to the stored element equal to `value`
    pub fn get(&self, value: &T) -> Option<&T> {
        match self.find_slot(self.hash_of(value), value) {
            // SAFETY: Found indices are inside the live region.
            SlotLookup::Found(index) => Some(unsafe { self.entries.get_unchecked(index) }),
            SlotLookup::Vacant(_) => None,
        }
    }

    /// Ensure the set can hold at least `min_cap` elements
    pub fn ensure_capacity(&mut self, min_cap: usize) -> Result<()> {
        // SAFETY: [0, len) is the initialized live region.
        unsafe { self.entries.ensure_capacity(self.len, min_cap)? };
        self.index.ensure_capacity(self.len, min_cap)
    }

    /// Shrink both arrays to exactly the current length
    pub fn trim_excess(&mut self) -> Result<()> {
        // SAFETY: [0, len) is the initialized live region.
        unsafe { self.entries.trim_excess(self.len)? };
        self.index.trim_excess(self.len)
    }

    /// Clear all elements, keeping the capacity
    pub fn clear(&mut self) {
        let len = self.len;
        self.len = 0;
        // SAFETY: [0, len) was the initialized live region.
        unsafe { self.entries.drop_range(len) };
    }

    /// Drop all elements and return any leased memory to the pool
    ///
    /// Idempotent; the set remains usable and re-grows from the pool.
    pub fn dispose(&mut self) {
        self.clear();
        self.entries.dispose();
        self.index.dispose();
    }

    /// Add every element of `other` to the set
    pub fn union_with(&mut self, other: &Self) -> Result<()>
    where
        T: Clone,
    {
        for value in other.iter() {
            self.insert(value.clone())?;
        }
        Ok(())
    }

    /// Remove every element not present in `other`
    pub fn intersect_with(&mut self, other: &Self) {
        let mut i = self.len;
        while i > 0 {
            i -= 1;
            // SAFETY: i < len, the live region.
            let keep = other.contains(unsafe { self.entries.get_unchecked(i) });
            if !keep {
                self.remove_at(i);
            }
        }
    }

    /// Remove every element present in `other`
    pub fn except_with(&mut self, other: &Self) {
        let mut i = self.len;
        while i > 0 {
            i -= 1;
            // SAFETY: i < len, the live region.
            let drop_it = other.contains(unsafe { self.entries.get_unchecked(i) });
            if drop_it {
                self.remove_at(i);
            }
        }
    }

    /// Keep exactly the elements present in one of `self` and `other` but
    /// not both
    ///
    /// Snapshots the current contents before mutating, then rebuilds:
    /// first the elements of `other` absent from the snapshot, then the
    /// elements of the snapshot absent from `other`.
    pub fn symmetric_except_with(&mut self, other: &Self) -> Result<()>
    where
        T: Clone,
        S: Clone,
    {
        let snapshot = self.clone();
        self.clear();
        for value in other.iter() {
            if !snapshot.contains(value) {
                self.insert(value.clone())?;
            }
        }
        for value in snapshot.iter() {
            if !other.contains(value) {
                self.insert(value.clone())?;
            }
        }
        Ok(())
    }

    /// Check whether every element of the set is present in `other`
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.len <= other.len && self.iter().all(|value| other.contains(value))
    }

    /// Check whether the set contains every element of `other`
    pub fn is_superset_of(&self, other: &Self) -> bool {
        other.is_subset_of(self)
    }

    /// Check whether the set shares at least one element with `other`
    pub fn overlaps(&self, other: &Self) -> bool {
        let (small, large) = if self.len <= other.len {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().any(|value| large.contains(value))
    }

    /// Check whether the set holds exactly the elements of `other`
    pub fn set_equals(&self, other: &Self) -> bool {
        self.len == other.len && self.is_subset_of(other)
    }

    /// Insert `value` with `hash` at `index`, shifting both arrays.
    ///
    /// Capacity for both arrays is ensured before either is touched, so a
    /// failing insert has no observable effect.
    fn insert_at(&mut self, index: usize, value: T, hash: u64) -> Result<()> {
        let required = self.len + 1;
        // SAFETY: [0, len) is the initialized live region.
        unsafe { self.entries.ensure_capacity(self.len, required)? };
        self.index.ensure_capacity(self.len, required)?;
        // SAFETY: capacity ensured, index <= len.
        unsafe {
            self.entries.shift_right(index, self.len);
            self.entries.write(index, value);
        }
        self.index.record_insert(self.len, index, hash);
        self.len += 1;
        Ok(())
    }

    /// Remove and return the element at `index`, shifting both arrays.
    fn remove_at(&mut self, index: usize) -> T {
        debug_assert!(index < self.len);
        // SAFETY: index < len; the slot is vacated and the gap closed.
        let value = unsafe {
            let value = self.entries.read(index);
            self.entries.shift_left(index, self.len);
            value
        };
        self.index.record_remove(self.len, index);
        self.len -= 1;
        value
    }
}

impl<T: Hash + Eq> Default for PooledSet<T, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> Drop for PooledSet<T, S> {
    fn drop(&mut self) {
        let len = self.len;
        self.len = 0;
        // SAFETY: [0, len) was the initialized live region.
        unsafe { self.entries.drop_range(len) };
    }
}

impl<T: fmt::Debug + Hash + Eq, S: BuildHasher> fmt::Debug for PooledSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Hash + Eq, S: BuildHasher> PartialEq for PooledSet<T, S> {
    fn eq(&self, other: &Self) -> bool {
        self.set_equals(other)
    }
}

impl<T: Hash + Eq, S: BuildHasher> Eq for PooledSet<T, S> {}

impl<T: Clone + Hash + Eq, S: BuildHasher + Clone> Clone for PooledSet<T, S> {
    fn clone(&self) -> Self {
        let mut set = Self::with_capacity_and_hasher(self.len, self.hash_builder.clone())
            .expect("allocation failed cloning PooledSet");
        for i in 0..self.len {
            // Appending in slot order reproduces the exact layout,
            // including the order within collision runs.
            // SAFETY: i < self.len, and capacity for self.len was ensured.
            unsafe {
                set.entries
                    .write(i, self.entries.get_unchecked(i).clone());
            }
            set.index
                .record_insert(i, i, self.index.hash_at(self.len, i));
            set.len += 1;
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::Hasher;

    /// Forces every value into one collision run.
    #[derive(Clone, Default)]
    struct ConstantState;

    impl BuildHasher for ConstantState {
        type Hasher = ConstantHasher;

        fn build_hasher(&self) -> ConstantHasher {
            ConstantHasher
        }
    }

    struct ConstantHasher;

    impl Hasher for ConstantHasher {
        fn finish(&self) -> u64 {
            0
        }

        fn write(&mut self, _bytes: &[u8]) {}
    }

    fn set_of(values: &[i32]) -> PooledSet<i32> {
        PooledSet::from_slice(values).unwrap()
    }

    #[test]
    fn test_insert_remove_contains() {
        let mut set = PooledSet::new();
        assert!(set.insert(1).unwrap());
        assert!(set.insert(2).unwrap());
        assert!(!set.insert(1).unwrap());
        assert_eq!(set.len(), 2);

        assert!(set.contains(&1));
        assert!(set.contains(&2));
        assert!(!set.contains(&3));

        assert!(set.remove(&1));
        assert!(!set.remove(&1));
        assert!(!set.contains(&1));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_get_and_take() {
        let mut set = set_of(&[10, 20]);
        assert_eq!(set.get(&10), Some(&10));
        assert_eq!(set.get(&30), None);

        assert_eq!(set.take(&20), Some(20));
        assert_eq!(set.take(&20), None);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_hashes_stay_sorted() {
        let mut set = PooledSet::new();
        for v in [5i64, -3, 99, 0, 42, -77, 13] {
            set.insert(v).unwrap();
        }
        set.remove(&99);
        set.remove(&-3);

        let hashes: Vec<u64> = set
            .as_slice()
            .iter()
            .map(|v| set.hasher().hash_one(v))
            .collect();
        assert!(hashes.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_forced_collisions() {
        let mut set = PooledSet::with_hasher(ConstantState);
        for v in 0..50 {
            assert!(set.insert(v).unwrap());
        }
        for v in 0..50 {
            assert!(!set.insert(v).unwrap());
            assert!(set.contains(&v));
        }
        for v in (0..50).step_by(2) {
            assert!(set.remove(&v));
        }
        for v in 0..50 {
            assert_eq!(set.contains(&v), v % 2 == 1);
        }
        assert_eq!(set.len(), 25);
    }

    #[test]
    fn test_collision_run_preserves_insertion_order() {
        let mut set = PooledSet::with_hasher(ConstantState);
        for v in [30, 10, 20] {
            set.insert(v).unwrap();
        }
        // All hashes equal: run order is insertion order.
        assert_eq!(set.as_slice(), &[30, 10, 20]);
    }

    #[test]
    fn test_union_with() {
        let mut a = set_of(&[1, 2, 3]);
        let b = set_of(&[3, 4, 5]);
        a.union_with(&b).unwrap();

        assert_eq!(a.len(), 5);
        for v in 1..=5 {
            assert!(a.contains(&v));
        }
        assert!(a.is_superset_of(&b));
    }

    #[test]
    fn test_intersect_with() {
        let mut a = set_of(&[1, 2, 3, 4]);
        let b = set_of(&[2, 4, 6]);
        a.intersect_with(&b);

        assert_eq!(a.len(), 2);
        assert!(a.contains(&2));
        assert!(a.contains(&4));
        assert!(a.is_subset_of(&b));
    }

    #[test]
    fn test_except_with() {
        let mut a = set_of(&[1, 2, 3, 4]);
        let b = set_of(&[2, 4]);
        a.except_with(&b);

        assert_eq!(a.len(), 2);
        assert!(a.contains(&1));
        assert!(a.contains(&3));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_symmetric_except_with() {
        let mut a = set_of(&[1, 2, 3]);
        let b = set_of(&[2, 3, 4]);
        a.symmetric_except_with(&b).unwrap();

        assert_eq!(a.len(), 2);
        assert!(a.contains(&1));
        assert!(a.contains(&4));
    }

    #[test]
    fn test_symmetric_except_with_self_empties() {
        let mut a = set_of(&[1, 2, 3]);
        let same = a.clone();
        a.symmetric_except_with(&same).unwrap();
        assert!(a.is_empty());
    }

    #[test]
    fn test_subset_superset_overlap() {
        let a = set_of(&[1, 2]);
        let b = set_of(&[1, 2, 3]);
        let c = set_of(&[4, 5]);

        assert!(a.is_subset_of(&a));
        assert!(a.is_subset_of(&b));
        assert!(!b.is_subset_of(&a));
        assert!(b.is_superset_of(&a));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!a.set_equals(&b));
        assert!(a.set_equals(&a.clone()));
    }

    #[test]
    fn test_capacity_and_trim() {
        let mut set = PooledSet::with_capacity(64).unwrap();
        for v in 0..10 {
            set.insert(v).unwrap();
        }
        assert!(set.capacity() >= 64);

        set.trim_excess().unwrap();
        assert_eq!(set.capacity(), 10);
        for v in 0..10 {
            assert!(set.contains(&v));
        }
    }

    #[test]
    fn test_ensure_capacity_then_fill_never_regrows() {
        let mut set = PooledSet::new();
        set.ensure_capacity(32).unwrap();
        let cap = set.capacity();
        for v in 0..32 {
            set.insert(v).unwrap();
        }
        assert_eq!(set.capacity(), cap);
    }

    #[test]
    fn test_fixed_capacity() {
        let mut set = PooledSet::with_fixed_capacity(2);
        assert!(set.insert(1).unwrap());
        assert!(set.insert(2).unwrap());

        let err = set.insert(3).unwrap_err();
        assert_eq!(err.category(), "capacity");
        assert_eq!(set.len(), 2);
        assert!(!set.contains(&3));

        // Re-adding an existing value is still a no-op, not an error.
        assert!(!set.insert(1).unwrap());

        assert!(set.remove(&1));
        assert!(set.insert(3).unwrap());
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut set = set_of(&[1, 2, 3]);
        set.dispose();
        assert_eq!(set.len(), 0);
        assert_eq!(set.capacity(), 0);
        set.dispose();
        assert_eq!(set.len(), 0);

        set.insert(7).unwrap();
        assert!(set.contains(&7));
    }

    #[test]
    fn test_clone_preserves_layout() {
        let mut set = PooledSet::with_hasher(ConstantState);
        for v in [3, 1, 2] {
            set.insert(v).unwrap();
        }
        let cloned = set.clone();
        assert_eq!(set.as_slice(), cloned.as_slice());
    }

    #[test]
    fn test_string_elements_drop() {
        let mut set = PooledSet::new();
        for v in ["alpha", "beta", "gamma"] {
            set.insert(v.to_string()).unwrap();
        }
        assert!(set.contains(&"beta".to_string()));
        set.remove(&"beta".to_string());
        assert_eq!(set.len(), 2);
    }
}
