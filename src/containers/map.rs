//! PooledMap: hash map over a sorted hash index and a pooled buffer
//!
//! Entries are `(K, V)` pairs stored in one contiguous pooled buffer
//! ordered by key hash; equality and hashing apply only to the key. The
//! indexing discipline is shared with [`PooledSet`]: binary search to the
//! start of the equal-hash run, then a key-equality scan.
//!
//! [`PooledSet`]: super::set::PooledSet

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::mem;
use std::slice;

use ahash::RandomState;

use crate::containers::sorted_index::{SlotLookup, SortedHashIndex};
use crate::error::{RepoolError, Result};
use crate::memory::PooledBuffer;

/// Hash map over pool-leased contiguous storage
///
/// # Examples
///
/// ```rust
/// use repool::PooledMap;
///
/// let mut map = PooledMap::new();
/// map.insert("answer", 42)?;
/// assert_eq!(map.get(&"answer"), Some(&42));
/// assert_eq!(map.insert("answer", 43)?, Some(42));
/// # Ok::<(), repool::RepoolError>(())
/// ```
pub struct PooledMap<K, V, S = RandomState> {
    entries: PooledBuffer<(K, V)>,
    index: SortedHashIndex,
    len: usize,
    hash_builder: S,
}

impl<K: Hash + Eq, V> PooledMap<K, V, RandomState> {
    /// Create a new empty map
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    /// Create a map with at least the specified capacity
    pub fn with_capacity(cap: usize) -> Result<Self> {
        Self::with_capacity_and_hasher(cap, RandomState::new())
    }

    /// Create a map over fixed, non-growable storage of exactly `cap` slots
    pub fn with_fixed_capacity(cap: usize) -> Self {
        Self::with_fixed_capacity_and_hasher(cap, RandomState::new())
    }

    /// Create a map holding copies of the given entries; later duplicates
    /// overwrite earlier values
    pub fn from_slice(entries: &[(K, V)]) -> Result<Self>
    where
        K: Clone,
        V: Clone,
    {
        let mut map = Self::with_capacity(entries.len())?;
        for (key, value) in entries {
            map.insert(key.clone(), value.clone())?;
        }
        Ok(map)
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> PooledMap<K, V, S> {
    /// Create a new empty map using the given hasher
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            entries: PooledBuffer::new(),
            index: SortedHashIndex::new(),
            len: 0,
            hash_builder,
        }
    }

    /// Create a map with at least the specified capacity and the given hasher
    pub fn with_capacity_and_hasher(cap: usize, hash_builder: S) -> Result<Self> {
        Ok(Self {
            entries: PooledBuffer::with_capacity(cap)?,
            index: SortedHashIndex::with_capacity(cap)?,
            len: 0,
            hash_builder,
        })
    }

    /// Create a map over fixed storage of exactly `cap` slots and the given
    /// hasher
    pub fn with_fixed_capacity_and_hasher(cap: usize, hash_builder: S) -> Self {
        Self {
            entries: PooledBuffer::with_fixed_capacity(cap),
            index: SortedHashIndex::with_fixed_capacity(cap),
            len: 0,
            hash_builder,
        }
    }

    /// Get the number of entries in the map
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the map is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the capacity of the map
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Get a reference to the map's hasher
    #[inline]
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Get the entries as a slice, in key-hash order
    ///
    /// The borrow is a view into the live region; it ends before the next
    /// mutating call, which the borrow checker enforces.
    #[inline]
    pub fn as_slice(&self) -> &[(K, V)] {
        if self.len == 0 {
            &[]
        } else {
            // SAFETY: [0, len) is initialized.
            unsafe { slice::from_raw_parts(self.entries.as_ptr(), self.len) }
        }
    }

    /// Iterate over `(&key, &value)` pairs in key-hash order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.as_slice().iter().map(|(key, value)| (key, value))
    }

    /// Iterate over the keys in key-hash order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.as_slice().iter().map(|(key, _)| key)
    }

    /// Iterate over the values in key-hash order
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.as_slice().iter().map(|(_, value)| value)
    }

    #[inline]
    fn hash_of(&self, key: &K) -> u64 {
        self.hash_builder.hash_one(key)
    }

    /// Locate `key`: the slot holding it, or the sort-preserving insertion
    /// slot.
    fn find_slot(&self, hash: u64, key: &K) -> SlotLookup {
        let entries = &self.entries;
        self.index.locate(self.len, hash, |i| {
            // SAFETY: the index only probes slots inside the live region.
            unsafe { &entries.get_unchecked(i).0 == key }
        })
    }

    /// Insert or overwrite the value for `key`
    ///
    /// When the key is already present the value is overwritten in place
    /// and the old value is returned; the slot's position and the hash
    /// ordering are unchanged since the key is unchanged.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        let hash = self.hash_of(&key);
        match self.find_slot(hash, &key) {
            SlotLookup::Found(index) => {
                // SAFETY: index < len, the live region.
                let slot = unsafe { self.entries.get_unchecked_mut(index) };
                Ok(Some(mem::replace(&mut slot.1, value)))
            }
            SlotLookup::Vacant(index) => {
                self.insert_at(index, (key, value), hash)?;
                Ok(None)
            }
        }
    }

    /// Add a new key/value entry
    ///
    /// Fails with [`RepoolError::DuplicateKey`] when the key already
    /// exists; the map is left unchanged.
    pub fn add(&mut self, key: K, value: V) -> Result<()> {
        let hash = self.hash_of(&key);
        match self.find_slot(hash, &key) {
            SlotLookup::Found(_) => Err(RepoolError::duplicate_key()),
            SlotLookup::Vacant(index) => self.insert_at(index, (key, value), hash),
        }
    }

    /// Add a new key/value entry unless the key already exists
    ///
    /// Returns `true` when the entry was added, `false` when the key was
    /// already present (the existing value is kept).
    pub fn try_insert(&mut self, key: K, value: V) -> Result<bool> {
        let hash = self.hash_of(&key);
        match self.find_slot(hash, &key) {
            SlotLookup::Found(_) => Ok(false),
            SlotLookup::Vacant(index) => {
                self.insert_at(index, (key, value), hash)?;
                Ok(true)
            }
        }
    }

    /// Get a reference to the value for `key`
    pub fn get(&self, key: &K) -> Option<&V> {
        match self.find_slot(self.hash_of(key), key) {
            // SAFETY: Found indices are inside the live region.
            SlotLookup::Found(index) => Some(unsafe { &self.entries.get_unchecked(index).1 }),
            SlotLookup::Vacant(_) => None,
        }
    }

    /// Get a mutable reference to the value for `key`
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        match self.find_slot(self.hash_of(key), key) {
            // SAFETY: Found indices are inside the live region.
            SlotLookup::Found(index) => {
                Some(unsafe { &mut self.entries.get_unchecked_mut(index).1 })
            }
            SlotLookup::Vacant(_) => None,
        }
    }

    /// Get a reference to the value for `key`, failing when absent
    ///
    /// The required-lookup counterpart of [`PooledMap::get`]: fails with
    /// [`RepoolError::KeyNotFound`] instead of returning `None`.
    pub fn fetch(&self, key: &K) -> Result<&V> {
        self.get(key).ok_or_else(RepoolError::key_not_found)
    }

    /// Check whether the map contains `key`
    pub fn contains_key(&self, key: &K) -> bool {
        matches!(self.find_slot(self.hash_of(key), key), SlotLookup::Found(_))
    }

    /// Check whether any entry holds `value`
    ///
    /// Only keys are indexed, so this is an O(len) linear scan.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.as_slice().iter().any(|(_, v)| v == value)
    }

    /// Remove the entry for `key`, returning its value
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Remove the entry for `key`, returning the stored key and value
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        match self.find_slot(self.hash_of(key), key) {
            SlotLookup::Found(index) => Some(self.remove_at(index)),
            SlotLookup::Vacant(_) => None,
        }
    }

    /// Ensure the map can hold at least `min_cap` entries
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

    /// Clear all entries, keeping the capacity
    pub fn clear(&mut self) {
        let len = self.len;
        self.len = 0;
        // SAFETY: [0, len) was the initialized live region.
        unsafe { self.entries.drop_range(len) };
    }

    /// Drop all entries and return any leased memory to the pool
    ///
    /// Idempotent; the map remains usable and re-grows from the pool.
    pub fn dispose(&mut self) {
        self.clear();
        self.entries.dispose();
        self.index.dispose();
    }

    /// Insert `entry` with `hash` at `index`, shifting both arrays.
    ///
    /// Capacity for both arrays is ensured before either is touched, so a
    /// failing insert has no observable effect.
    fn insert_at(&mut self, index: usize, entry: (K, V), hash: u64) -> Result<()> {
        let required = self.len + 1;
        // SAFETY: [0, len) is the initialized live region.
        unsafe { self.entries.ensure_capacity(self.len, required)? };
        self.index.ensure_capacity(self.len, required)?;
        // SAFETY: capacity ensured, index <= len.
        unsafe {
            self.entries.shift_right(index, self.len);
            self.entries.write(index, entry);
        }
        self.index.record_insert(self.len, index, hash);
        self.len += 1;
        Ok(())
    }

    /// Remove and return the entry at `index`, shifting both arrays.
    fn remove_at(&mut self, index: usize) -> (K, V) {
        debug_assert!(index < self.len);
        // SAFETY: index < len; the slot is vacated and the gap closed.
        let entry = unsafe {
            let entry = self.entries.read(index);
            self.entries.shift_left(index, self.len);
            entry
        };
        self.index.record_remove(self.len, index);
        self.len -= 1;
        entry
    }
}

impl<K: Hash + Eq, V> Default for PooledMap<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> Drop for PooledMap<K, V, S> {
    fn drop(&mut self) {
        let len = self.len;
        self.len = 0;
        // SAFETY: [0, len) was the initialized live region.
        unsafe { self.entries.drop_range(len) };
    }
}

impl<K: fmt::Debug + Hash + Eq, V: fmt::Debug, S: BuildHasher> fmt::Debug for PooledMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Clone for PooledMap<K, V, S>
where
    K: Clone + Hash + Eq,
    V: Clone,
    S: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        let mut map = Self::with_capacity_and_hasher(self.len, self.hash_builder.clone())
            .expect("allocation failed cloning PooledMap");
        for i in 0..self.len {
            // Appending in slot order reproduces the exact layout,
            // including the order within collision runs.
            // SAFETY: i < self.len, and capacity for self.len was ensured.
            unsafe {
                map.entries
                    .write(i, self.entries.get_unchecked(i).clone());
            }
            map.index
                .record_insert(i, i, self.index.hash_at(self.len, i));
            map.len += 1;
        }
        map
    }
}
