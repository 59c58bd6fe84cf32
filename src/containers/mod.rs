//! Container flavors over pool-leased contiguous storage
//!
//! Three flavors share one storage discipline:
//!
//! - **[`PooledVec<T>`]** - dynamic array with positional access and
//!   linear search, insertion order only
//! - **[`PooledSet<T, S>`]** - hash set indexed by a sorted hash-code
//!   array, with full set algebra
//! - **[`PooledMap<K, V, S>`]** - hash map with the same indexing
//!   discipline, keyed by the key component of each entry
//!
//! Every mutating call first asks the buffer layer for capacity, then (for
//! set and map) the sorted index locates or computes the target slot, then
//! the shift happens in both parallel arrays. Read-only consumers borrow a
//! view into the live region.

pub mod map;
pub mod sequence;
pub mod set;
pub(crate) mod sorted_index;
pub mod traits;

pub use map::PooledMap;
pub use sequence::PooledVec;
pub use set::PooledSet;
pub use traits::PooledContainer;
