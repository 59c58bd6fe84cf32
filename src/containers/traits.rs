//! Capability trait shared by every container flavor

use std::hash::{BuildHasher, Hash};

use crate::containers::{PooledMap, PooledSet, PooledVec};
use crate::error::Result;

/// Common surface of every pooled container
///
/// One seam covering the shared lifecycle of the three flavors: size and
/// capacity queries, explicit capacity control, and disposal that returns
/// leased memory to the pool.
pub trait PooledContainer {
    /// Number of live elements
    fn len(&self) -> usize;

    /// Check whether the container is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physical capacity in elements
    fn capacity(&self) -> usize;

    /// Ensure room for at least `min_cap` elements
    fn ensure_capacity(&mut self, min_cap: usize) -> Result<()>;

    /// Shrink the capacity to exactly the current length
    fn trim_excess(&mut self) -> Result<()>;

    /// Drop all elements and return any leased memory to the pool
    fn dispose(&mut self);
}

impl<T> PooledContainer for PooledVec<T> {
    fn len(&self) -> usize {
        PooledVec::len(self)
    }

    fn capacity(&self) -> usize {
        PooledVec::capacity(self)
    }

    fn ensure_capacity(&mut self, min_cap: usize) -> Result<()> {
        PooledVec::ensure_capacity(self, min_cap)
    }

    fn trim_excess(&mut self) -> Result<()> {
        PooledVec::trim_excess(self)
    }

    fn dispose(&mut self) {
        PooledVec::dispose(self)
    }
}

impl<T: Hash + Eq, S: BuildHasher> PooledContainer for PooledSet<T, S> {
    fn len(&self) -> usize {
        PooledSet::len(self)
    }

    fn capacity(&self) -> usize {
        PooledSet::capacity(self)
    }

    fn ensure_capacity(&mut self, min_cap: usize) -> Result<()> {
        PooledSet::ensure_capacity(self, min_cap)
    }

    fn trim_excess(&mut self) -> Result<()> {
        PooledSet::trim_excess(self)
    }

    fn dispose(&mut self) {
        PooledSet::dispose(self)
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> PooledContainer for PooledMap<K, V, S> {
    fn len(&self) -> usize {
        PooledMap::len(self)
    }

    fn capacity(&self) -> usize {
        PooledMap::capacity(self)
    }

    fn ensure_capacity(&mut self, min_cap: usize) -> Result<()> {
        PooledMap::ensure_capacity(self, min_cap)
    }

    fn trim_excess(&mut self) -> Result<()> {
        PooledMap::trim_excess(self)
    }

    fn dispose(&mut self) {
        PooledMap::dispose(self)
    }
}
