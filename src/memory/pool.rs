//! Shared chunk pool backing every pooled buffer
//!
//! This module provides a process-wide pool of contiguous memory chunks,
//! keyed by power-of-two size class. Buffers lease chunks on growth and
//! return them on resize or disposal, so high-churn containers recycle
//! memory instead of round-tripping the allocator.

use std::alloc::{alloc, dealloc, Layout};
use std::collections::VecDeque;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::error::{RepoolError, Result};

/// Alignment of every pooled chunk (one cache line)
pub const CHUNK_ALIGN: usize = 64;

/// Smallest pooled chunk size in bytes
pub const MIN_CLASS_BYTES: usize = 64;

/// Largest pooled chunk size in bytes; larger requests bypass the pool
pub const MAX_CLASS_BYTES: usize = 1024 * 1024;

/// Number of size classes: powers of two from 64 B through 1 MiB
const NUM_CLASSES: usize = (MAX_CLASS_BYTES.trailing_zeros() - MIN_CLASS_BYTES.trailing_zeros()) as usize + 1;

/// Map a byte count to its size class, or `None` when the request is too
/// large to pool.
#[inline]
pub(crate) fn class_for_bytes(bytes: usize) -> Option<usize> {
    if bytes > MAX_CLASS_BYTES {
        return None;
    }
    let rounded = bytes.next_power_of_two().max(MIN_CLASS_BYTES);
    Some((rounded.trailing_zeros() - MIN_CLASS_BYTES.trailing_zeros()) as usize)
}

/// Chunk size in bytes for a given class
#[inline]
pub(crate) fn class_bytes(class: usize) -> usize {
    MIN_CLASS_BYTES << class
}

#[inline]
fn class_layout(class: usize) -> Layout {
    // Class sizes are powers of two >= CHUNK_ALIGN, so this cannot fail.
    Layout::from_size_align(class_bytes(class), CHUNK_ALIGN).expect("valid class layout")
}

/// Configuration for a buffer pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of chunks retained per size class
    pub max_chunks_per_class: usize,
}

impl PoolConfig {
    /// Create a new pool configuration
    pub fn new(max_chunks_per_class: usize) -> Self {
        Self {
            max_chunks_per_class,
        }
    }

    /// Configuration retaining few chunks, for memory-tight processes
    pub fn small() -> Self {
        Self::new(8)
    }

    /// Configuration retaining many chunks, for high-churn workloads
    pub fn large() -> Self {
        Self::new(128)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(32)
    }
}

/// Statistics for buffer pool usage
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of chunk leases served
    pub rent_count: u64,
    /// Number of chunks returned
    pub return_count: u64,
    /// Number of leases served from retained chunks
    pub pool_hits: u64,
    /// Number of leases that required a fresh allocation
    pub pool_misses: u64,
    /// Number of chunks currently retained
    pub chunks: usize,
    /// Total bytes currently retained
    pub available: u64,
}

/// A pool of contiguous memory chunks keyed by power-of-two size class
///
/// The pool is safe for concurrent rent/return calls originating from
/// independently-owned containers. Free lists populate lazily on first
/// rent per class and live for the lifetime of the pool.
pub struct BufferPool {
    config: PoolConfig,
    classes: [Mutex<VecDeque<*mut u8>>; NUM_CLASSES],
    rent_count: AtomicU64,
    return_count: AtomicU64,
    pool_hits: AtomicU64,
    pool_misses: AtomicU64,
}

// Safety: the raw chunk pointers are owned by the pool and only handed out
// under the per-class mutexes.
unsafe impl Send for BufferPool {}
unsafe impl Sync for BufferPool {}

impl BufferPool {
    /// Create a new buffer pool with the given configuration
    pub fn new(config: PoolConfig) -> Self {
        log::debug!(
            "buffer pool initialized: {} size classes ({}..={} bytes), {} retained chunks per class",
            NUM_CLASSES,
            MIN_CLASS_BYTES,
            MAX_CLASS_BYTES,
            config.max_chunks_per_class
        );
        Self {
            config,
            classes: std::array::from_fn(|_| Mutex::new(VecDeque::new())),
            rent_count: AtomicU64::new(0),
            return_count: AtomicU64::new(0),
            pool_hits: AtomicU64::new(0),
            pool_misses: AtomicU64::new(0),
        }
    }

    /// Lease a chunk large enough for `bytes`, reusing a retained chunk of
    /// the matching class when one is available.
    ///
    /// The returned class must be passed back to [`BufferPool::return_chunk`].
    pub(crate) fn rent(&self, bytes: usize) -> Result<(NonNull<u8>, usize)> {
        debug_assert!(bytes > 0);
        let class = class_for_bytes(bytes)
            .ok_or_else(|| RepoolError::out_of_memory(bytes))?;
        self.rent_count.fetch_add(1, Ordering::Relaxed);

        // Fast path: pop a retained chunk. A contended lock falls through
        // to a fresh allocation rather than blocking.
        if let Ok(mut free) = self.classes[class].try_lock() {
            if let Some(chunk) = free.pop_front() {
                self.pool_hits.fetch_add(1, Ordering::Relaxed);
                // Safety: chunk came from our own allocation, so it's non-null
                return Ok((unsafe { NonNull::new_unchecked(chunk) }, class));
            }
        }

        self.pool_misses.fetch_add(1, Ordering::Relaxed);
        let ptr = unsafe { alloc(class_layout(class)) };
        match NonNull::new(ptr) {
            Some(ptr) => Ok((ptr, class)),
            None => Err(RepoolError::out_of_memory(class_bytes(class))),
        }
    }

    /// Return a chunk previously leased from `class`.
    ///
    /// Chunks beyond the retention cap are freed immediately.
    pub(crate) fn return_chunk(&self, class: usize, chunk: NonNull<u8>) {
        debug_assert!(class < NUM_CLASSES);
        self.return_count.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut free) = self.classes[class].try_lock() {
            if free.len() < self.config.max_chunks_per_class {
                free.push_back(chunk.as_ptr());
                return;
            }
        }

        // Retention list full or lock contended: free directly.
        unsafe { dealloc(chunk.as_ptr(), class_layout(class)) };
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats {
            rent_count: self.rent_count.load(Ordering::Relaxed),
            return_count: self.return_count.load(Ordering::Relaxed),
            pool_hits: self.pool_hits.load(Ordering::Relaxed),
            pool_misses: self.pool_misses.load(Ordering::Relaxed),
            ..PoolStats::default()
        };
        for (class, free) in self.classes.iter().enumerate() {
            if let Ok(free) = free.try_lock() {
                stats.chunks += free.len();
                stats.available += (free.len() * class_bytes(class)) as u64;
            }
        }
        stats
    }

    /// Free all retained chunks
    pub fn clear(&self) {
        for (class, free) in self.classes.iter().enumerate() {
            let mut free = free.lock().unwrap();
            while let Some(chunk) = free.pop_front() {
                unsafe { dealloc(chunk, class_layout(class)) };
            }
        }
    }

    /// Get pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Global pool instance shared by every pooled buffer in the process
static GLOBAL_POOL: Lazy<BufferPool> = Lazy::new(|| BufferPool::new(PoolConfig::default()));

/// Get the process-wide buffer pool
pub(crate) fn global() -> &'static BufferPool {
    &GLOBAL_POOL
}

/// Get statistics for the process-wide buffer pool
pub fn pool_stats() -> PoolStats {
    GLOBAL_POOL.stats()
}
