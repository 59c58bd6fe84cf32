//! # Repool: Pooled Contiguous Collections
//!
//! This crate provides list, set, and map containers over contiguous,
//! pool-leased memory, minimizing heap allocation churn relative to
//! conventional growable collections.
//!
//! ## Key Features
//!
//! - **Pooled Buffers**: every container leases its storage from a shared,
//!   size-classed chunk pool and returns it on resize or disposal
//! - **Sorted Hash Index**: the set and map keep a parallel ascending
//!   array of hash codes, giving sub-linear lookup with binary search and
//!   run-aware collision handling instead of buckets or chaining
//! - **Contiguous Storage**: elements always live in one cache-friendly
//!   region; read-only consumers borrow plain slices
//! - **Explicit Lifecycle**: `ensure_capacity`, `trim_excess`, and
//!   idempotent `dispose` on every flavor
//! - **Fixed-Storage Opt-Out**: containers can run over caller-supplied,
//!   non-growable storage and fail fast with `CapacityExceeded`
//!
//! ## Quick Start
//!
//! ```rust
//! use repool::{PooledMap, PooledSet, PooledVec};
//!
//! // Dynamic array over a pooled buffer
//! let mut vec = PooledVec::new();
//! vec.push(42)?;
//! assert_eq!(vec[0], 42);
//!
//! // Hash set with sorted-hash-code indexing
//! let mut set = PooledSet::new();
//! set.insert("hello")?;
//! assert!(set.contains(&"hello"));
//!
//! // Hash map keyed by the key component only
//! let mut map = PooledMap::new();
//! map.insert("answer", 42)?;
//! assert_eq!(map.get(&"answer"), Some(&42));
//!
//! // Disposal returns leased memory to the shared pool
//! vec.dispose();
//! assert_eq!(vec.capacity(), 0);
//! # Ok::<(), repool::RepoolError>(())
//! ```
//!
//! ## Concurrency Model
//!
//! Containers are single-threaded: no instance supports concurrent use,
//! though ownership may move between threads. The shared buffer pool is
//! the one piece of process-wide state and is safe for concurrent
//! rent/return from independently-owned containers.

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod containers;
pub mod error;
pub mod memory;

pub use containers::{PooledContainer, PooledMap, PooledSet, PooledVec};
pub use error::{RepoolError, Result};
pub use memory::{pool_stats, BufferPool, PoolConfig, PoolStats, PooledBuffer};
