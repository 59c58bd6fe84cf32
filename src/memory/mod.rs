//! Memory management: the shared chunk pool and pooled buffers
//!
//! This module provides the two layers under every container: a
//! process-wide, size-classed chunk pool, and the per-container
//! [`PooledBuffer`] that leases from it with doubling growth.
//!
//! Pooling is a performance optimization, not a correctness requirement:
//! requests the pool cannot serve (oversized or over-aligned element
//! types) fall back to direct heap allocation with identical contracts.

pub mod buffer;
pub mod pool;

pub use buffer::PooledBuffer;
pub use pool::{pool_stats, BufferPool, PoolConfig, PoolStats, CHUNK_ALIGN};
