//! Error handling for the repool library
//!
//! This module provides a single crate-wide error type covering every
//! failure mode of the container and buffer layers.

use thiserror::Error;

/// Main error type for the repool library
#[derive(Error, Debug)]
pub enum RepoolError {
    /// A caller-supplied, non-growable buffer cannot satisfy a required capacity
    #[error("capacity exceeded: required {requested}, fixed capacity {capacity}")]
    CapacityExceeded {
        /// Capacity the operation required
        requested: usize,
        /// Capacity of the fixed buffer
        capacity: usize,
    },

    /// Required-style keyed lookup on an absent key
    #[error("key not found")]
    KeyNotFound,

    /// Non-try add when the key already exists
    #[error("duplicate key")]
    DuplicateKey,

    /// Positional access outside the live region
    #[error("out of bounds: index {index}, len {len}")]
    OutOfBounds {
        /// The invalid index
        index: usize,
        /// The valid length
        len: usize,
    },

    /// A query requiring exactly one or zero matches saw a different count
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of the violated expectation
        message: String,
    },

    /// Memory allocation failures
    #[error("memory allocation failed: requested {size} bytes")]
    OutOfMemory {
        /// Number of bytes requested
        size: usize,
    },
}

impl RepoolError {
    /// Create a capacity exceeded error
    pub fn capacity_exceeded(requested: usize, capacity: usize) -> Self {
        Self::CapacityExceeded {
            requested,
            capacity,
        }
    }

    /// Create a key not found error
    pub fn key_not_found() -> Self {
        Self::KeyNotFound
    }

    /// Create a duplicate key error
    pub fn duplicate_key() -> Self {
        Self::DuplicateKey
    }

    /// Create an out of bounds error
    pub fn out_of_bounds(index: usize, len: usize) -> Self {
        Self::OutOfBounds { index, len }
    }

    /// Create an invalid operation error
    pub fn invalid_operation<S: Into<String>>(message: S) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create an out of memory error
    pub fn out_of_memory(size: usize) -> Self {
        Self::OutOfMemory { size }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::CapacityExceeded { .. } => true,
            Self::OutOfMemory { .. } => true,
            Self::KeyNotFound => false,
            Self::DuplicateKey => false,
            Self::OutOfBounds { .. } => false,
            Self::InvalidOperation { .. } => false,
        }
    }

    /// Get the error category for logging/metrics
    pub fn category(&self) -> &'static str {
        match self {
            Self::CapacityExceeded { .. } => "capacity",
            Self::KeyNotFound => "key",
            Self::DuplicateKey => "key",
            Self::OutOfBounds { .. } => "bounds",
            Self::InvalidOperation { .. } => "operation",
            Self::OutOfMemory { .. } => "memory",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RepoolError>;

/// Assert that an index is within the live region `[0, len)`
#[inline]
pub fn check_bounds(index: usize, len: usize) -> Result<()> {
    if index >= len {
        Err(RepoolError::out_of_bounds(index, len))
    } else {
        Ok(())
    }
}

/// Assert that an insertion index is within `[0, len]`
#[inline]
pub fn check_insert_bounds(index: usize, len: usize) -> Result<()> {
    if index > len {
        Err(RepoolError::out_of_bounds(index, len))
    } else {
        Ok(())
    }
}
