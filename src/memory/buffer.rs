//! PooledBuffer: contiguous element storage leased from the shared pool
//!
//! A `PooledBuffer<T>` owns one contiguous region of element storage and
//! nothing else: the count of initialized elements is tracked by the
//! owning container and passed into the raw operations. Growth follows a
//! rent-copy-return discipline against the shared [`BufferPool`], with
//! doubling capacity so appends stay amortized O(1).
//!
//! [`BufferPool`]: crate::memory::BufferPool

use std::alloc::{self, Layout};
use std::mem::{self, MaybeUninit};
use std::ptr::{self, NonNull};

use crate::error::{RepoolError, Result};
use crate::memory::pool::{self, class_bytes, class_for_bytes, CHUNK_ALIGN};

/// Smallest non-zero capacity produced by growth
const MIN_GROWTH: usize = 4;

/// Where the active region came from, and how to give it back
enum Storage<T> {
    /// No allocation
    Empty,
    /// Chunk leased from the shared pool
    Pooled { ptr: NonNull<T>, class: usize },
    /// Direct heap allocation (oversized or over-aligned element types)
    Heap { ptr: NonNull<T>, alloc_cap: usize },
    /// Caller-supplied storage; opts this instance out of pooling and growth
    Fixed { buf: Box<[MaybeUninit<T>]> },
}

/// Contiguous element storage with pooled, doubling growth
///
/// The buffer knows its capacity but not how many elements are live; the
/// owning container passes its count into every relocating call. Raw
/// element operations are `unsafe` and mirror the usual contiguous-vector
/// shift discipline.
///
/// Dropping or disposing a buffer returns its lease to the pool but never
/// drops elements: the owning container drops the live region first.
pub struct PooledBuffer<T> {
    storage: Storage<T>,
    cap: usize,
}

impl<T> PooledBuffer<T> {
    /// Create a new empty buffer with no allocation
    #[inline]
    pub const fn new() -> Self {
        Self {
            storage: Storage::Empty,
            cap: 0,
        }
    }

    /// Create a buffer with at least the specified capacity
    pub fn with_capacity(cap: usize) -> Result<Self> {
        let mut buf = Self::new();
        if cap > 0 {
            // Safety: the buffer is empty, so the live count is 0.
            unsafe { buf.ensure_capacity(0, cap)? };
        }
        Ok(buf)
    }

    /// Create a buffer over caller-supplied storage
    ///
    /// The resulting buffer never touches the pool and never grows:
    /// exceeding its capacity surfaces [`RepoolError::CapacityExceeded`].
    pub fn from_fixed(buf: Box<[MaybeUninit<T>]>) -> Self {
        let cap = buf.len();
        Self {
            storage: Storage::Fixed { buf },
            cap,
        }
    }

    /// Create a buffer over fresh fixed storage of exactly `cap` slots
    pub fn with_fixed_capacity(cap: usize) -> Self {
        Self::from_fixed(std::iter::repeat_with(MaybeUninit::uninit).take(cap).collect())
    }

    /// Get the capacity in elements
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Check whether this buffer uses caller-supplied, non-growable storage
    #[inline]
    pub fn is_fixed(&self) -> bool {
        matches!(self.storage, Storage::Fixed { .. })
    }

    /// Get a pointer to the underlying data
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        match &self.storage {
            Storage::Empty => {
                if mem::size_of::<T>() == 0 {
                    NonNull::dangling().as_ptr()
                } else {
                    ptr::null()
                }
            }
            Storage::Pooled { ptr, .. } | Storage::Heap { ptr, .. } => ptr.as_ptr(),
            Storage::Fixed { buf } => buf.as_ptr() as *const T,
        }
    }

    /// Get a mutable pointer to the underlying data
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        match &mut self.storage {
            Storage::Empty => {
                if mem::size_of::<T>() == 0 {
                    NonNull::dangling().as_ptr()
                } else {
                    ptr::null_mut()
                }
            }
            Storage::Pooled { ptr, .. } | Storage::Heap { ptr, .. } => ptr.as_ptr(),
            Storage::Fixed { buf } => buf.as_mut_ptr() as *mut T,
        }
    }

    /// Ensure the buffer can hold at least `min_cap` elements
    ///
    /// A no-op when the capacity already suffices. Otherwise leases new
    /// storage sized to the smallest power of two `>= min_cap`, moves the
    /// live region into it, and returns the previous lease to the pool.
    /// Fixed storage fails with `CapacityExceeded` and is left untouched.
    ///
    /// # Safety
    ///
    /// The caller must ensure that elements `[0, live)` are initialized
    /// and that `live` does not exceed the current capacity.
    pub unsafe fn ensure_capacity(&mut self, live: usize, min_cap: usize) -> Result<()> {
        debug_assert!(live <= self.cap);
        if min_cap <= self.cap {
            return Ok(());
        }
        if self.is_fixed() {
            return Err(RepoolError::capacity_exceeded(min_cap, self.cap));
        }
        let target = min_cap
            .checked_next_power_of_two()
            .ok_or_else(|| RepoolError::out_of_memory(usize::MAX))?
            .max(MIN_GROWTH);
        // Safety: forwarded caller contract.
        unsafe { self.relocate(live, target) }
    }

    /// Shrink the buffer to exactly `live` elements
    ///
    /// Performs the same lease/move/return sequence as growth, sized
    /// exactly to the live region. Skipped when already tight or when the
    /// storage is fixed; a live count of 0 releases the lease entirely.
    ///
    /// # Safety
    ///
    /// The caller must ensure that elements `[0, live)` are initialized
    /// and that `live` does not exceed the current capacity.
    pub unsafe fn trim_excess(&mut self, live: usize) -> Result<()> {
        debug_assert!(live <= self.cap);
        if self.is_fixed() || self.cap == live {
            return Ok(());
        }
        if live == 0 {
            self.release();
            return Ok(());
        }
        // Safety: forwarded caller contract.
        unsafe { self.relocate(live, live) }
    }

    /// Return the current lease (if any) to the pool and reset to empty
    ///
    /// Idempotent. Elements are not dropped; the owning container drops
    /// the live region before disposing its buffers.
    pub fn dispose(&mut self) {
        self.release();
    }

    /// Lease new storage of `new_cap` elements, move `[0, live)` into it,
    /// and return the old lease.
    ///
    /// # Safety
    ///
    /// Elements `[0, live)` must be initialized, `live <= new_cap`.
    unsafe fn relocate(&mut self, live: usize, new_cap: usize) -> Result<()> {
        debug_assert!(live <= new_cap);
        if mem::size_of::<T>() == 0 {
            // Zero-sized elements never allocate; capacity is bookkeeping.
            self.cap = new_cap;
            return Ok(());
        }
        let (new_storage, new_ptr) = Self::lease(new_cap)?;
        if live > 0 {
            // Safety: the regions are disjoint allocations and the caller
            // guarantees [0, live) is initialized. Ownership of the
            // elements moves bitwise; the old region is returned without
            // dropping them.
            unsafe { ptr::copy_nonoverlapping(self.as_ptr(), new_ptr.as_ptr(), live) };
        }
        self.release();
        self.storage = new_storage;
        self.cap = new_cap;
        Ok(())
    }

    /// Acquire storage for `cap` elements: pooled when the request fits a
    /// size class and the element alignment allows, direct heap otherwise.
    fn lease(cap: usize) -> Result<(Storage<T>, NonNull<T>)> {
        let bytes = mem::size_of::<T>()
            .checked_mul(cap)
            .ok_or_else(|| RepoolError::out_of_memory(usize::MAX))?;

        if mem::align_of::<T>() <= CHUNK_ALIGN && class_for_bytes(bytes).is_some() {
            let (chunk, class) = pool::global().rent(bytes)?;
            debug_assert!(class_bytes(class) >= bytes);
            let ptr = chunk.cast::<T>();
            return Ok((Storage::Pooled { ptr, class }, ptr));
        }

        let layout =
            Layout::array::<T>(cap).map_err(|_| RepoolError::out_of_memory(bytes))?;
        let raw = unsafe { alloc::alloc(layout) } as *mut T;
        match NonNull::new(raw) {
            Some(ptr) => Ok((Storage::Heap { ptr, alloc_cap: cap }, ptr)),
            None => Err(RepoolError::out_of_memory(layout.size())),
        }
    }

    /// Give the active storage back to wherever it came from
    fn release(&mut self) {
        match mem::replace(&mut self.storage, Storage::Empty) {
            Storage::Empty => {}
            Storage::Pooled { ptr, class } => {
                pool::global().return_chunk(class, ptr.cast());
            }
            Storage::Heap { ptr, alloc_cap } => unsafe {
                let layout = Layout::array::<T>(alloc_cap).unwrap();
                alloc::dealloc(ptr.as_ptr() as *mut u8, layout);
            },
            Storage::Fixed { buf } => drop(buf),
        }
        self.cap = 0;
    }

    /// Read the element at `index`, taking ownership
    ///
    /// # Safety
    ///
    /// `index` must be initialized and within capacity; the slot is
    /// logically vacated and must not be read again.
    #[inline]
    pub(crate) unsafe fn read(&self, index: usize) -> T {
        debug_assert!(index < self.cap || mem::size_of::<T>() == 0);
        unsafe { ptr::read(self.as_ptr().add(index)) }
    }

    /// Write `value` into the slot at `index` without dropping the old slot
    ///
    /// # Safety
    ///
    /// `index` must be within capacity and the slot must be vacant.
    #[inline]
    pub(crate) unsafe fn write(&mut self, index: usize, value: T) {
        debug_assert!(index < self.cap || mem::size_of::<T>() == 0);
        unsafe { ptr::write(self.as_mut_ptr().add(index), value) };
    }

    /// Get a reference to the element at `index`
    ///
    /// # Safety
    ///
    /// The caller must ensure the slot at `index` is initialized.
    #[inline]
    pub(crate) unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.cap || mem::size_of::<T>() == 0);
        unsafe { &*self.as_ptr().add(index) }
    }

    /// Get a mutable reference to the element at `index`
    ///
    /// # Safety
    ///
    /// The caller must ensure the slot at `index` is initialized.
    #[inline]
    pub(crate) unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.cap || mem::size_of::<T>() == 0);
        unsafe { &mut *self.as_mut_ptr().add(index) }
    }

    /// Shift `[index, len)` one slot to the right, opening a gap at `index`
    ///
    /// # Safety
    ///
    /// Elements `[0, len)` must be initialized and `len < capacity`.
    #[inline]
    pub(crate) unsafe fn shift_right(&mut self, index: usize, len: usize) {
        debug_assert!(index <= len);
        debug_assert!(len < self.cap || mem::size_of::<T>() == 0);
        unsafe {
            let p = self.as_mut_ptr().add(index);
            ptr::copy(p, p.add(1), len - index);
        }
    }

    /// Shift `(index, len)` one slot to the left, closing the gap at `index`
    ///
    /// # Safety
    ///
    /// Elements `[0, len)` must be initialized except the vacated slot at
    /// `index`, and `index < len <= capacity`.
    #[inline]
    pub(crate) unsafe fn shift_left(&mut self, index: usize, len: usize) {
        debug_assert!(index < len);
        unsafe {
            let p = self.as_mut_ptr().add(index);
            ptr::copy(p.add(1), p, len - index - 1);
        }
    }

    /// Drop the elements in `[0, len)` in place
    ///
    /// # Safety
    ///
    /// Elements `[0, len)` must be initialized; they are all dropped.
    pub(crate) unsafe fn drop_range(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.as_mut_ptr(), len));
        }
    }
}

impl<T> Default for PooledBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for PooledBuffer<T> {
    fn drop(&mut self) {
        self.release();
    }
}

// Safety: PooledBuffer owns its storage exclusively; the pool itself is
// thread-safe, so the buffer is as Send/Sync as its elements.
unsafe impl<T: Send> Send for PooledBuffer<T> {}
unsafe impl<T: Sync> Sync for PooledBuffer<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let buf: PooledBuffer<i32> = PooledBuffer::new();
        assert_eq!(buf.capacity(), 0);
        assert!(!buf.is_fixed());
        assert!(buf.as_ptr().is_null());
    }

    #[test]
    fn test_with_capacity_rounds_to_power_of_two() {
        let buf: PooledBuffer<u64> = PooledBuffer::with_capacity(5).unwrap();
        assert_eq!(buf.capacity(), 8);

        let buf: PooledBuffer<u64> = PooledBuffer::with_capacity(1).unwrap();
        assert_eq!(buf.capacity(), MIN_GROWTH);

        let buf: PooledBuffer<u64> = PooledBuffer::with_capacity(0).unwrap();
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn test_ensure_capacity_is_monotonic() {
        let mut buf: PooledBuffer<u32> = PooledBuffer::new();
        unsafe {
            buf.ensure_capacity(0, 10).unwrap();
            let cap = buf.capacity();
            assert!(cap >= 10);
            assert!(cap.is_power_of_two());

            buf.ensure_capacity(0, 4).unwrap();
            assert_eq!(buf.capacity(), cap);
        }
    }

    #[test]
    fn test_growth_preserves_live_region() {
        let mut buf: PooledBuffer<u64> = PooledBuffer::with_capacity(4).unwrap();
        unsafe {
            for i in 0..4 {
                buf.write(i, i as u64 * 10);
            }
            buf.ensure_capacity(4, 100).unwrap();
            for i in 0..4 {
                assert_eq!(*buf.get_unchecked(i), i as u64 * 10);
            }
        }
    }

    #[test]
    fn test_trim_excess_exact() {
        let mut buf: PooledBuffer<u64> = PooledBuffer::with_capacity(64).unwrap();
        unsafe {
            for i in 0..3 {
                buf.write(i, i as u64);
            }
            buf.trim_excess(3).unwrap();
            assert_eq!(buf.capacity(), 3);
            for i in 0..3 {
                assert_eq!(*buf.get_unchecked(i), i as u64);
            }

            buf.trim_excess(3).unwrap();
            assert_eq!(buf.capacity(), 3);
        }
    }

    #[test]
    fn test_trim_excess_empty_releases() {
        let mut buf: PooledBuffer<u64> = PooledBuffer::with_capacity(64).unwrap();
        unsafe { buf.trim_excess(0).unwrap() };
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn test_fixed_buffer_does_not_grow() {
        let mut buf: PooledBuffer<i32> = PooledBuffer::with_fixed_capacity(4);
        assert!(buf.is_fixed());
        assert_eq!(buf.capacity(), 4);

        unsafe {
            // Within capacity: fine.
            buf.ensure_capacity(0, 4).unwrap();
            // Beyond: refused, buffer untouched.
            let err = buf.ensure_capacity(0, 5).unwrap_err();
            assert_eq!(err.category(), "capacity");
            assert_eq!(buf.capacity(), 4);

            // Trim is a no-op on fixed storage.
            buf.trim_excess(0).unwrap();
            assert_eq!(buf.capacity(), 4);
        }
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut buf: PooledBuffer<u8> = PooledBuffer::with_capacity(128).unwrap();
        assert!(buf.capacity() >= 128);
        buf.dispose();
        assert_eq!(buf.capacity(), 0);
        buf.dispose();
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn test_dispose_then_regrow() {
        let mut buf: PooledBuffer<u32> = PooledBuffer::with_capacity(8).unwrap();
        buf.dispose();
        unsafe {
            buf.ensure_capacity(0, 8).unwrap();
            buf.write(0, 7);
            assert_eq!(*buf.get_unchecked(0), 7);
        }
    }

    #[test]
    fn test_shift_right_and_left() {
        let mut buf: PooledBuffer<i32> = PooledBuffer::with_capacity(8).unwrap();
        unsafe {
            buf.write(0, 1);
            buf.write(1, 3);
            buf.shift_right(1, 2);
            buf.write(1, 2);
            for (i, expected) in [1, 2, 3].iter().enumerate() {
                assert_eq!(*buf.get_unchecked(i), *expected);
            }

            let removed = buf.read(1);
            assert_eq!(removed, 2);
            buf.shift_left(1, 3);
            assert_eq!(*buf.get_unchecked(0), 1);
            assert_eq!(*buf.get_unchecked(1), 3);
        }
    }

    #[test]
    fn test_oversized_lease_bypasses_pool() {
        // 2 MiB of u64 exceeds the largest pool class.
        let mut buf: PooledBuffer<u64> = PooledBuffer::new();
        unsafe {
            buf.ensure_capacity(0, 300_000).unwrap();
            assert!(buf.capacity() >= 300_000);
            buf.write(299_999, 42);
            assert_eq!(*buf.get_unchecked(299_999), 42);
        }
    }

    #[test]
    fn test_zero_sized_elements() {
        let mut buf: PooledBuffer<()> = PooledBuffer::new();
        unsafe {
            buf.ensure_capacity(0, 1000).unwrap();
            assert!(buf.capacity() >= 1000);
            buf.write(500, ());
            buf.read(500);
        }
        buf.dispose();
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn test_drop_range_drops_elements() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let counter = Arc::new(AtomicUsize::new(0));

        struct DropCounter {
            counter: Arc<AtomicUsize>,
        }

        impl Drop for DropCounter {
            fn drop(&mut self) {
                self.counter.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut buf: PooledBuffer<DropCounter> = PooledBuffer::with_capacity(4).unwrap();
        unsafe {
            for i in 0..3 {
                buf.write(
                    i,
                    DropCounter {
                        counter: counter.clone(),
                    },
                );
            }
            buf.drop_range(3);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        buf.dispose();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<PooledBuffer<i32>>();
        assert_sync::<PooledBuffer<i32>>();
    }
}
