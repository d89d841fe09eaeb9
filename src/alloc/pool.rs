//! `Pool` — the raw byte storage behind the buddy tree.
//!
//! The pool is a contiguous buffer of a fixed capacity, addressed by integer
//! offset. It is created once, never resized, and released on drop. All
//! access is bounds-checked: an out-of-range read or write fails with
//! [`PoolError::OutOfRange`] instead of corrupting memory.

use crate::alloc::PoolError;

/// A fixed-capacity byte buffer addressed by offset.
///
/// The pool carries no allocation state of its own; which offsets are live
/// is the [`BuddyTree`](crate::alloc::BuddyTree)'s concern.
pub struct Pool {
    bytes: Box<[u8]>,
}

impl Pool {
    /// Creates a pool of `capacity` zeroed bytes.
    ///
    /// A capacity of zero is legal and yields a pool that can satisfy no
    /// access at all.
    ///
    /// # Errors
    /// Returns [`PoolError::OutOfMemory`] if the backing allocation fails.
    pub fn new(capacity: usize) -> Result<Self, PoolError> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(capacity)
            .map_err(|_| PoolError::OutOfMemory)?;
        bytes.resize(capacity, 0);
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }

    /// Returns the fixed capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Returns the `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`PoolError::OutOfRange`] if `offset + len` exceeds the
    /// capacity.
    #[inline]
    pub fn read(&self, offset: usize, len: usize) -> Result<&[u8], PoolError> {
        let end = offset.checked_add(len).ok_or(PoolError::OutOfRange)?;
        self.bytes.get(offset..end).ok_or(PoolError::OutOfRange)
    }

    /// Copies `data` into the pool starting at `offset`.
    ///
    /// # Errors
    /// Returns [`PoolError::OutOfRange`] if the write would run past the
    /// capacity; nothing is written on failure.
    #[inline]
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), PoolError> {
        let end = offset
            .checked_add(data.len())
            .ok_or(PoolError::OutOfRange)?;
        let dst = self.bytes.get_mut(offset..end).ok_or(PoolError::OutOfRange)?;
        dst.copy_from_slice(data);
        Ok(())
    }
}
