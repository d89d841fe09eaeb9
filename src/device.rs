//! `PoolDevice` — the control surface over a shared pool and buddy tree.
//!
//! Mirrors the request-code protocol the allocator is driven with from the
//! outside: allocate and free by index, then a stateful cursor protocol for
//! byte transfer (set the cursor to a region's index, optionally set a
//! transfer size, then write or read at the cursor).
//!
//! Every operation takes one mutex guarding the whole `{pool, tree, cursor,
//! transfer size}` state, so concurrent callers are serialized and each tree
//! mutation is atomic. The access pattern does not justify anything finer:
//! the tree is shallow, operations are short CPU-bound walks, and coalescing
//! requires a parent to observe both children's final state.

use std::sync::Mutex;

use tracing::{debug, warn};

use crate::alloc::{BuddyTree, Pool, PoolError, PoolStats, Unit};

struct DeviceState {
    pool: Pool,
    tree: BuddyTree,
    cursor: usize,
    transfer_size: usize,
}

/// A shared, internally-synchronized pool allocator with a cursor-based
/// transfer protocol.
///
/// `PoolDevice` is `Send + Sync`; hand out clones of an `Arc<PoolDevice>`
/// to share it across threads.
pub struct PoolDevice {
    state: Mutex<DeviceState>,
}

/// One request of the control protocol, mirroring the device's request
/// codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    /// Allocate this many bytes; replies with the region's index.
    Alloc(usize),
    /// Free the region at this index.
    Free(usize),
    /// Point the transfer cursor at this region index.
    SetCursor(usize),
    /// Set the byte count used by subsequent reads.
    SetTransferSize(usize),
    /// Write these bytes at the cursor; replies with the count written.
    Write(&'a [u8]),
    /// Read the configured number of bytes at the cursor.
    Read,
}

/// The successful outcome of a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Index of a freshly allocated region.
    Index(usize),
    /// The region was freed.
    Freed,
    /// A cursor or transfer-size update took effect.
    Done,
    /// Number of bytes written.
    Written(usize),
    /// Bytes read at the cursor.
    Data(Vec<u8>),
}

impl PoolDevice {
    /// Creates a device over a fresh pool of `capacity` bytes.
    ///
    /// # Errors
    /// Returns [`PoolError::OutOfMemory`] if the backing pool cannot be
    /// allocated.
    pub fn new(capacity: usize) -> Result<Self, PoolError> {
        Ok(Self {
            state: Mutex::new(DeviceState {
                pool: Pool::new(capacity)?,
                tree: BuddyTree::new(capacity),
                cursor: 0,
                transfer_size: 0,
            }),
        })
    }

    /// Allocates `size` bytes and returns the region's index.
    ///
    /// # Errors
    /// [`PoolError::InvalidRequest`] for a zero-size request,
    /// [`PoolError::NotEnoughSpace`] when no region fits.
    pub fn alloc(&self, size: usize) -> Result<usize, PoolError> {
        let mut state = self.state.lock().unwrap();
        debug!(size, "allocating");
        let idx = state.tree.alloc(size)?;
        debug!(size, idx, "allocated");
        Ok(idx)
    }

    /// Frees the region at `idx` and leaves the cursor pointing at it.
    ///
    /// # Errors
    /// [`PoolError::NotAllocated`] if `idx` is not a currently-allocated
    /// region; a double free is an ordinary failure, not a fault.
    pub fn free(&self, idx: usize) -> Result<(), PoolError> {
        let mut state = self.state.lock().unwrap();
        debug!(idx, "freeing");
        state.cursor = idx;
        state.tree.free(idx)
    }

    /// Reports the size of the allocated region at `idx`.
    ///
    /// # Errors
    /// [`PoolError::NotAllocated`] if `idx` is not a currently-allocated
    /// region.
    pub fn size_of(&self, idx: usize) -> Result<usize, PoolError> {
        self.state.lock().unwrap().tree.size_of(idx)
    }

    /// Points the transfer cursor at region index `idx`.
    pub fn set_cursor(&self, idx: usize) {
        debug!(idx, "setting cursor");
        self.state.lock().unwrap().cursor = idx;
    }

    /// Sets the byte count used by subsequent [`read_at_cursor`] calls.
    ///
    /// [`read_at_cursor`]: Self::read_at_cursor
    pub fn set_transfer_size(&self, size: usize) {
        debug!(size, "setting transfer size");
        self.state.lock().unwrap().transfer_size = size;
    }

    /// Writes `data` into the region the cursor points at, returning the
    /// number of bytes written.
    ///
    /// # Errors
    /// [`PoolError::NotAllocated`] if the cursor is not an allocated
    /// region's index; [`PoolError::OutOfRange`] if `data` is longer than
    /// that region. Nothing is written on failure.
    pub fn write_at_cursor(&self, data: &[u8]) -> Result<usize, PoolError> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let region = state.tree.size_of(state.cursor)?;
        if data.len() > region {
            warn!(
                cursor = state.cursor,
                len = data.len(),
                region,
                "write exceeds allocated region"
            );
            return Err(PoolError::OutOfRange);
        }
        state.pool.write(state.cursor, data)?;
        debug!(cursor = state.cursor, bytes = data.len(), "wrote");
        Ok(data.len())
    }

    /// Reads the configured transfer size's worth of bytes from the region
    /// the cursor points at.
    ///
    /// # Errors
    /// [`PoolError::NotAllocated`] if the cursor is not an allocated
    /// region's index; [`PoolError::OutOfRange`] if the transfer size
    /// exceeds that region's size.
    pub fn read_at_cursor(&self) -> Result<Vec<u8>, PoolError> {
        let guard = self.state.lock().unwrap();
        let state = &*guard;
        let region = state.tree.size_of(state.cursor)?;
        if state.transfer_size > region {
            warn!(
                cursor = state.cursor,
                transfer_size = state.transfer_size,
                region,
                "read exceeds allocated region"
            );
            return Err(PoolError::OutOfRange);
        }
        let data = state.pool.read(state.cursor, state.transfer_size)?.to_vec();
        debug!(cursor = state.cursor, bytes = data.len(), "read");
        Ok(data)
    }

    /// Dispatches one protocol request.
    ///
    /// # Errors
    /// Propagates the failure of the underlying operation; see the
    /// individual methods.
    pub fn control(&self, request: Request<'_>) -> Result<Reply, PoolError> {
        match request {
            Request::Alloc(size) => self.alloc(size).map(Reply::Index),
            Request::Free(idx) => self.free(idx).map(|()| Reply::Freed),
            Request::SetCursor(idx) => {
                self.set_cursor(idx);
                Ok(Reply::Done)
            }
            Request::SetTransferSize(size) => {
                self.set_transfer_size(size);
                Ok(Reply::Done)
            }
            Request::Write(data) => self.write_at_cursor(data).map(Reply::Written),
            Request::Read => self.read_at_cursor().map(Reply::Data),
        }
    }

    /// Collects an occupancy snapshot of the tree.
    pub fn stats(&self) -> PoolStats {
        PoolStats::collect(&self.state.lock().unwrap().tree)
    }

    /// Snapshots the per-byte ownership dump under the lock.
    pub fn snapshot(&self) -> Vec<Unit> {
        self.state.lock().unwrap().tree.units().collect()
    }

    /// Renders the current leaf layout as text.
    pub fn render(&self) -> String {
        self.state.lock().unwrap().tree.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_write_read_round_trip() {
        let device = PoolDevice::new(16).unwrap();
        let idx = device.alloc(4).unwrap();

        device.set_cursor(idx);
        assert_eq!(device.write_at_cursor(b"abcd"), Ok(4));

        device.set_transfer_size(4);
        assert_eq!(device.read_at_cursor().unwrap(), b"abcd");
    }

    #[test]
    fn test_write_overrun_is_rejected_before_writing() {
        let device = PoolDevice::new(16).unwrap();
        let idx = device.alloc(2).unwrap();

        device.set_cursor(idx);
        assert_eq!(device.write_at_cursor(b"abc"), Err(PoolError::OutOfRange));

        // The region still holds its original (zeroed) contents.
        device.set_transfer_size(2);
        assert_eq!(device.read_at_cursor().unwrap(), &[0, 0]);
    }

    #[test]
    fn test_oversized_read_is_rejected() {
        let device = PoolDevice::new(16).unwrap();
        let idx = device.alloc(2).unwrap();

        device.set_cursor(idx);
        device.set_transfer_size(4);
        assert_eq!(device.read_at_cursor(), Err(PoolError::OutOfRange));
    }

    #[test]
    fn test_cursor_on_unallocated_index() {
        let device = PoolDevice::new(16).unwrap();
        device.set_cursor(3);
        assert_eq!(device.write_at_cursor(b"x"), Err(PoolError::NotAllocated));
        assert_eq!(device.read_at_cursor(), Err(PoolError::NotAllocated));
    }

    #[test]
    fn test_free_moves_cursor() {
        let device = PoolDevice::new(16).unwrap();
        let a = device.alloc(2).unwrap();
        let b = device.alloc(2).unwrap();
        assert_ne!(a, b);

        device.free(b).unwrap();
        // The freed index became the cursor, which now names a free region.
        assert_eq!(device.write_at_cursor(b"x"), Err(PoolError::NotAllocated));
    }

    #[test]
    fn test_control_dispatch() {
        let device = PoolDevice::new(16).unwrap();

        let Reply::Index(idx) = device.control(Request::Alloc(4)).unwrap() else {
            panic!("expected an index reply");
        };
        assert_eq!(device.control(Request::SetCursor(idx)), Ok(Reply::Done));
        assert_eq!(
            device.control(Request::Write(b"data")),
            Ok(Reply::Written(4))
        );
        assert_eq!(
            device.control(Request::SetTransferSize(4)),
            Ok(Reply::Done)
        );
        assert_eq!(
            device.control(Request::Read),
            Ok(Reply::Data(b"data".to_vec()))
        );
        assert_eq!(device.control(Request::Free(idx)), Ok(Reply::Freed));
        assert_eq!(
            device.control(Request::Free(idx)),
            Err(PoolError::NotAllocated)
        );
    }
}
