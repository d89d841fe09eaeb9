//! Fixed-pool memory management primitives.
//!
//! Two layers live here: [`Pool`], which owns the raw byte storage, and
//! [`BuddyTree`], which partitions the pool's address space into a hierarchy
//! of power-of-two regions and tracks their allocation state. The tree hands
//! out byte offsets ("indices") into the pool; it never touches the bytes
//! themselves.

pub mod buddy;
pub mod pool;
pub mod stats;

pub use buddy::{BuddyTree, Leaves, Region, Unit, Units};
pub use pool::Pool;
pub use stats::PoolStats;

/// The error type for pool and buddy-tree operations.
///
/// Every variant is a recoverable, ordinary outcome reported to the caller;
/// a failed operation leaves the tree and pool unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// No free region anywhere in the tree can satisfy the request.
    NotEnoughSpace,
    /// The index does not name a currently-allocated region.
    NotAllocated,
    /// The requested size is not a positive number of bytes.
    InvalidRequest,
    /// The backing byte storage could not be allocated.
    OutOfMemory,
    /// A read or write would fall outside the addressed region.
    OutOfRange,
}

impl core::fmt::Display for PoolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotEnoughSpace => f.write_str("not enough space in the pool"),
            Self::NotAllocated => f.write_str("index is not an allocated region"),
            Self::InvalidRequest => f.write_str("requested size must be at least one byte"),
            Self::OutOfMemory => f.write_str("backing pool allocation failed"),
            Self::OutOfRange => f.write_str("access exceeds the bounds of the region"),
        }
    }
}

impl std::error::Error for PoolError {}
