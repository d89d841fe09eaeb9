//! # `buddypool` - Buddy-Managed Byte Pool
//!
//! A binary buddy memory allocator over a fixed-size byte pool, plus the
//! cursor-based control surface it is driven with from the outside.
//!
//! The pool is a contiguous buffer addressed by integer offset. A strict
//! binary tree is overlaid on it: the root covers the whole pool, and every
//! split node's two children cover exactly one half of its range each.
//! Allocation walks the tree depth-first (left before right), splitting free
//! leaves in half until the next halving would no longer fit the request, so
//! each allocation lands leftmost in the smallest power-of-two region that
//! holds it. Freeing marks the leaf free and eagerly coalesces free sibling
//! pairs back into their parent, all the way up the ancestor chain.
//!
//! ## Guarantees
//!
//! - **Deterministic placement**: leftmost, smallest-fit-first. The offsets
//!   returned for a given request sequence never change.
//! - **Eager coalescing**: no two sibling leaves are ever both free; freeing
//!   every allocation returns the tree to a single free root.
//! - **Recoverable failures**: every bad input (oversized request, double
//!   free, unknown index, out-of-bounds transfer) is a typed [`PoolError`],
//!   and a failed operation leaves the tree and pool unchanged.
//! - **Serialized access**: [`PoolDevice`] guards all state behind one
//!   mutex, so concurrent callers see each operation as atomic.
//!
//! ## Layers
//!
//! 1. [`Pool`]: the raw byte storage, with bounds-checked reads and writes.
//! 2. [`BuddyTree`]: the partition of the pool's address space; allocation,
//!    freeing, size lookup, and leaf/unit introspection by offset.
//! 3. [`PoolDevice`]: the shared front end; allocate/free plus the stateful
//!    cursor protocol for byte transfer, one request at a time.
//!
//! ## Example
//!
//! ```rust
//! use buddypool::PoolDevice;
//!
//! let device = PoolDevice::new(16)?;
//!
//! let idx = device.alloc(4)?;
//! device.set_cursor(idx);
//! device.write_at_cursor(b"data")?;
//!
//! device.set_transfer_size(4);
//! assert_eq!(device.read_at_cursor()?, b"data");
//!
//! device.free(idx)?;
//! # Ok::<(), buddypool::PoolError>(())
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod alloc;
pub mod device;

pub use alloc::{BuddyTree, Pool, PoolError, PoolStats, Region, Unit};
pub use device::{PoolDevice, Reply, Request};
