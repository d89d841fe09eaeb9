//! `BuddyTree` — a binary buddy partition of the pool's address space.
//!
//! The tree overlays the pool: each node covers a contiguous range
//! `[idx, idx + size)`, the root covers the whole pool, and a split node's
//! two children cover exactly one half each. Allocation walks depth-first,
//! left before right, splitting free leaves in half until halving again
//! would no longer fit the request, so every allocation lands in the
//! smallest power-of-two region that holds it. Freeing reverses the walk
//! and eagerly coalesces free sibling pairs back into their parent.
//!
//! # Features
//! - **Arena-backed nodes**: nodes live in a `Vec` addressed by stable
//!   handles, with freed slots reused; no recursive destructor chains.
//! - **Iterative traversal**: every operation is an explicit-stack walk
//!   bounded by `log2(capacity)`; nothing recurses on user input.
//! - **Deterministic placement**: leftmost fit first, so offsets returned
//!   for a given request sequence never change.

use serde::Serialize;

use crate::alloc::PoolError;

/// Allocation state of a tree node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum NodeState {
    Free,
    Split,
    Allocated,
}

/// Stable handle into the node arena.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct NodeId(usize);

/// One node of the tree, covering `[idx, idx + size)`.
///
/// `children` is `Some` exactly when `state == Split`; free and allocated
/// nodes are leaves.
struct Node {
    idx: usize,
    size: usize,
    state: NodeState,
    children: Option<(NodeId, NodeId)>,
}

/// A binary buddy tree over `[0, capacity)`.
pub struct BuddyTree {
    nodes: Vec<Node>,
    free_slots: Vec<usize>,
    root: NodeId,
    capacity: usize,
}

/// A leaf region reported by [`BuddyTree::leaves`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Region {
    /// Byte offset of the region within the pool.
    pub idx: usize,
    /// Length of the region in bytes.
    pub size: usize,
    /// Whether the region is currently allocated.
    pub allocated: bool,
}

/// The owner of one byte position in the pool, reported by
/// [`BuddyTree::units`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Unit {
    /// The position belongs to a free region.
    Free,
    /// The position belongs to the allocation starting at this index.
    Allocated(usize),
}

impl BuddyTree {
    /// Constructs a tree whose root covers the whole pool and is free.
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: vec![Node {
                idx: 0,
                size: capacity,
                state: NodeState::Free,
                children: None,
            }],
            free_slots: Vec::new(),
            root: NodeId(0),
            capacity,
        }
    }

    /// Returns the capacity the root covers.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn insert(&mut self, node: Node) -> NodeId {
        if let Some(slot) = self.free_slots.pop() {
            self.nodes[slot] = node;
            NodeId(slot)
        } else {
            self.nodes.push(node);
            NodeId(self.nodes.len() - 1)
        }
    }

    /// Splits a free leaf into two free half-size children, returning them.
    fn split(&mut self, id: NodeId) -> (NodeId, NodeId) {
        let (idx, size) = {
            let node = self.node(id);
            debug_assert_eq!(node.state, NodeState::Free);
            (node.idx, node.size)
        };
        let half = size / 2;
        let left = self.insert(Node {
            idx,
            size: half,
            state: NodeState::Free,
            children: None,
        });
        let right = self.insert(Node {
            idx: idx + half,
            size: half,
            state: NodeState::Free,
            children: None,
        });
        let node = self.node_mut(id);
        node.state = NodeState::Split;
        node.children = Some((left, right));
        (left, right)
    }

    /// Allocates `size` bytes, returning the region's index.
    ///
    /// The walk is depth-first with the left child before the right, and
    /// takes the first free leaf large enough for the request. While the
    /// leaf is at least twice the request it is split in half and the walk
    /// descends left, so the request ends up in the smallest power-of-two
    /// region that fits it.
    ///
    /// # Errors
    /// - [`PoolError::InvalidRequest`] if `size` is zero.
    /// - [`PoolError::NotEnoughSpace`] if no free leaf anywhere in the tree
    ///   can hold `size` bytes (including `size > capacity` and a
    ///   zero-capacity pool). The tree is left unchanged.
    pub fn alloc(&mut self, size: usize) -> Result<usize, PoolError> {
        if size == 0 {
            return Err(PoolError::InvalidRequest);
        }

        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let (state, children, node_size) = {
                let node = self.node(id);
                (node.state, node.children, node.size)
            };
            match (state, children) {
                (NodeState::Split, Some((left, right))) => {
                    // Right is pushed first so the left child pops first.
                    stack.push(right);
                    stack.push(left);
                }
                (NodeState::Free, _) if node_size >= size => {
                    let mut cur = id;
                    while self.node(cur).size / 2 >= size {
                        let (left, _right) = self.split(cur);
                        cur = left;
                    }
                    self.node_mut(cur).state = NodeState::Allocated;
                    return Ok(self.node(cur).idx);
                }
                // Allocated leaves and too-small free leaves are not
                // candidates; the walk continues.
                _ => {}
            }
        }
        Err(PoolError::NotEnoughSpace)
    }

    /// Descends to the unique leaf covering byte offset `idx`, recording
    /// the ancestor chain in `path` if one is supplied.
    fn descend(&self, idx: usize, mut path: Option<&mut Vec<NodeId>>) -> NodeId {
        let mut cur = self.root;
        while let Some((left, right)) = self.node(cur).children {
            if let Some(path) = path.as_deref_mut() {
                path.push(cur);
            }
            cur = if idx < self.node(right).idx { left } else { right };
        }
        cur
    }

    /// Frees the allocation at `idx`, coalescing free sibling pairs back
    /// into their parents as far up the tree as possible.
    ///
    /// # Errors
    /// Returns [`PoolError::NotAllocated`] if `idx` does not name a
    /// currently-allocated region (never allocated, already freed, or out
    /// of range). This is an ordinary outcome, not a fault, and the tree is
    /// left structurally unchanged.
    pub fn free(&mut self, idx: usize) -> Result<(), PoolError> {
        let mut path = Vec::new();
        let leaf = self.descend(idx, Some(&mut path));
        {
            let node = self.node(leaf);
            if node.idx != idx || node.state != NodeState::Allocated {
                return Err(PoolError::NotAllocated);
            }
        }
        self.node_mut(leaf).state = NodeState::Free;

        // Coalesce upward along the descent path. The first parent that
        // cannot merge ends the cascade: it stays Split, so no ancestor
        // above it has two free children either.
        while let Some(parent) = path.pop() {
            if !self.try_coalesce(parent) {
                break;
            }
        }
        Ok(())
    }

    /// Merges `id`'s children back into it if both are free leaves.
    fn try_coalesce(&mut self, id: NodeId) -> bool {
        let Some((left, right)) = self.node(id).children else {
            return false;
        };
        if self.node(left).state != NodeState::Free || self.node(right).state != NodeState::Free {
            return false;
        }
        self.free_slots.push(left.0);
        self.free_slots.push(right.0);
        let node = self.node_mut(id);
        node.children = None;
        node.state = NodeState::Free;
        true
    }

    /// Reports the size of the allocated region at `idx`.
    ///
    /// # Errors
    /// Returns [`PoolError::NotAllocated`] if `idx` does not name a
    /// currently-allocated region; freed indices report `NotAllocated`,
    /// not their prior size.
    pub fn size_of(&self, idx: usize) -> Result<usize, PoolError> {
        let leaf = self.node(self.descend(idx, None));
        if leaf.idx == idx && leaf.state == NodeState::Allocated {
            Ok(leaf.size)
        } else {
            Err(PoolError::NotAllocated)
        }
    }

    /// Returns an iterator over the leaf regions in left-to-right order.
    ///
    /// The walk is lazy, restartable, and side-effect free; a zero-capacity
    /// tree yields its single zero-size root.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            tree: self,
            stack: vec![self.root],
        }
    }

    /// Returns an iterator tagging each byte position of the pool with its
    /// owning allocation's index or a free marker, in address order.
    pub fn units(&self) -> Units<'_> {
        Units {
            leaves: self.leaves(),
            pending: None,
        }
    }

    /// Renders the leaf layout as text: one `-,` per free byte, one
    /// `<idx>,` per allocated byte, and a `|` after each leaf.
    pub fn render(&self) -> String {
        use core::fmt::Write;

        let mut out = String::new();
        for leaf in self.leaves() {
            for _ in 0..leaf.size {
                if leaf.allocated {
                    let _ = write!(out, "{},", leaf.idx);
                } else {
                    out.push_str("-,");
                }
            }
            out.push('|');
        }
        out
    }
}

/// Left-to-right iterator over a tree's leaf regions.
///
/// Created by [`BuddyTree::leaves`].
pub struct Leaves<'a> {
    tree: &'a BuddyTree,
    stack: Vec<NodeId>,
}

impl Iterator for Leaves<'_> {
    type Item = Region;

    fn next(&mut self) -> Option<Region> {
        while let Some(id) = self.stack.pop() {
            let node = self.tree.node(id);
            match node.children {
                Some((left, right)) => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
                None => {
                    return Some(Region {
                        idx: node.idx,
                        size: node.size,
                        allocated: node.state == NodeState::Allocated,
                    })
                }
            }
        }
        None
    }
}

/// Per-byte ownership iterator over a tree's pool positions.
///
/// Created by [`BuddyTree::units`].
pub struct Units<'a> {
    leaves: Leaves<'a>,
    pending: Option<(Unit, usize)>,
}

impl Iterator for Units<'_> {
    type Item = Unit;

    fn next(&mut self) -> Option<Unit> {
        loop {
            if let Some((unit, remaining)) = self.pending {
                if remaining > 0 {
                    self.pending = Some((unit, remaining - 1));
                    return Some(unit);
                }
                self.pending = None;
            }
            let leaf = self.leaves.next()?;
            let unit = if leaf.allocated {
                Unit::Allocated(leaf.idx)
            } else {
                Unit::Free
            };
            self.pending = Some((unit, leaf.size));
        }
    }
}
