//! Order arena - pooled storage for resting order records.
//!
//! Records live in one contiguous backing vector and are recycled
//! through a free list threaded through the `next` field of unused
//! nodes. Allocation and release are O(1); the backing store grows by
//! one node when the free list runs dry, so the pool never fails.

use std::fmt;

use crate::message::Side;

/// Reserved index meaning "no node". Links and back-references carry
/// it where pointer code would carry null.
pub const NULL_INDEX: u32 = u32::MAX;

/// Index into the arena's backing store. Half the width of a pointer,
/// which keeps a node's three links inside 12 bytes.
pub type ArenaIndex = u32;

/// A single resting order - exactly 64 bytes (one cache line).
///
/// Linkage (`next`, `prev`) and the `level` back-reference are arena
/// indices manipulated only by [`PriceLevel`](crate::PriceLevel) and
/// the book's cancel/modify paths. While an order is not resting these
/// fields are indeterminate.
#[repr(C)]
#[repr(align(64))]
#[derive(Clone, Copy)]
pub struct OrderNode {
    /// Venue-assigned order ID
    pub id: u64,

    /// Event time of the last message that touched this order
    pub timestamp: u64,

    /// Limit price in ticks
    pub price: i32,

    /// Remaining quantity
    pub size: u32,

    /// Queue successor within the owning price level
    pub next: ArenaIndex,

    /// Queue predecessor; having both directions is what makes
    /// unlink-by-id constant time
    pub prev: ArenaIndex,

    /// Handle of the owning price level in the level slab
    pub level: u32,

    /// Order side
    pub side: Side,

    /// Reserved fill marker. Never read by the book; kept for
    /// downstream consumers that tag executed records.
    pub filled: bool,
}

// Layout is load-bearing: a node is one cache line, never straddling
const _: () = assert!(
    std::mem::size_of::<OrderNode>() == 64,
    "OrderNode grew past one cache line"
);

const _: () = assert!(
    std::mem::align_of::<OrderNode>() == 64,
    "OrderNode lost its cache-line alignment"
);

impl OrderNode {
    /// Create an empty node (free-list filler)
    #[inline]
    pub const fn vacant() -> Self {
        Self {
            id: 0,
            timestamp: 0,
            price: 0,
            size: 0,
            next: NULL_INDEX,
            prev: NULL_INDEX,
            level: NULL_INDEX,
            side: Side::Bid,
            filled: false,
        }
    }
}

impl fmt::Debug for OrderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderNode")
            .field("id", &self.id)
            .field("price", &self.price)
            .field("size", &self.size)
            .field("side", &self.side)
            .field("timestamp", &self.timestamp)
            .field("prev", &self.prev)
            .field("next", &self.next)
            .field("level", &self.level)
            .finish()
    }
}

/// Pooled order storage with O(1) allocation and release.
///
/// The free list is threaded through the `next` field of unused nodes.
/// Unlike a fixed slab, the backing store grows when the free list is
/// empty: replay capacity is unknown up front and the only failure
/// mode is out-of-memory, which is fatal by `Vec` semantics.
pub struct OrderArena {
    /// Contiguous backing store
    nodes: Vec<OrderNode>,

    /// First node on the free list, or `NULL_INDEX` when dry
    free_head: ArenaIndex,

    /// Number of nodes currently handed out
    in_use: u32,
}

impl OrderArena {
    /// Create an arena with `capacity` nodes pre-allocated and chained
    /// onto the free list.
    ///
    /// # Panics
    /// Panics if capacity reaches `NULL_INDEX` (reserved sentinel).
    pub fn with_capacity(capacity: u32) -> Self {
        assert!(capacity < NULL_INDEX, "capacity collides with the null sentinel");

        let mut nodes = vec![OrderNode::vacant(); capacity as usize];

        // Chain every pre-allocated node onto the free list
        for (i, node) in nodes.iter_mut().enumerate() {
            let succ = i as u32 + 1;
            node.next = if succ == capacity { NULL_INDEX } else { succ };
        }

        Self {
            nodes,
            free_head: if capacity == 0 { NULL_INDEX } else { 0 },
            in_use: 0,
        }
    }

    /// Hand out a node, growing the backing store if the free list is
    /// empty.
    ///
    /// The returned node's payload fields are stale from its previous
    /// tenant; the caller must fully populate it before linking it
    /// into the book. Only the linkage is reset.
    ///
    /// # Complexity
    /// O(1), amortised over backing-store growth
    #[inline]
    pub fn alloc(&mut self) -> ArenaIndex {
        let index = if self.free_head == NULL_INDEX {
            let index = self.nodes.len() as u32;
            assert!(index < NULL_INDEX, "arena exhausted the index space");
            self.nodes.push(OrderNode::vacant());
            index
        } else {
            let index = self.free_head;
            self.free_head = self.nodes[index as usize].next;
            index
        };

        self.in_use += 1;
        self.nodes[index as usize].next = NULL_INDEX;
        self.nodes[index as usize].prev = NULL_INDEX;
        self.nodes[index as usize].level = NULL_INDEX;
        index
    }

    /// Return a node to the free list.
    ///
    /// The caller must have unlinked the node from every book
    /// structure first; the arena does not zero the payload.
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn free(&mut self, index: ArenaIndex) {
        debug_assert!((index as usize) < self.nodes.len(), "released index past the backing store");
        debug_assert!(self.in_use > 0, "more releases than hand-outs");

        self.nodes[index as usize].next = self.free_head;
        self.free_head = index;
        self.in_use -= 1;
    }

    /// Read access to a node.
    #[inline]
    pub fn get(&self, index: ArenaIndex) -> &OrderNode {
        debug_assert!((index as usize) < self.nodes.len(), "stale arena index");
        &self.nodes[index as usize]
    }

    /// Write access to a node.
    #[inline]
    pub fn get_mut(&mut self, index: ArenaIndex) -> &mut OrderNode {
        debug_assert!((index as usize) < self.nodes.len(), "stale arena index");
        &mut self.nodes[index as usize]
    }

    /// Number of nodes currently handed out.
    #[inline]
    pub fn in_use(&self) -> u32 {
        self.in_use
    }

    /// Total backing-store size, handed out plus free.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.nodes.len() as u32
    }

    /// Nodes waiting on the free list.
    #[inline]
    pub fn available(&self) -> u32 {
        self.capacity() - self.in_use
    }

    /// Returns true if no nodes are handed out.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.in_use == 0
    }

    /// Touch every backing page so the kernel maps it up front.
    ///
    /// Without this, first-touch page faults land inside the replay
    /// loop and show up as latency spikes.
    pub fn warm_up(&mut self) {
        for node in &mut self.nodes {
            unsafe {
                std::ptr::write_volatile(&mut node.filled, false);
            }
        }
    }
}

impl fmt::Debug for OrderArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderArena")
            .field("capacity", &self.capacity())
            .field("in_use", &self.in_use)
            .field("free_head", &self.free_head)
            .finish()
    }
}
