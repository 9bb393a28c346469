//! Order book - canonical book state rebuilt from a replay stream.
//!
//! Composes the order arena, the level slab, the id index, and the two
//! sorted book sides, and keeps them consistent through add, cancel,
//! and modify. Strictly single-threaded: each [`OrderBook::process`]
//! call is the atomic unit, and every invariant holds between calls.

use tracing::trace;

use crate::arena::OrderArena;
use crate::book_side::BookSide;
use crate::error::BookError;
use crate::index::OrderIndex;
use crate::message::{Action, Message, Side};
use crate::price_level::{LevelArena, LevelId};

/// Aggregate view of one price level, as yielded by depth iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelDepth {
    /// Limit price in ticks
    pub price: i32,
    /// Total resting quantity at this price
    pub volume: u64,
    /// Number of resting orders at this price
    pub count: u32,
}

/// Single-symbol limit order book.
///
/// Ingests add/cancel/modify messages in stream order and maintains
/// every resting order, every active price level, and an id lookup
/// over the whole book. There is no matching: messages describe events
/// that already happened on the venue.
pub struct OrderBook {
    arena: OrderArena,
    levels: LevelArena,
    index: OrderIndex,
    bids: BookSide,
    asks: BookSide,
}

impl OrderBook {
    /// Create a book with modest pre-allocation, suitable for tests
    /// and short replays.
    pub fn new() -> Self {
        Self::with_capacity(64, 1024)
    }

    /// Create a book pre-sized for a capture: `levels` active price
    /// levels per side and `orders` resting orders.
    pub fn with_capacity(levels: usize, orders: u32) -> Self {
        Self {
            arena: OrderArena::with_capacity(orders),
            levels: LevelArena::with_capacity(levels * 2),
            index: OrderIndex::with_capacity(orders as usize),
            bids: BookSide::with_capacity(Side::Bid, levels),
            asks: BookSide::with_capacity(Side::Ask, levels),
        }
    }

    /// Apply one replay message.
    ///
    /// The producer guarantees ids are unique while resting and
    /// timestamps are non-decreasing; neither is enforced here.
    /// Cancel of an unknown id fails with [`BookError::UnknownOrder`]
    /// and leaves the book untouched. Modify of an unknown id is
    /// promoted to an add, since feeds interleave modifies for orders
    /// that predate the capture.
    #[inline]
    pub fn process(&mut self, msg: Message) -> Result<(), BookError> {
        match msg.action {
            Action::Add => {
                self.add(msg);
                Ok(())
            }
            Action::Cancel => self.cancel(msg),
            Action::Modify => {
                self.modify(msg);
                Ok(())
            }
        }
    }

    fn add(&mut self, msg: Message) {
        trace!("add {} {:?} {}@{}", msg.id, msg.side, msg.size, msg.price);

        let index = self.arena.alloc();
        let node = self.arena.get_mut(index);
        node.id = msg.id;
        node.price = msg.price;
        node.size = msg.size;
        node.side = msg.side;
        node.timestamp = msg.timestamp;
        node.filled = false;

        let level_id = self.locate_or_create_level(msg.side, msg.price);
        self.levels.get_mut(level_id).push_back(&mut self.arena, index);
        self.arena.get_mut(index).level = level_id;

        self.index.insert(msg.id, index);
    }

    fn cancel(&mut self, msg: Message) -> Result<(), BookError> {
        let Some(index) = self.index.find(msg.id) else {
            return Err(BookError::UnknownOrder { id: msg.id });
        };

        let node = self.arena.get(index);
        debug_assert_eq!(node.id, msg.id, "id index points at a foreign record");
        let level_id = node.level;
        let side = node.side;
        let price = node.price;

        trace!("cancel {} {:?} @{}", msg.id, side, price);

        self.index.erase(msg.id);
        let now_empty = self.levels.get_mut(level_id).remove(&mut self.arena, index);
        if now_empty {
            self.erase_level(side, price, level_id);
        }
        self.arena.free(index);
        Ok(())
    }

    fn modify(&mut self, msg: Message) {
        let Some(index) = self.index.find(msg.id) else {
            trace!("modify for unknown order {}; promoting to add", msg.id);
            return self.add(msg);
        };

        let node = self.arena.get(index);
        let level_id = node.level;
        let side = node.side;
        let old_price = node.price;
        let old_size = node.size;
        debug_assert_eq!(side, msg.side, "modify moved order {} across sides", msg.id);

        if old_price != msg.price {
            // Reshape: leave the old level, join the new one. The id
            // and the arena slot survive, so the index entry stands.
            let now_empty = self.levels.get_mut(level_id).remove(&mut self.arena, index);
            if now_empty {
                self.erase_level(side, old_price, level_id);
            }

            let node = self.arena.get_mut(index);
            node.price = msg.price;
            node.size = msg.size;
            node.timestamp = msg.timestamp;

            let new_level = self.locate_or_create_level(side, msg.price);
            self.levels.get_mut(new_level).push_back(&mut self.arena, index);
            self.arena.get_mut(index).level = new_level;
        } else if msg.size > old_size {
            // Size increase at the same price loses time priority:
            // requeue at the tail
            self.levels.get_mut(level_id).remove(&mut self.arena, index);

            let node = self.arena.get_mut(index);
            node.size = msg.size;
            node.timestamp = msg.timestamp;

            self.levels.get_mut(level_id).push_back(&mut self.arena, index);
            self.arena.get_mut(index).level = level_id;
        } else {
            // Shrink (or equal size) keeps queue position
            let node = self.arena.get_mut(index);
            node.size = msg.size;
            node.timestamp = msg.timestamp;
            self.levels
                .get_mut(level_id)
                .subtract_volume(old_size - msg.size);
        }
    }

    fn locate_or_create_level(&mut self, side: Side, price: i32) -> LevelId {
        match side {
            Side::Bid => self.bids.locate_or_create(price, &mut self.levels),
            Side::Ask => self.asks.locate_or_create(price, &mut self.levels),
        }
    }

    fn erase_level(&mut self, side: Side, price: i32, level_id: LevelId) {
        let removed = match side {
            Side::Bid => self.bids.erase(price),
            Side::Ask => self.asks.erase(price),
        };
        debug_assert_eq!(removed, Some(level_id), "book side lost track of a level");
        self.levels.free(level_id);
    }

    fn book_side(&self, side: Side) -> &BookSide {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    // ========================================================================
    // Reader interface - valid between `process` calls
    // ========================================================================

    /// Highest resting bid price. `None` when no bids rest.
    #[inline]
    pub fn best_bid_price(&self) -> Option<i32> {
        self.bids.best().map(|(price, _)| price)
    }

    /// Lowest resting ask price. `None` when no asks rest.
    #[inline]
    pub fn best_ask_price(&self) -> Option<i32> {
        self.asks.best().map(|(price, _)| price)
    }

    /// Total quantity at the best bid level.
    #[inline]
    pub fn best_bid_volume(&self) -> Option<u64> {
        self.bids.best().map(|(_, id)| self.levels.get(id).volume)
    }

    /// Total quantity at the best ask level.
    #[inline]
    pub fn best_ask_volume(&self) -> Option<u64> {
        self.asks.best().map(|(_, id)| self.levels.get(id).volume)
    }

    /// Integer midpoint of the touch, truncated toward zero. `None`
    /// when either side is empty.
    #[inline]
    pub fn mid_price(&self) -> Option<i32> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some(((bid as i64 + ask as i64) / 2) as i32),
            _ => None,
        }
    }

    /// Best ask minus best bid. Negative while the replay is crossed,
    /// which is legal mid-reshape on some feeds.
    #[inline]
    pub fn spread(&self) -> Option<i64> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some(ask as i64 - bid as i64),
            _ => None,
        }
    }

    /// Total resting orders across both sides.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    /// Number of active bid levels.
    #[inline]
    pub fn bid_level_count(&self) -> usize {
        self.bids.len()
    }

    /// Number of active ask levels.
    #[inline]
    pub fn ask_level_count(&self) -> usize {
        self.asks.len()
    }

    /// Returns true when nothing rests on either side.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterate one side's levels best-first.
    ///
    /// The iterator stays valid across queries but not across calls to
    /// [`OrderBook::process`].
    pub fn depth(&self, side: Side) -> impl Iterator<Item = LevelDepth> + '_ {
        self.book_side(side).iter_from_best().map(move |(price, id)| {
            let level = self.levels.get(id);
            LevelDepth {
                price,
                volume: level.volume,
                count: level.count,
            }
        })
    }

    /// Aggregate (volume, order count) at one price, `(0, 0)` if the
    /// level is not active.
    pub fn depth_at(&self, side: Side, price: i32) -> (u64, u32) {
        self.book_side(side)
            .locate(price)
            .map(|id| {
                let level = self.levels.get(id);
                (level.volume, level.count)
            })
            .unwrap_or((0, 0))
    }

    /// Order ids resting at one price, oldest first. Empty if the
    /// level is not active.
    pub fn level_orders(&self, side: Side, price: i32) -> impl Iterator<Item = u64> + '_ {
        self.book_side(side)
            .locate(price)
            .into_iter()
            .flat_map(move |id| {
                self.levels
                    .get(id)
                    .iter(&self.arena)
                    .map(move |idx| self.arena.get(idx).id)
            })
    }

    /// Backing-store size of the order pool.
    #[inline]
    pub fn pool_capacity(&self) -> u32 {
        self.arena.capacity()
    }

    /// Free-list length of the order pool.
    #[inline]
    pub fn pool_available(&self) -> u32 {
        self.arena.available()
    }

    /// Pre-fault pool memory before the replay hot loop.
    pub fn warm_up(&mut self) {
        self.arena.warm_up();
    }

    /// Walk the whole book and assert every cross-structure invariant:
    /// level aggregates match their FIFOs, back-references match the
    /// owning level, the id index covers exactly the resting set, side
    /// orderings are strict, and pool accounting balances. Debugging
    /// aid for tests and replay harnesses; O(book).
    pub fn check_invariants(&self) {
        let mut resting = 0u64;

        for side in [Side::Bid, Side::Ask] {
            let book_side = self.book_side(side);
            let mut prev_price: Option<i32> = None;

            for (price, level_id) in book_side.iter_from_best() {
                if let Some(prev) = prev_price {
                    match side {
                        Side::Bid => assert!(price < prev, "bid levels out of order"),
                        Side::Ask => assert!(price > prev, "ask levels out of order"),
                    }
                }
                prev_price = Some(price);

                let level = self.levels.get(level_id);
                assert!(level.count > 0, "empty level left on side {:?}", side);
                assert_eq!(level.price, price, "level price disagrees with side entry");
                assert_eq!(level.side, side, "level side tag disagrees with its side");

                let mut volume = 0u64;
                let mut count = 0u32;
                for idx in level.iter(&self.arena) {
                    let node = self.arena.get(idx);
                    assert_eq!(node.price, level.price, "order price strayed from level");
                    assert_eq!(node.side, side, "order side strayed from level");
                    assert_eq!(node.level, level_id, "order back-reference strayed");
                    assert_eq!(
                        self.index.find(node.id),
                        Some(idx),
                        "id index lost order {}",
                        node.id
                    );
                    volume += node.size as u64;
                    count += 1;
                }
                assert_eq!(volume, level.volume, "level volume out of sync");
                assert_eq!(count, level.count, "level count out of sync");
                resting += count as u64;
            }
        }

        assert_eq!(resting as usize, self.index.len(), "index size != resting orders");
        assert_eq!(resting, self.arena.in_use() as u64, "pool hand-outs != resting orders");
        assert_eq!(
            self.arena.available() + self.arena.in_use(),
            self.arena.capacity(),
            "pool accounting out of balance"
        );
        self.index.check_probe_invariant();
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("best_bid", &self.best_bid_price())
            .field("best_ask", &self.best_ask_price())
            .field("bid_levels", &self.bids.len())
            .field("ask_levels", &self.asks.len())
            .field("order_count", &self.index.len())
            .finish()
    }
}
