//! # Replay-LOB
//!
//! A single-symbol limit order book engine for market-data replay.
//!
//! ## Design Principles
//!
//! - **One writer, no locks**: each book instance belongs to a single
//!   thread for its whole life
//! - **Bounded work per message**: add, cancel, and modify never walk
//!   a queue; id-index growth is the one amortised step
//! - **Index-linked storage**: order records sit in a cache-line-sized
//!   arena slot and reference each other by 32-bit index
//! - **Nothing allocated at steady state**: records come from a
//!   recycling pool, levels from a slab
//!
//! ## Architecture
//!
//! ```text
//! [Message Producer] --> [OrderBook::process] --> [Reader Queries]
//!                              |
//!               arena + level slab + Robin-Hood id index
//! ```
//!
//! The producer (capture parser, decoder, generator) is an external
//! collaborator: it hands the book one decoded [`Message`] at a time,
//! in stream order. Between calls the reader interface exposes
//! top-of-book prices and best-first depth on either side. There is no
//! matching: messages describe events that already occurred on a
//! venue.

pub mod arena;
pub mod book;
pub mod book_side;
pub mod error;
pub mod index;
pub mod message;
pub mod price_level;

// Flat re-exports of the public surface
pub use arena::{ArenaIndex, OrderArena, OrderNode, NULL_INDEX};
pub use book::{LevelDepth, OrderBook};
pub use book_side::BookSide;
pub use error::BookError;
pub use index::OrderIndex;
pub use message::{Action, Message, Side};
pub use price_level::{LevelArena, LevelId, PriceLevel};
