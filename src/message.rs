//! Message types for the replay stream.
//!
//! A producer (file reader, decoder, generator) hands the book one
//! decoded [`Message`] at a time, in non-decreasing timestamp order.

/// Which half of the book an order rests on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    /// Buying interest; a higher price is better
    Bid = 0,
    /// Selling interest; a lower price is better
    Ask = 1,
}

/// What a replay message does to the book.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Action {
    /// A new order entered the book
    Add = 0,
    /// A resting order left the book
    Cancel = 1,
    /// A resting order changed price and/or size
    Modify = 2,
}

impl Action {
    /// Decode a raw action byte from a capture.
    ///
    /// Unknown codes yield `None`; the replay loop skips them
    /// (permissive replay: historical captures carry action codes
    /// this book does not model).
    #[inline]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            b'A' => Some(Action::Add),
            b'C' => Some(Action::Cancel),
            b'M' => Some(Action::Modify),
            _ => None,
        }
    }
}

/// One decoded market-by-order event.
///
/// Prices are signed fixed-point ticks (some venues quote negative
/// prices). Timestamps are nanoseconds since epoch and are expected,
/// but not required, to be non-decreasing across the stream.
#[derive(Clone, Copy, Debug)]
pub struct Message {
    /// Venue-assigned order ID, unique while the order rests
    pub id: u64,
    /// Event time in nanoseconds since epoch
    pub timestamp: u64,
    /// Limit price in ticks
    pub price: i32,
    /// Quantity, in whatever unit the venue counts
    pub size: u32,
    /// Order side
    pub side: Side,
    /// Event kind
    pub action: Action,
}

impl Message {
    /// Build an add message.
    #[inline]
    pub const fn add(id: u64, timestamp: u64, price: i32, size: u32, side: Side) -> Self {
        Self {
            id,
            timestamp,
            price,
            size,
            side,
            action: Action::Add,
        }
    }

    /// Build a cancel message. Price and size are carried through from
    /// the capture but the book resolves the order by id.
    #[inline]
    pub const fn cancel(id: u64, timestamp: u64, price: i32, size: u32, side: Side) -> Self {
        Self {
            id,
            timestamp,
            price,
            size,
            side,
            action: Action::Cancel,
        }
    }

    /// Build a modify message.
    #[inline]
    pub const fn modify(id: u64, timestamp: u64, price: i32, size: u32, side: Side) -> Self {
        Self {
            id,
            timestamp,
            price,
            size,
            side,
            action: Action::Modify,
        }
    }
}
