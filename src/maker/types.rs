//! Core data types for the market maker

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pricer::side_for_price;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    /// Convert to exchange side string
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "Buy",
            OrderSide::Sell => "Sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single limit order to submit. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    side: OrderSide,
    price: f64,
    quantity: f64,
    post_only: bool,
    reduce_only: bool,
}

impl Quote {
    /// Post-only entry quote
    pub fn entry(side: OrderSide, price: f64, quantity: f64) -> Self {
        Self {
            side,
            price,
            quantity,
            post_only: true,
            reduce_only: false,
        }
    }

    /// Post-only, reduce-only quote used to unwind a position
    pub fn closing(side: OrderSide, price: f64, quantity: f64) -> Self {
        Self {
            side,
            price,
            quantity,
            post_only: true,
            reduce_only: true,
        }
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn post_only(&self) -> bool {
        self.post_only
    }

    pub fn reduce_only(&self) -> bool {
        self.reduce_only
    }
}

/// Ordered sequence of limit prices
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ladder {
    prices: Vec<f64>,
}

impl Ladder {
    pub fn new(prices: Vec<f64>) -> Self {
        Self { prices }
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.prices.iter().copied()
    }

    /// Entry quotes for this ladder, sides split around `reference_price`
    pub fn entry_quotes(&self, reference_price: f64, quantity: f64) -> Vec<Quote> {
        self.iter()
            .map(|price| Quote::entry(side_for_price(price, reference_price), price, quantity))
            .collect()
    }
}

/// Reduce-only unwind ladder for an open position
#[derive(Debug, Clone, PartialEq)]
pub struct ClosingLadder {
    /// Side of every closing order (opposite of the position)
    pub side: OrderSide,
    pub ladder: Ladder,
    /// Quantity per closing order
    pub quantity: f64,
}

impl ClosingLadder {
    /// Total quantity across all closing orders
    pub fn total_quantity(&self) -> f64 {
        self.quantity * self.ladder.len() as f64
    }
}

/// Side of an exchange position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Buy,
    Sell,
    None,
}

impl PositionSide {
    /// Order side that opened this position, if any
    pub fn as_order_side(&self) -> Option<OrderSide> {
        match self {
            PositionSide::Buy => Some(OrderSide::Buy),
            PositionSide::Sell => Some(OrderSide::Sell),
            PositionSide::None => None,
        }
    }
}

/// Exchange position for the traded symbol
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub side: PositionSide,
    /// Absolute position size in contracts
    pub size: f64,
    pub entry_price: f64,
}

impl Position {
    pub fn new(side: PositionSide, size: f64, entry_price: f64) -> Self {
        Self {
            side,
            size,
            entry_price,
        }
    }

    /// Whether this position holds inventory on a known side
    pub fn is_open(&self) -> bool {
        self.size > 0.0 && self.side != PositionSide::None
    }
}

/// Result of a position query
///
/// `Pending` means the streaming feed has not delivered position data yet.
/// It is not the same as `Empty`, which is a real observation of no position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionReading {
    Pending,
    Empty,
    Live(Position),
}

impl PositionReading {
    /// Position size, zero when pending or empty
    pub fn size(&self) -> f64 {
        match self {
            PositionReading::Live(position) => position.size,
            PositionReading::Pending | PositionReading::Empty => 0.0,
        }
    }

    /// The position, if one is open
    pub fn open(&self) -> Option<&Position> {
        match self {
            PositionReading::Live(position) if position.is_open() => Some(position),
            _ => None,
        }
    }

    /// True only for an actual observation of zero size
    pub fn is_flat(&self) -> bool {
        match self {
            PositionReading::Empty => true,
            PositionReading::Live(position) => position.size == 0.0,
            PositionReading::Pending => false,
        }
    }
}

/// Acknowledgement for a placed order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub order_id: String,
    pub side: OrderSide,
    pub price: f64,
}

/// Per-cycle session, created when an entry ladder is placed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionContext {
    /// Median of the ladder
    pub reference_price: f64,
    /// Distance between adjacent ladder prices
    pub step_interval: f64,
    pub per_order_quantity: f64,
    pub ladder_set_time: DateTime<Utc>,
}

/// Strategy state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyState {
    /// Waiting for the streaming feed to produce its first reading
    AwaitingFeed,
    /// Ready to place a fresh entry ladder
    Quoting,
    /// Entry ladder resting, watching for fills and recross
    Monitoring,
    /// Closing ladder resting, waiting for the position to go flat
    Closing,
}

impl fmt::Display for StrategyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyState::AwaitingFeed => "awaiting_feed",
            StrategyState::Quoting => "quoting",
            StrategyState::Monitoring => "monitoring",
            StrategyState::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// Snapshot of the state machine
#[derive(Debug, Clone, PartialEq)]
pub struct MakerSummary {
    pub state: StrategyState,
    pub session: Option<SessionContext>,
    /// Cycles that ended with the position closed out
    pub cycles_completed: u32,
    /// Cycles abandoned by the reset timer
    pub resets: u32,
}
