//! Grid Market Maker Module
//!
//! A single-symbol grid market maker. Each cycle places a symmetric ladder of
//! post-only limit orders around the last price, waits for fills, and unwinds
//! the resulting position with a reduce-only ladder once price crosses back
//! over the ladder's median. An unfilled ladder is cancelled and re-quoted
//! after a reset window.
//!
//! # Architecture
//!
//! - [`config`] - Strategy configuration and validation
//! - [`types`] - Core data types (Quote, Ladder, PositionReading, etc.)
//! - [`errors`] - Market maker error types
//! - [`pricer`] - Entry ladder prices and side assignment
//! - [`sizing`] - Per-order quantity
//! - [`closing`] - Reduce-only unwind ladder
//! - [`clock`] - Injectable time source for the reset timer
//! - [`gateway`] - Exchange abstraction (mockable for testing)
//! - [`machine`] - The state machine, one `step()` per poll tick
//! - [`runner`] - Main execution loop
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use grid_market_maker::maker::{MakerConfig, MakerRunner, MarketMaker, RunnerConfig, SystemClock};
//!
//! // 10 orders across a $50 spread, 10% of balance, re-quote after 2 minutes
//! let config = MakerConfig::new("BTCUSD", 10, 50.0, 0.1, 120);
//!
//! // `gateway` is any ExchangeGateway implementation
//! let maker = MarketMaker::new(config, Arc::new(gateway), Arc::new(SystemClock))?;
//! let mut runner = MakerRunner::new(maker, RunnerConfig::default());
//!
//! runner.run().await?;
//! ```
//!
//! # Testing
//!
//! ```rust,ignore
//! use grid_market_maker::maker::gateway::mock::MockGateway;
//! use grid_market_maker::maker::ManualClock;
//!
//! let gateway = Arc::new(MockGateway::new(100.0, 1000.0));
//! let clock = Arc::new(ManualClock::default());
//!
//! // Drive `maker.step()` and advance `clock` by hand...
//! ```

pub mod clock;
pub mod closing;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod machine;
pub mod pricer;
pub mod runner;
pub mod sizing;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use closing::{compute_closing_ladder, filled_order_count};
pub use config::{Endpoint, MakerConfig, PollIntervals, MAX_ORDER_COUNT};
pub use errors::{MakerError, MakerResult};
pub use gateway::ExchangeGateway;
pub use machine::{has_recrossed, reset_due, MarketMaker, Tick};
pub use pricer::{compute_ladder, side_for_price, step_interval};
pub use runner::{init_logging, MakerRunner, RunnerConfig};
pub use sizing::compute_quantity;
pub use types::{
    ClosingLadder, Ladder, MakerSummary, OrderAck, OrderSide, Position, PositionReading,
    PositionSide, Quote, SessionContext, StrategyState,
};
