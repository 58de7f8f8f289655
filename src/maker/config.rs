//! Market maker configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{MakerError, MakerResult};

/// Upper bound on ladder size accepted by the exchange in one cycle
pub const MAX_ORDER_COUNT: u32 = 50;

/// Exchange environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    #[default]
    Testnet,
    Mainnet,
}

impl Endpoint {
    /// REST endpoint for order entry and account queries
    pub fn rest_url(&self) -> &'static str {
        match self {
            Endpoint::Testnet => "https://api-testnet.bybit.com",
            Endpoint::Mainnet => "https://api.bybit.com",
        }
    }

    /// Streaming endpoint for instrument and position updates
    pub fn ws_url(&self) -> &'static str {
        match self {
            Endpoint::Testnet => "wss://stream-testnet.bybit.com/realtime",
            Endpoint::Mainnet => "wss://stream.bybit.com/realtime",
        }
    }

    pub fn is_mainnet(&self) -> bool {
        matches!(self, Endpoint::Mainnet)
    }
}

/// Poll cadences used between state machine steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollIntervals {
    /// Delay between feed readiness checks
    #[serde(default = "default_feed_ms")]
    pub feed_ms: u64,
    /// Delay between position checks while holding inventory
    #[serde(default = "default_position_ms")]
    pub position_ms: u64,
    /// Delay at the top of each outer cycle
    #[serde(default = "default_cycle_ms")]
    pub cycle_ms: u64,
}

fn default_feed_ms() -> u64 {
    1_000
}

fn default_position_ms() -> u64 {
    1_000
}

fn default_cycle_ms() -> u64 {
    3_000
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            feed_ms: default_feed_ms(),
            position_ms: default_position_ms(),
            cycle_ms: default_cycle_ms(),
        }
    }
}

impl PollIntervals {
    pub fn feed(&self) -> Duration {
        Duration::from_millis(self.feed_ms)
    }

    pub fn position(&self) -> Duration {
        Duration::from_millis(self.position_ms)
    }

    pub fn cycle(&self) -> Duration {
        Duration::from_millis(self.cycle_ms)
    }
}

/// Strategy configuration. Read-only for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakerConfig {
    /// Inverse contract to quote (e.g., "BTCUSD"). USDT pairs are not supported.
    pub symbol: String,

    /// Number of orders in the entry ladder (2..=50)
    pub order_count: u32,

    /// Total price width covered by the ladder
    pub spread: f64,

    /// Fraction of available balance backing the ladder (0.0-1.0]
    pub margin_fraction: f64,

    /// Seconds an unfilled ladder may rest before it is cancelled and re-quoted
    pub order_reset_secs: u64,

    /// Exchange environment
    #[serde(default)]
    pub endpoint: Endpoint,

    #[serde(default)]
    pub poll: PollIntervals,
}

impl MakerConfig {
    /// Create a configuration with default endpoint and poll cadence
    ///
    /// # Arguments
    /// * `symbol` - Contract to trade (e.g., "BTCUSD")
    /// * `order_count` - Orders per ladder
    /// * `spread` - Ladder width in price units
    /// * `margin_fraction` - Share of balance committed to the ladder
    /// * `order_reset_secs` - Reset window for an unfilled ladder
    pub fn new(
        symbol: impl Into<String>,
        order_count: u32,
        spread: f64,
        margin_fraction: f64,
        order_reset_secs: u64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            order_count,
            spread,
            margin_fraction,
            order_reset_secs,
            endpoint: Endpoint::default(),
            poll: PollIntervals::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> MakerResult<()> {
        if self.symbol.is_empty() {
            return Err(MakerError::InvalidConfig("symbol cannot be empty".into()));
        }

        if self.symbol.to_uppercase().ends_with("USDT") {
            return Err(MakerError::InvalidConfig(format!(
                "{} is a USDT pair; only inverse (USD) contracts are supported",
                self.symbol
            )));
        }

        if self.order_count < 2 {
            return Err(MakerError::InvalidConfig(
                "order_count must be at least 2".into(),
            ));
        }

        if self.order_count > MAX_ORDER_COUNT {
            return Err(MakerError::InvalidConfig(format!(
                "order_count must be {} or below",
                MAX_ORDER_COUNT
            )));
        }

        if !self.spread.is_finite() || self.spread <= 0.0 {
            return Err(MakerError::InvalidConfig("spread must be positive".into()));
        }

        if !(self.margin_fraction > 0.0 && self.margin_fraction <= 1.0) {
            return Err(MakerError::InvalidConfig(
                "margin_fraction must be in (0.0, 1.0]".into(),
            ));
        }

        if self.order_reset_secs == 0 {
            return Err(MakerError::InvalidConfig(
                "order_reset_secs must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Coin the wallet balance is held in (e.g., "BTC" for "BTCUSD")
    pub fn balance_coin(&self) -> &str {
        self.symbol.get(..3).unwrap_or(&self.symbol)
    }

    /// How long an unfilled ladder may rest
    pub fn reset_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.order_reset_secs as i64)
    }
}
