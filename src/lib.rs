#![deny(unreachable_pub)]
pub mod config;
pub mod maker;

pub use config::{LogConfig, Settings};
pub use maker::{
    ExchangeGateway, MakerConfig, MakerError, MakerResult, MakerRunner, MarketMaker,
    StrategyState,
};
