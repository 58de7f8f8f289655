//! Market maker runner - main execution loop

use log::{error, info};
use serde::{Deserialize, Serialize};

use super::clock::Clock;
use super::errors::{MakerError, MakerResult};
use super::gateway::ExchangeGateway;
use super::machine::MarketMaker;
use super::types::MakerSummary;

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Recoverable errors in a row before the runner flattens and stops
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
}

fn default_max_consecutive_errors() -> u32 {
    5
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_consecutive_errors: default_max_consecutive_errors(),
        }
    }
}

/// Drives the state machine: one step, then sleep for the delay it asks for
pub struct MakerRunner<G: ExchangeGateway, C: Clock> {
    maker: MarketMaker<G, C>,
    runner_config: RunnerConfig,
}

impl<G: ExchangeGateway, C: Clock> MakerRunner<G, C> {
    pub fn new(maker: MarketMaker<G, C>, runner_config: RunnerConfig) -> Self {
        Self {
            maker,
            runner_config,
        }
    }

    /// Run until a fatal error.
    ///
    /// Recoverable errors are logged and retried on the next cycle. Too many in
    /// a row flattens the account and stops with `TooManyErrors`.
    pub async fn run(&mut self) -> MakerResult<()> {
        let config = self.maker.config();
        info!(
            "Starting grid market maker: symbol={}, orders={}, spread={}, margin={}, reset={}s, endpoint={:?}",
            config.symbol,
            config.order_count,
            config.spread,
            config.margin_fraction,
            config.order_reset_secs,
            config.endpoint
        );

        let mut consecutive_errors = 0u32;

        loop {
            let delay = match self.maker.step().await {
                Ok(tick) => {
                    consecutive_errors = 0;
                    tick.next_poll
                }
                Err(e) if e.is_fatal() => {
                    error!("Fatal error, stopping: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    consecutive_errors += 1;
                    error!(
                        "Error while {} ({}/{}): {}",
                        self.maker.state(),
                        consecutive_errors,
                        self.runner_config.max_consecutive_errors,
                        e
                    );

                    if consecutive_errors >= self.runner_config.max_consecutive_errors {
                        error!("Too many errors, flattening and shutting down");
                        self.maker.flatten().await;
                        return Err(MakerError::TooManyErrors {
                            count: consecutive_errors,
                        });
                    }

                    self.maker.config().poll.cycle()
                }
            };

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    pub fn summary(&self) -> MakerSummary {
        self.maker.summary()
    }
}

/// Initialise `env_logger`, using `level` unless `RUST_LOG` is already set
pub fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    env_logger::Builder::from_env(env).try_init().ok();
}
