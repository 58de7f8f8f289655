//! Exchange abstraction for the market maker - enables mocking for tests

use async_trait::async_trait;

use super::errors::MakerResult;
use super::types::{Ladder, OrderAck, OrderSide, PositionReading};

/// Exchange operations for one symbol.
///
/// Implementations own the wire protocol, authentication, retries and the
/// streaming connection. The state machine issues one call at a time and
/// waits for it to return before issuing the next.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Place the entry ladder as post-only limit orders.
    /// Prices above `reference_price` sell, the rest buy.
    async fn place_entry_orders(
        &self,
        reference_price: f64,
        ladder: &Ladder,
        quantity: f64,
    ) -> MakerResult<Vec<OrderAck>>;

    /// Place a reduce-only, post-only ladder on `side`
    async fn place_closing_orders(
        &self,
        side: OrderSide,
        ladder: &Ladder,
        quantity: f64,
    ) -> MakerResult<Vec<OrderAck>>;

    /// Cancel every resting order for the symbol. No-op when there are none.
    async fn cancel_all_orders(&self) -> MakerResult<()>;

    /// Market-close the whole position. No-op when flat.
    async fn close_position(&self) -> MakerResult<()>;

    /// Available wallet balance in `coin`, the contract's base coin (e.g. "BTC")
    async fn get_balance(&self, coin: &str) -> MakerResult<f64>;

    /// Last traded price from the streaming feed
    async fn get_last_price(&self) -> MakerResult<f64>;

    /// Current position from the streaming feed
    async fn get_position(&self) -> MakerResult<PositionReading>;

    /// Pin a stop-loss on the open position
    async fn set_stop_loss(&self, price: f64) -> MakerResult<()>;

    /// Switch the symbol to cross margin
    async fn set_cross_margin(&self) -> MakerResult<()>;

    /// Whether the streaming feed has produced its first reading
    async fn is_feed_ready(&self) -> MakerResult<bool>;
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

/// Mock gateway for testing the market maker without an exchange connection.
pub mod mock {
    use std::sync::Arc;

    use tokio::sync::Mutex;
    use uuid::Uuid;

    use super::*;
    use crate::maker::errors::MakerError;
    use crate::maker::types::Quote;

    /// Gateway call, recorded in the order it was made
    #[derive(Debug, Clone, PartialEq)]
    pub enum GatewayCall {
        PlaceEntry { count: usize },
        PlaceClosing { side: OrderSide, count: usize },
        CancelAll,
        ClosePosition,
        GetBalance(String),
        GetLastPrice,
        GetPosition,
        SetStopLoss(f64),
        SetCrossMargin,
        IsFeedReady,
    }

    /// Mock gateway
    pub struct MockGateway {
        pub calls: Arc<Mutex<Vec<GatewayCall>>>,
        /// Quotes currently resting
        pub resting: Arc<Mutex<Vec<Quote>>>,
        pub balance: Arc<Mutex<f64>>,
        pub last_price: Arc<Mutex<f64>>,
        pub position: Arc<Mutex<PositionReading>>,
        /// Readings returned before falling back to `position`
        pub position_script: Arc<Mutex<Vec<PositionReading>>>,
        /// Prices returned before falling back to `last_price`
        pub price_script: Arc<Mutex<Vec<f64>>>,
        pub feed_ready: Arc<Mutex<bool>>,
        pub stop_loss: Arc<Mutex<Option<f64>>>,
        pub should_reject: Arc<Mutex<bool>>,
        pub fail_position_reads: Arc<Mutex<bool>>,
        pub fail_feed_checks: Arc<Mutex<bool>>,
    }

    impl MockGateway {
        pub fn new(last_price: f64, balance: f64) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                resting: Arc::new(Mutex::new(Vec::new())),
                balance: Arc::new(Mutex::new(balance)),
                last_price: Arc::new(Mutex::new(last_price)),
                position: Arc::new(Mutex::new(PositionReading::Empty)),
                position_script: Arc::new(Mutex::new(Vec::new())),
                price_script: Arc::new(Mutex::new(Vec::new())),
                feed_ready: Arc::new(Mutex::new(true)),
                stop_loss: Arc::new(Mutex::new(None)),
                should_reject: Arc::new(Mutex::new(false)),
                fail_position_reads: Arc::new(Mutex::new(false)),
                fail_feed_checks: Arc::new(Mutex::new(false)),
            }
        }

        pub async fn set_last_price(&self, price: f64) {
            *self.last_price.lock().await = price;
        }

        pub async fn set_position(&self, reading: PositionReading) {
            *self.position.lock().await = reading;
        }

        /// Queue readings served by the next `get_position` calls, in order
        pub async fn script_positions(&self, readings: Vec<PositionReading>) {
            let mut script = self.position_script.lock().await;
            script.clear();
            script.extend(readings.into_iter().rev());
        }

        /// Queue prices served by the next `get_last_price` calls, in order
        pub async fn script_prices(&self, prices: Vec<f64>) {
            let mut script = self.price_script.lock().await;
            script.clear();
            script.extend(prices.into_iter().rev());
        }

        pub async fn set_feed_ready(&self, ready: bool) {
            *self.feed_ready.lock().await = ready;
        }

        pub async fn set_should_reject(&self, reject: bool) {
            *self.should_reject.lock().await = reject;
        }

        pub async fn set_fail_position_reads(&self, fail: bool) {
            *self.fail_position_reads.lock().await = fail;
        }

        pub async fn set_fail_feed_checks(&self, fail: bool) {
            *self.fail_feed_checks.lock().await = fail;
        }

        pub async fn calls(&self) -> Vec<GatewayCall> {
            self.calls.lock().await.clone()
        }

        pub async fn clear_calls(&self) {
            self.calls.lock().await.clear();
        }

        pub async fn resting(&self) -> Vec<Quote> {
            self.resting.lock().await.clone()
        }

        async fn record(&self, call: GatewayCall) {
            self.calls.lock().await.push(call);
        }

        async fn accept(&self, quotes: Vec<Quote>) -> MakerResult<Vec<OrderAck>> {
            if *self.should_reject.lock().await {
                return Err(MakerError::Submission("Mock rejection".into()));
            }

            let acks = quotes
                .iter()
                .map(|q| OrderAck {
                    order_id: Uuid::new_v4().to_string(),
                    side: q.side(),
                    price: q.price(),
                })
                .collect();
            self.resting.lock().await.extend(quotes);
            Ok(acks)
        }
    }

    #[async_trait]
    impl ExchangeGateway for MockGateway {
        async fn place_entry_orders(
            &self,
            reference_price: f64,
            ladder: &Ladder,
            quantity: f64,
        ) -> MakerResult<Vec<OrderAck>> {
            self.record(GatewayCall::PlaceEntry { count: ladder.len() }).await;
            self.accept(ladder.entry_quotes(reference_price, quantity)).await
        }

        async fn place_closing_orders(
            &self,
            side: OrderSide,
            ladder: &Ladder,
            quantity: f64,
        ) -> MakerResult<Vec<OrderAck>> {
            self.record(GatewayCall::PlaceClosing {
                side,
                count: ladder.len(),
            })
            .await;
            let quotes = ladder
                .iter()
                .map(|price| Quote::closing(side, price, quantity))
                .collect();
            self.accept(quotes).await
        }

        async fn cancel_all_orders(&self) -> MakerResult<()> {
            self.record(GatewayCall::CancelAll).await;
            self.resting.lock().await.clear();
            Ok(())
        }

        async fn close_position(&self) -> MakerResult<()> {
            self.record(GatewayCall::ClosePosition).await;
            *self.position.lock().await = PositionReading::Empty;
            Ok(())
        }

        async fn get_balance(&self, coin: &str) -> MakerResult<f64> {
            self.record(GatewayCall::GetBalance(coin.to_string())).await;
            Ok(*self.balance.lock().await)
        }

        async fn get_last_price(&self) -> MakerResult<f64> {
            self.record(GatewayCall::GetLastPrice).await;
            if let Some(price) = self.price_script.lock().await.pop() {
                return Ok(price);
            }
            Ok(*self.last_price.lock().await)
        }

        async fn get_position(&self) -> MakerResult<PositionReading> {
            self.record(GatewayCall::GetPosition).await;
            if *self.fail_position_reads.lock().await {
                return Err(MakerError::Exchange("Mock position read failure".into()));
            }
            if let Some(reading) = self.position_script.lock().await.pop() {
                return Ok(reading);
            }
            Ok(*self.position.lock().await)
        }

        async fn set_stop_loss(&self, price: f64) -> MakerResult<()> {
            self.record(GatewayCall::SetStopLoss(price)).await;
            *self.stop_loss.lock().await = Some(price);
            Ok(())
        }

        async fn set_cross_margin(&self) -> MakerResult<()> {
            self.record(GatewayCall::SetCrossMargin).await;
            Ok(())
        }

        async fn is_feed_ready(&self) -> MakerResult<bool> {
            self.record(GatewayCall::IsFeedReady).await;
            if *self.fail_feed_checks.lock().await {
                return Err(MakerError::Exchange("Mock feed check failure".into()));
            }
            Ok(*self.feed_ready.lock().await)
        }
    }
}
