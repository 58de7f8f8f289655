//! Market maker state machine - one `step()` per poll tick

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use super::clock::Clock;
use super::closing::compute_closing_ladder;
use super::config::MakerConfig;
use super::errors::{MakerError, MakerResult};
use super::gateway::ExchangeGateway;
use super::pricer::{compute_ladder, step_interval};
use super::sizing::compute_quantity;
use super::types::{
    ClosingLadder, MakerSummary, Position, PositionReading, PositionSide, SessionContext,
    StrategyState,
};

/// Outcome of one step: the state after it and how long to wait before the next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub state: StrategyState,
    pub next_poll: Duration,
}

/// Whether price has moved back through the median against the position
pub fn has_recrossed(side: PositionSide, last_price: f64, median: f64) -> bool {
    match side {
        PositionSide::Buy => last_price > median,
        PositionSide::Sell => last_price < median,
        PositionSide::None => false,
    }
}

/// Whether an unfilled ladder should be cancelled and re-quoted.
///
/// All four must hold: the window has elapsed, the machine is not closing,
/// a ladder is resting, and the observed position is exactly zero.
pub fn reset_due(
    elapsed: chrono::Duration,
    window: chrono::Duration,
    state: StrategyState,
    ladder_placed: bool,
    observed_size: f64,
) -> bool {
    elapsed > window && state != StrategyState::Closing && ladder_placed && observed_size == 0.0
}

/// Grid market maker state machine
///
/// Owns the per-cycle session and strategy state. Every gateway call is awaited
/// before the next one is issued, so at most one order-modifying request is in
/// flight.
pub struct MarketMaker<G: ExchangeGateway, C: Clock> {
    config: MakerConfig,
    gateway: Arc<G>,
    clock: Arc<C>,
    state: StrategyState,
    session: Option<SessionContext>,
    /// Set once any position held before startup has been flattened
    inherited_position_cleared: bool,
    cycles_completed: u32,
    resets: u32,
}

impl<G: ExchangeGateway, C: Clock> MarketMaker<G, C> {
    /// Create a new state machine in `AwaitingFeed`
    pub fn new(config: MakerConfig, gateway: Arc<G>, clock: Arc<C>) -> MakerResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            gateway,
            clock,
            state: StrategyState::AwaitingFeed,
            session: None,
            inherited_position_cleared: false,
            cycles_completed: 0,
            resets: 0,
        })
    }

    pub fn config(&self) -> &MakerConfig {
        &self.config
    }

    pub fn state(&self) -> StrategyState {
        self.state
    }

    pub fn session(&self) -> Option<&SessionContext> {
        self.session.as_ref()
    }

    pub fn summary(&self) -> MakerSummary {
        MakerSummary {
            state: self.state,
            session: self.session,
            cycles_completed: self.cycles_completed,
            resets: self.resets,
        }
    }

    /// Advance the machine by one poll tick
    pub async fn step(&mut self) -> MakerResult<Tick> {
        match self.state {
            StrategyState::AwaitingFeed => self.await_feed().await,
            StrategyState::Quoting => self.quote().await,
            StrategyState::Monitoring => self.monitor().await,
            StrategyState::Closing => self.watch_close().await,
        }
    }

    /// Best-effort cancel of every order and close of the position
    pub async fn flatten(&self) {
        if let Err(e) = self.gateway.cancel_all_orders().await {
            warn!("Failed to cancel orders while flattening: {}", e);
        }
        if let Err(e) = self.gateway.close_position().await {
            warn!("Failed to close position while flattening: {}", e);
        }
    }

    fn tick(&self, next_poll: Duration) -> Tick {
        Tick {
            state: self.state,
            next_poll,
        }
    }

    fn set_state(&mut self, state: StrategyState) {
        if self.state != state {
            info!("Strategy state {} -> {}", self.state, state);
            self.state = state;
        }
    }

    async fn await_feed(&mut self) -> MakerResult<Tick> {
        match self.gateway.is_feed_ready().await {
            Ok(true) => {
                info!("Feed ready for {}", self.config.symbol);
                self.set_state(StrategyState::Quoting);
                Ok(self.tick(Duration::ZERO))
            }
            Ok(false) => Ok(self.tick(self.config.poll.feed())),
            Err(e) => {
                debug!("Feed readiness check failed, retrying: {}", e);
                Ok(self.tick(self.config.poll.feed()))
            }
        }
    }

    /// Flatten any position held before startup.
    ///
    /// Returns `false` while the feed has not reported a position yet; the
    /// check is repeated on the next tick.
    async fn clear_inherited_position(&mut self) -> MakerResult<bool> {
        let reading = self.gateway.get_position().await?;
        if reading == PositionReading::Pending {
            debug!("No position data yet, holding first ladder");
            return Ok(false);
        }
        if reading.size() > 0.0 {
            warn!(
                "Flattening pre-existing position of {} before first ladder",
                reading.size()
            );
            self.gateway.close_position().await?;
        }
        self.inherited_position_cleared = true;
        Ok(true)
    }

    async fn quote(&mut self) -> MakerResult<Tick> {
        if !self.inherited_position_cleared && !self.clear_inherited_position().await? {
            return Ok(self.tick(self.config.poll.feed()));
        }

        let reference_price = self.gateway.get_last_price().await?;
        if !reference_price.is_finite() || reference_price <= 0.0 {
            debug!("No usable last price yet ({}), waiting", reference_price);
            return Ok(self.tick(self.config.poll.feed()));
        }

        let ladder = compute_ladder(reference_price, self.config.spread, self.config.order_count)?;
        let balance = self.gateway.get_balance(self.config.balance_coin()).await?;
        let quantity = compute_quantity(
            balance,
            reference_price,
            self.config.margin_fraction,
            self.config.order_count,
        );

        if quantity <= 0.0 {
            warn!(
                "Order quantity is zero (balance {} {}), skipping this cycle",
                balance,
                self.config.balance_coin()
            );
            return Ok(self.tick(self.config.poll.cycle()));
        }

        self.gateway.set_cross_margin().await?;

        let acks = match self
            .gateway
            .place_entry_orders(reference_price, &ladder, quantity)
            .await
        {
            Ok(acks) => acks,
            Err(e) => {
                warn!("Entry ladder rejected, cancelling any partial ladder: {}", e);
                if let Err(cancel_err) = self.gateway.cancel_all_orders().await {
                    warn!("Failed to cancel partial ladder: {}", cancel_err);
                }
                return Err(e);
            }
        };

        let step = step_interval(self.config.spread, self.config.order_count);
        self.session = Some(SessionContext {
            reference_price,
            step_interval: step,
            per_order_quantity: quantity,
            ladder_set_time: self.clock.now(),
        });

        info!(
            "Placed {} entry orders around {} (step {}, qty {})",
            acks.len(),
            reference_price,
            step,
            quantity
        );

        self.set_state(StrategyState::Monitoring);
        Ok(self.tick(self.config.poll.cycle()))
    }

    async fn monitor(&mut self) -> MakerResult<Tick> {
        let Some(session) = self.session else {
            warn!("Monitoring without a session, re-quoting");
            self.set_state(StrategyState::Quoting);
            return Ok(self.tick(self.config.poll.cycle()));
        };

        let reading = self.gateway.get_position().await?;

        if let Some(position) = reading.open().copied() {
            let last_price = self.gateway.get_last_price().await?;
            if has_recrossed(position.side, last_price, session.reference_price) {
                info!(
                    "Price {} recrossed median {} with {:?} position of {}",
                    last_price, session.reference_price, position.side, position.size
                );
                self.start_closing(&position, &session).await?;
            }
            return Ok(self.tick(self.config.poll.position()));
        }

        let elapsed = self.clock.now() - session.ladder_set_time;
        if reset_due(
            elapsed,
            self.config.reset_window(),
            self.state,
            self.session.is_some(),
            reading.size(),
        ) {
            info!(
                "No fills after {}s, cancelling ladder and re-quoting",
                elapsed.num_seconds()
            );
            self.gateway.cancel_all_orders().await?;
            self.session = None;
            self.resets += 1;
            self.set_state(StrategyState::Quoting);
        }

        Ok(self.tick(self.config.poll.cycle()))
    }

    async fn start_closing(&mut self, position: &Position, session: &SessionContext) -> MakerResult<()> {
        self.gateway.cancel_all_orders().await?;
        self.gateway.set_stop_loss(position.entry_price).await?;

        match self.submit_closing(session).await? {
            Some(closing) => info!(
                "Placed {} {} closing orders of {} ({} total)",
                closing.ladder.len(),
                closing.side,
                closing.quantity,
                closing.total_quantity()
            ),
            None => info!("Position already flat when closing ladder was computed"),
        }

        self.set_state(StrategyState::Closing);
        Ok(())
    }

    /// Re-read the position and place the reduce-only unwind ladder.
    ///
    /// Without position data the owed quantity is unknown, so the cycle is
    /// aborted after a best-effort flatten.
    async fn submit_closing(&mut self, session: &SessionContext) -> MakerResult<Option<ClosingLadder>> {
        let reading = match self.gateway.get_position().await {
            Ok(reading) => reading,
            Err(e) => return Err(self.abort_cycle(format!("position query failed: {}", e)).await),
        };

        let position = match reading {
            PositionReading::Pending => {
                return Err(self
                    .abort_cycle("feed returned no position data".to_string())
                    .await)
            }
            PositionReading::Empty => return Ok(None),
            PositionReading::Live(position) if position.size == 0.0 => return Ok(None),
            PositionReading::Live(position) => position,
        };

        let Some(position_side) = position.side.as_order_side() else {
            return Err(self
                .abort_cycle(format!("position of {} has no side", position.size))
                .await);
        };

        let closing = compute_closing_ladder(
            session.reference_price,
            session.step_interval,
            position.size,
            session.per_order_quantity,
            position_side,
        );

        if closing.ladder.is_empty() {
            warn!(
                "Position of {} is under half an order; leaving it to the stop-loss",
                position.size
            );
            return Ok(Some(closing));
        }

        self.gateway
            .place_closing_orders(closing.side, &closing.ladder, closing.quantity)
            .await?;

        Ok(Some(closing))
    }

    async fn abort_cycle(&mut self, reason: String) -> MakerError {
        error!("Aborting cycle, cannot determine open risk: {}", reason);
        self.flatten().await;
        self.session = None;
        self.set_state(StrategyState::Quoting);
        MakerError::PositionDataUnavailable(reason)
    }

    async fn watch_close(&mut self) -> MakerResult<Tick> {
        let reading = self.gateway.get_position().await?;

        if !reading.is_flat() {
            return Ok(self.tick(self.config.poll.position()));
        }

        // Clear reduce-only leftovers from rounding before the next ladder
        self.gateway.cancel_all_orders().await?;
        self.session = None;
        self.cycles_completed += 1;
        info!("Position closed, cycle {} complete", self.cycles_completed);
        self.set_state(StrategyState::Quoting);

        Ok(self.tick(self.config.poll.cycle()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maker::clock::ManualClock;
    use crate::maker::gateway::mock::{GatewayCall, MockGateway};
    use crate::maker::types::OrderSide;

    type TestMaker = MarketMaker<MockGateway, ManualClock>;

    fn setup() -> (TestMaker, Arc<MockGateway>, Arc<ManualClock>) {
        // 5 orders over a 10 wide spread, reset after 60s
        let config = MakerConfig::new("BTCUSD", 5, 10.0, 0.1, 60);
        let gateway = Arc::new(MockGateway::new(100.0, 1000.0));
        let clock = Arc::new(ManualClock::default());
        let maker = MarketMaker::new(config, gateway.clone(), clock.clone()).unwrap();
        (maker, gateway, clock)
    }

    async fn monitoring() -> (TestMaker, Arc<MockGateway>, Arc<ManualClock>) {
        let (mut maker, gateway, clock) = setup();
        maker.step().await.unwrap();
        maker.step().await.unwrap();
        assert_eq!(maker.state(), StrategyState::Monitoring);
        gateway.clear_calls().await;
        (maker, gateway, clock)
    }

    fn live(side: PositionSide, size: f64, entry_price: f64) -> PositionReading {
        PositionReading::Live(Position::new(side, size, entry_price))
    }

    #[test]
    fn test_reset_due_requires_every_condition() {
        let window = chrono::Duration::seconds(60);
        let late = chrono::Duration::seconds(61);

        assert!(reset_due(late, window, StrategyState::Monitoring, true, 0.0));

        assert!(!reset_due(window, window, StrategyState::Monitoring, true, 0.0));
        assert!(!reset_due(late, window, StrategyState::Closing, true, 0.0));
        assert!(!reset_due(late, window, StrategyState::Monitoring, false, 0.0));
        assert!(!reset_due(late, window, StrategyState::Monitoring, true, 1.0));
    }

    #[test]
    fn test_has_recrossed() {
        assert!(has_recrossed(PositionSide::Buy, 100.5, 100.0));
        assert!(!has_recrossed(PositionSide::Buy, 100.0, 100.0));
        assert!(has_recrossed(PositionSide::Sell, 99.5, 100.0));
        assert!(!has_recrossed(PositionSide::Sell, 100.0, 100.0));
        assert!(!has_recrossed(PositionSide::None, 50.0, 100.0));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = MakerConfig::new("BTCUSDT", 5, 10.0, 0.1, 60);
        let result = MarketMaker::new(
            config,
            Arc::new(MockGateway::new(100.0, 1000.0)),
            Arc::new(ManualClock::default()),
        );
        assert!(matches!(result, Err(MakerError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_waits_for_feed() {
        let (mut maker, gateway, _) = setup();
        gateway.set_feed_ready(false).await;

        let tick = maker.step().await.unwrap();
        assert_eq!(tick.state, StrategyState::AwaitingFeed);
        assert_eq!(tick.next_poll, Duration::from_secs(1));

        gateway.set_feed_ready(true).await;
        let tick = maker.step().await.unwrap();
        assert_eq!(tick.state, StrategyState::Quoting);
        assert_eq!(tick.next_poll, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_places_entry_ladder() {
        let (mut maker, gateway, clock) = setup();
        maker.step().await.unwrap();

        let tick = maker.step().await.unwrap();
        assert_eq!(tick.state, StrategyState::Monitoring);
        assert_eq!(tick.next_poll, Duration::from_secs(3));

        let resting = gateway.resting().await;
        let prices: Vec<f64> = resting.iter().map(|q| q.price()).collect();
        let sides: Vec<OrderSide> = resting.iter().map(|q| q.side()).collect();
        assert_eq!(prices, vec![105.0, 102.5, 100.0, 97.5, 95.0]);
        assert_eq!(
            sides,
            vec![
                OrderSide::Sell,
                OrderSide::Sell,
                OrderSide::Buy,
                OrderSide::Buy,
                OrderSide::Buy
            ]
        );
        assert!(resting.iter().all(|q| q.quantity() == 2000.0 && q.post_only() && !q.reduce_only()));

        let session = maker.session().copied().unwrap();
        assert_eq!(session.reference_price, 100.0);
        assert_eq!(session.step_interval, 2.5);
        assert_eq!(session.per_order_quantity, 2000.0);
        assert_eq!(session.ladder_set_time, clock.now());

        let calls = gateway.calls().await;
        assert!(calls.contains(&GatewayCall::GetBalance("BTC".to_string())));
        let cross = calls.iter().position(|c| *c == GatewayCall::SetCrossMargin).unwrap();
        let place = calls
            .iter()
            .position(|c| *c == GatewayCall::PlaceEntry { count: 5 })
            .unwrap();
        assert!(cross < place);
    }

    #[tokio::test]
    async fn test_flattens_inherited_position_once() {
        let (mut maker, gateway, clock) = setup();
        gateway.set_position(live(PositionSide::Sell, 3.0, 98.0)).await;

        maker.step().await.unwrap();
        maker.step().await.unwrap();

        let calls = gateway.calls().await;
        let close = calls.iter().position(|c| *c == GatewayCall::ClosePosition).unwrap();
        let place = calls
            .iter()
            .position(|c| matches!(c, GatewayCall::PlaceEntry { .. }))
            .unwrap();
        assert!(close < place);

        // Reset path re-quotes without touching the position
        clock.advance(chrono::Duration::seconds(61));
        maker.step().await.unwrap();
        assert_eq!(maker.state(), StrategyState::Quoting);
        gateway.clear_calls().await;

        maker.step().await.unwrap();
        let calls = gateway.calls().await;
        assert!(!calls.contains(&GatewayCall::GetPosition));
        assert!(!calls.contains(&GatewayCall::ClosePosition));
    }

    #[tokio::test]
    async fn test_zero_quantity_skips_cycle() {
        let (mut maker, gateway, _) = setup();
        *gateway.balance.lock().await = 0.0;

        maker.step().await.unwrap();
        let tick = maker.step().await.unwrap();

        assert_eq!(tick.state, StrategyState::Quoting);
        assert!(maker.session().is_none());
        assert!(gateway.resting().await.is_empty());
        assert!(!gateway
            .calls()
            .await
            .iter()
            .any(|c| matches!(c, GatewayCall::PlaceEntry { .. })));
    }

    #[tokio::test]
    async fn test_entry_rejection_cancels_and_propagates() {
        let (mut maker, gateway, _) = setup();
        gateway.set_should_reject(true).await;

        maker.step().await.unwrap();
        let result = maker.step().await;

        assert!(matches!(result, Err(MakerError::Submission(_))));
        assert_eq!(maker.state(), StrategyState::Quoting);
        assert!(maker.session().is_none());
        assert_eq!(gateway.calls().await.last(), Some(&GatewayCall::CancelAll));
    }

    #[tokio::test]
    async fn test_resets_unfilled_ladder_after_window() {
        let (mut maker, gateway, clock) = monitoring().await;

        clock.advance(chrono::Duration::seconds(30));
        let tick = maker.step().await.unwrap();
        assert_eq!(tick.state, StrategyState::Monitoring);
        assert!(!gateway.calls().await.contains(&GatewayCall::CancelAll));

        clock.advance(chrono::Duration::seconds(31));
        let tick = maker.step().await.unwrap();
        assert_eq!(tick.state, StrategyState::Quoting);
        assert!(gateway.calls().await.contains(&GatewayCall::CancelAll));
        assert!(!gateway.calls().await.contains(&GatewayCall::ClosePosition));
        assert!(maker.session().is_none());
        assert_eq!(maker.summary().resets, 1);
    }

    #[tokio::test]
    async fn test_pending_position_counts_as_zero_for_reset() {
        let (mut maker, gateway, clock) = monitoring().await;
        gateway.set_position(PositionReading::Pending).await;

        clock.advance(chrono::Duration::seconds(61));
        let tick = maker.step().await.unwrap();

        assert_eq!(tick.state, StrategyState::Quoting);
    }

    #[tokio::test]
    async fn test_open_position_blocks_reset() {
        let (mut maker, gateway, clock) = monitoring().await;
        gateway.set_position(live(PositionSide::Buy, 2000.0, 97.5)).await;
        gateway.set_last_price(99.0).await;

        clock.advance(chrono::Duration::seconds(120));
        let tick = maker.step().await.unwrap();

        assert_eq!(tick.state, StrategyState::Monitoring);
        assert_eq!(tick.next_poll, Duration::from_secs(1));
        assert!(!gateway.calls().await.contains(&GatewayCall::CancelAll));
    }

    #[tokio::test]
    async fn test_long_recross_places_closing_ladder() {
        let (mut maker, gateway, _) = monitoring().await;
        gateway.set_position(live(PositionSide::Buy, 6000.0, 97.5)).await;
        gateway.set_last_price(100.5).await;

        let tick = maker.step().await.unwrap();
        assert_eq!(tick.state, StrategyState::Closing);

        assert_eq!(
            gateway.calls().await,
            vec![
                GatewayCall::GetPosition,
                GatewayCall::GetLastPrice,
                GatewayCall::CancelAll,
                GatewayCall::SetStopLoss(97.5),
                GatewayCall::GetPosition,
                GatewayCall::PlaceClosing {
                    side: OrderSide::Sell,
                    count: 3
                },
            ]
        );

        let resting = gateway.resting().await;
        let prices: Vec<f64> = resting.iter().map(|q| q.price()).collect();
        assert_eq!(prices, vec![102.5, 105.0, 107.5]);
        assert!(resting.iter().all(|q| q.reduce_only() && q.quantity() == 2000.0));
    }

    #[tokio::test]
    async fn test_short_recross_places_mirrored_ladder() {
        let (mut maker, gateway, _) = monitoring().await;
        gateway.set_position(live(PositionSide::Sell, 5000.0, 102.5)).await;
        gateway.set_last_price(99.5).await;

        maker.step().await.unwrap();

        let resting = gateway.resting().await;
        let prices: Vec<f64> = resting.iter().map(|q| q.price()).collect();
        assert_eq!(prices, vec![97.5, 95.0, 92.5]);
        assert!(resting.iter().all(|q| q.side() == OrderSide::Buy));
        assert_eq!(*gateway.stop_loss.lock().await, Some(102.5));
    }

    #[tokio::test]
    async fn test_no_recross_keeps_monitoring() {
        let (mut maker, gateway, _) = monitoring().await;
        gateway.set_position(live(PositionSide::Buy, 2000.0, 97.5)).await;
        gateway.set_last_price(100.0).await;

        let tick = maker.step().await.unwrap();

        assert_eq!(tick.state, StrategyState::Monitoring);
        assert!(gateway.stop_loss.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_closing_completes_only_on_real_flat() {
        let (mut maker, gateway, _) = monitoring().await;
        gateway.set_position(live(PositionSide::Buy, 4000.0, 97.5)).await;
        gateway.set_last_price(101.0).await;
        maker.step().await.unwrap();
        assert_eq!(maker.state(), StrategyState::Closing);

        gateway.set_position(PositionReading::Pending).await;
        let tick = maker.step().await.unwrap();
        assert_eq!(tick.state, StrategyState::Closing);
        assert_eq!(tick.next_poll, Duration::from_secs(1));

        gateway.set_position(PositionReading::Empty).await;
        let tick = maker.step().await.unwrap();
        assert_eq!(tick.state, StrategyState::Quoting);
        assert!(maker.session().is_none());
        assert_eq!(maker.summary().cycles_completed, 1);
        assert!(gateway.resting().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_position_data_is_fatal() {
        let (mut maker, gateway, _) = monitoring().await;
        gateway
            .script_positions(vec![
                live(PositionSide::Buy, 6000.0, 97.5),
                PositionReading::Pending,
            ])
            .await;
        gateway.set_last_price(100.5).await;

        let result = maker.step().await;

        assert!(matches!(result, Err(MakerError::PositionDataUnavailable(_))));
        let calls = gateway.calls().await;
        assert_eq!(&calls[calls.len() - 2..], &[GatewayCall::CancelAll, GatewayCall::ClosePosition]);
        assert!(maker.session().is_none());
    }

    #[tokio::test]
    async fn test_closing_rejection_retries_next_tick() {
        let (mut maker, gateway, _) = monitoring().await;
        gateway.set_position(live(PositionSide::Buy, 4000.0, 97.5)).await;
        gateway.set_last_price(101.0).await;
        gateway.set_should_reject(true).await;

        let result = maker.step().await;
        assert!(matches!(result, Err(MakerError::Submission(_))));
        assert_eq!(maker.state(), StrategyState::Monitoring);
        assert_eq!(*gateway.stop_loss.lock().await, Some(97.5));

        gateway.set_should_reject(false).await;
        let tick = maker.step().await.unwrap();
        assert_eq!(tick.state, StrategyState::Closing);
        assert_eq!(gateway.resting().await.len(), 2);
    }

    #[tokio::test]
    async fn test_position_read_failure_while_monitoring_is_recoverable() {
        let (mut maker, gateway, _) = monitoring().await;
        gateway.set_fail_position_reads(true).await;

        let result = maker.step().await;
        assert!(matches!(result, Err(MakerError::Exchange(_))));
        assert!(!result.unwrap_err().is_fatal());
        assert_eq!(maker.state(), StrategyState::Monitoring);
        assert!(maker.session().is_some());

        gateway.set_fail_position_reads(false).await;
        let tick = maker.step().await.unwrap();
        assert_eq!(tick.state, StrategyState::Monitoring);
    }

    #[tokio::test]
    async fn test_late_inherited_position_is_flattened_before_first_ladder() {
        let (mut maker, gateway, _) = setup();
        gateway
            .script_positions(vec![
                PositionReading::Pending,
                live(PositionSide::Sell, 3.0, 98.0),
            ])
            .await;

        maker.step().await.unwrap();

        // No position data yet: hold the first ladder
        let tick = maker.step().await.unwrap();
        assert_eq!(tick.state, StrategyState::Quoting);
        assert_eq!(tick.next_poll, Duration::from_secs(1));
        let calls = gateway.calls().await;
        assert!(!calls.contains(&GatewayCall::ClosePosition));
        assert!(!calls.iter().any(|c| matches!(c, GatewayCall::PlaceEntry { .. })));

        let tick = maker.step().await.unwrap();
        assert_eq!(tick.state, StrategyState::Monitoring);

        let calls = gateway.calls().await;
        let close = calls.iter().position(|c| *c == GatewayCall::ClosePosition).unwrap();
        let place = calls
            .iter()
            .position(|c| matches!(c, GatewayCall::PlaceEntry { .. }))
            .unwrap();
        assert!(close < place);
    }

    #[tokio::test]
    async fn test_failed_feed_check_counts_as_not_ready() {
        let (mut maker, gateway, _) = setup();
        gateway.set_fail_feed_checks(true).await;

        let tick = maker.step().await.unwrap();
        assert_eq!(tick.state, StrategyState::AwaitingFeed);
        assert_eq!(tick.next_poll, Duration::from_secs(1));

        gateway.set_fail_feed_checks(false).await;
        let tick = maker.step().await.unwrap();
        assert_eq!(tick.state, StrategyState::Quoting);
    }

    #[tokio::test]
    async fn test_unusable_price_waits_for_feed() {
        let (mut maker, gateway, _) = setup();
        maker.step().await.unwrap();

        for price in [0.0, f64::NAN] {
            gateway.set_last_price(price).await;
            let tick = maker.step().await.unwrap();
            assert_eq!(tick.state, StrategyState::Quoting);
            assert_eq!(tick.next_poll, Duration::from_secs(1));
        }
        assert!(!gateway
            .calls()
            .await
            .iter()
            .any(|c| matches!(c, GatewayCall::PlaceEntry { .. })));

        gateway.set_last_price(100.0).await;
        let tick = maker.step().await.unwrap();
        assert_eq!(tick.state, StrategyState::Monitoring);
    }

    #[tokio::test]
    async fn test_position_under_half_an_order_places_no_closing_orders() {
        let (mut maker, gateway, _) = monitoring().await;
        // 900 / 2000 = 0.45 orders rounds to zero
        gateway.set_position(live(PositionSide::Buy, 900.0, 97.5)).await;
        gateway.set_last_price(101.0).await;

        let tick = maker.step().await.unwrap();

        assert_eq!(tick.state, StrategyState::Closing);
        assert!(gateway.resting().await.is_empty());
        assert_eq!(*gateway.stop_loss.lock().await, Some(97.5));
        assert!(!gateway
            .calls()
            .await
            .iter()
            .any(|c| matches!(c, GatewayCall::PlaceClosing { .. })));
    }
}
