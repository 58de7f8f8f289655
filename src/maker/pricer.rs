//! Entry ladder pricing

use super::errors::{MakerError, MakerResult};
use super::types::{Ladder, OrderSide};

/// Compute the entry ladder: `order_count` prices from `reference + spread/2`
/// down to `reference - spread/2` in constant steps.
///
/// The last price is pinned to the lower bound so float drift never moves the
/// bottom of the ladder.
pub fn compute_ladder(reference_price: f64, spread: f64, order_count: u32) -> MakerResult<Ladder> {
    if order_count < 2 {
        return Err(MakerError::InvalidConfig(format!(
            "ladder needs at least 2 orders, got {}",
            order_count
        )));
    }
    if !spread.is_finite() || spread <= 0.0 {
        return Err(MakerError::InvalidConfig(format!(
            "spread must be positive, got {}",
            spread
        )));
    }

    let max_price = reference_price + spread / 2.0;
    let min_price = reference_price - spread / 2.0;
    let step = step_interval(spread, order_count);

    let mut prices: Vec<f64> = (0..order_count - 1)
        .map(|i| max_price - step * i as f64)
        .collect();
    prices.push(min_price);

    Ok(Ladder::new(prices))
}

/// Distance between adjacent ladder prices
pub fn step_interval(spread: f64, order_count: u32) -> f64 {
    spread / (order_count.saturating_sub(1)).max(1) as f64
}

/// Side of an entry order: above the reference sells, at or below buys.
///
/// The reference price itself is a buy, so the ladder is not split evenly.
pub fn side_for_price(price: f64, reference_price: f64) -> OrderSide {
    if price > reference_price {
        OrderSide::Sell
    } else {
        OrderSide::Buy
    }
}
