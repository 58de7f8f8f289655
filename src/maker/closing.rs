//! Reduce-only unwind ladder

use log::warn;

use super::config::MAX_ORDER_COUNT;
use super::types::{ClosingLadder, Ladder, OrderSide};

/// Compute the closing ladder for a position acquired from the entry ladder.
///
/// Orders sit at `median + interval * k` for `k = 1..=filled_count`, walking
/// away from the median on the profitable side: above it for a long, below it
/// for a short (the interval is negated when `position_side` is `Sell`).
///
/// `filled_count` is `filled_size / per_order_quantity` rounded half away from
/// zero, so an exact half-fill (e.g. 2.5 orders) gets the extra order and the
/// total can exceed the position by up to one order; reduce-only caps the
/// excess at the exchange.
///
/// Every closing order uses `per_order_quantity`, the entry size. This assumes
/// entry fills arrive in whole-order units.
pub fn compute_closing_ladder(
    median: f64,
    step_interval: f64,
    filled_size: f64,
    per_order_quantity: f64,
    position_side: OrderSide,
) -> ClosingLadder {
    let side = position_side.opposite();
    let interval = match position_side {
        OrderSide::Buy => step_interval,
        OrderSide::Sell => -step_interval,
    };

    let filled_count = filled_order_count(filled_size, per_order_quantity);
    let prices = (1..=filled_count)
        .map(|k| median + interval * k as f64)
        .collect();

    ClosingLadder {
        side,
        ladder: Ladder::new(prices),
        quantity: per_order_quantity,
    }
}

/// Number of entry orders a position of `filled_size` corresponds to.
///
/// Capped at `MAX_ORDER_COUNT`: one entry ladder can not fill more orders than
/// that, and the stop-loss covers anything beyond.
pub fn filled_order_count(filled_size: f64, per_order_quantity: f64) -> usize {
    if per_order_quantity <= 0.0 || filled_size <= 0.0 {
        return 0;
    }
    let ratio = (filled_size / per_order_quantity).round();
    if !ratio.is_finite() {
        return 0;
    }

    let cap = MAX_ORDER_COUNT as usize;
    if ratio > cap as f64 {
        warn!(
            "Position of {} is {} orders of {}, capping closing ladder at {}",
            filled_size, ratio, per_order_quantity, cap
        );
        return cap;
    }
    ratio as usize
}
