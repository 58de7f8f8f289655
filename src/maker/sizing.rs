//! Per-order quantity sizing

/// Quantity per ladder order.
///
/// `balance * reference_price * margin_fraction` is the notional committed to
/// the ladder, split evenly across `order_count` orders. Returns `0.0` when
/// there is nothing to commit; callers skip the cycle instead of quoting zero.
pub fn compute_quantity(
    balance: f64,
    reference_price: f64,
    margin_fraction: f64,
    order_count: u32,
) -> f64 {
    if balance <= 0.0 || margin_fraction <= 0.0 || order_count == 0 {
        return 0.0;
    }

    let notional = balance * reference_price * margin_fraction;
    let quantity = notional / order_count as f64;

    if quantity.is_finite() && quantity > 0.0 {
        quantity
    } else {
        0.0
    }
}
