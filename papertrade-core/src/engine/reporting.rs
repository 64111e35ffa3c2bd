//! Cancellation and read-only order statistics.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::domain::{Order, OrderId, OrderSide, OrderStatus, OrderType, Portfolio};
use crate::error::OrderError;

/// Cancel a pending order.
///
/// Nothing was reserved at placement, so nothing is released. Fails with
/// `OrderNotFound` for unknown ids and `OrderNotPending` once the order has
/// already reached a terminal state.
pub fn cancel_order(
    portfolio: &mut Portfolio,
    id: OrderId,
    now: DateTime<Utc>,
) -> Result<Order, OrderError> {
    let order = portfolio
        .orders
        .close(id, OrderStatus::Canceled, now, None, "canceled")?;
    info!(order_id = %id, symbol = %order.symbol, "order canceled");
    Ok(order)
}

/// Aggregates over the fill history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderStatistics {
    /// Number of fills.
    pub total_orders: usize,
    pub buy_orders: usize,
    pub sell_orders: usize,
    pub by_type: BTreeMap<OrderType, usize>,
    /// Sum of fill notionals.
    pub total_volume: Decimal,
    /// Mean fill notional; zero with no fills.
    pub average_order_size: Decimal,
    /// Mean fill quantity; zero with no fills.
    pub average_quantity: Decimal,
    pub realized_pnl: Decimal,
}

/// Summarize a portfolio's executed orders. Pure.
pub fn order_statistics(portfolio: &Portfolio) -> OrderStatistics {
    let history = portfolio.history();
    let mut stats = OrderStatistics {
        total_orders: history.len(),
        realized_pnl: portfolio.realized_pnl(),
        ..OrderStatistics::default()
    };

    let mut total_quantity = Decimal::ZERO;
    for fill in history {
        match fill.side {
            OrderSide::Buy => stats.buy_orders += 1,
            OrderSide::Sell => stats.sell_orders += 1,
        }
        *stats.by_type.entry(fill.order_type).or_insert(0) += 1;
        stats.total_volume = stats.total_volume.saturating_add(fill.total);
        total_quantity = total_quantity.saturating_add(fill.quantity);
    }

    if !history.is_empty() {
        let n = Decimal::from(history.len());
        stats.average_order_size = stats.total_volume / n;
        stats.average_quantity = total_quantity / n;
    }
    stats
}
