//! Execution: applies one fill to the portfolio.
//!
//! Handles cash accounting, weighted-average cost basis, position closure,
//! realized P&L and the fill history. A fill is all-or-nothing at the chosen
//! price; once applied there is no rollback.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::{Fill, Order, OrderId, OrderSide, OrderStatus, Portfolio};
use crate::error::OrderError;

/// What happened when a triggered order reached the execution step.
#[derive(Debug, Clone, PartialEq)]
pub enum FillOutcome {
    Filled { order: Order, fill: Fill },
    /// The fill-time guard refused the fill; the order is now `Rejected`.
    Rejected { order: Order, reason: OrderError },
}

/// Check that the portfolio can afford a fill of `quantity` at `price`.
///
/// Buys need `price × quantity` in cash; sells need the shares on hand. A
/// buy whose cost does not fit in a `Decimal` is refused as
/// [`OrderError::AmountOverflow`].
pub fn check_affordability(
    portfolio: &Portfolio,
    side: OrderSide,
    symbol: &str,
    quantity: Decimal,
    price: Decimal,
) -> Result<(), OrderError> {
    match side {
        OrderSide::Buy => {
            let needed = price
                .checked_mul(quantity)
                .ok_or_else(|| OrderError::AmountOverflow {
                    symbol: symbol.to_string(),
                    quantity,
                    price,
                })?;
            if needed > portfolio.cash {
                return Err(OrderError::InsufficientFunds {
                    needed,
                    available: portfolio.cash,
                });
            }
        }
        OrderSide::Sell => {
            let held = portfolio.position(symbol);
            if quantity > held {
                return Err(OrderError::InsufficientShares {
                    symbol: symbol.to_string(),
                    requested: quantity,
                    held,
                });
            }
        }
    }
    Ok(())
}

/// Portfolio state after one fill, computed before anything is written.
struct Settlement {
    total: Decimal,
    cash: Decimal,
    position: Decimal,
    cost_basis: Option<Decimal>,
    realized_pnl: Option<Decimal>,
    realized_total: Decimal,
}

/// Apply a fill for `order` at `price` to cash, positions, cost basis and
/// history. Does not touch the order's status.
///
/// - Buy: cash decreases by `price × qty`; cost basis becomes the weighted
///   average of the old holding and this fill.
/// - Sell: cash increases by `price × qty`; realized P&L is taken against cost
///   basis; the position and its cost basis are removed together once the
///   quantity reaches zero or below.
///
/// All amounts are computed first. If any of them overflows, the portfolio is
/// left untouched and [`OrderError::AmountOverflow`] is returned.
pub(crate) fn apply_fill(
    portfolio: &mut Portfolio,
    order: &Order,
    price: Decimal,
    at: DateTime<Utc>,
) -> Result<Fill, OrderError> {
    let overflow = || OrderError::AmountOverflow {
        symbol: order.symbol.clone(),
        quantity: order.quantity,
        price,
    };
    let settlement = settle(portfolio, order, price).ok_or_else(overflow)?;

    portfolio.cash = settlement.cash;
    portfolio.realized_pnl = settlement.realized_total;
    if settlement.position <= Decimal::ZERO {
        portfolio.positions.remove(&order.symbol);
        portfolio.cost_basis.remove(&order.symbol);
    } else {
        portfolio
            .positions
            .insert(order.symbol.clone(), settlement.position);
        if let Some(basis) = settlement.cost_basis {
            portfolio.cost_basis.insert(order.symbol.clone(), basis);
        }
    }

    let fill = Fill {
        order_id: order.id,
        side: order.side,
        order_type: order.order_type(),
        symbol: order.symbol.clone(),
        quantity: order.quantity,
        price,
        total: settlement.total,
        timestamp: at,
        realized_pnl: settlement.realized_pnl,
    };
    portfolio.history.push(fill.clone());
    Ok(fill)
}

/// `None` when any amount leaves the `Decimal` range.
fn settle(portfolio: &Portfolio, order: &Order, price: Decimal) -> Option<Settlement> {
    let total = order.notional(price)?;
    let held = portfolio.position(&order.symbol);
    let basis = portfolio.cost_basis(&order.symbol);

    match order.side {
        OrderSide::Buy => {
            let position = held.checked_add(order.quantity)?;
            let old_cost = basis.unwrap_or(Decimal::ZERO).checked_mul(held)?;
            let cost_basis = old_cost.checked_add(total)?.checked_div(position)?;
            Some(Settlement {
                total,
                cash: portfolio.cash.checked_sub(total)?,
                position,
                cost_basis: Some(cost_basis),
                realized_pnl: None,
                realized_total: portfolio.realized_pnl,
            })
        }
        OrderSide::Sell => {
            // P&L only on the shares actually held.
            let realized_pnl = match basis {
                Some(basis) => {
                    let gain = price.checked_sub(basis)?;
                    Some(gain.checked_mul(order.quantity.min(held))?)
                }
                None => None,
            };
            let realized_total = match realized_pnl {
                Some(pnl) => portfolio.realized_pnl.checked_add(pnl)?,
                None => portfolio.realized_pnl,
            };
            Some(Settlement {
                total,
                cash: portfolio.cash.checked_add(total)?,
                position: held.checked_sub(order.quantity)?,
                cost_basis: basis,
                realized_pnl,
                realized_total,
            })
        }
    }
}

/// Fill a pending order from the book at `price`.
///
/// With `enforce_guard`, an unaffordable fill moves the order to `Rejected`
/// instead and leaves cash and positions untouched. A fill whose amounts
/// overflow is rejected the same way whether or not the guard is on. Errors only when `id` is
/// unknown or no longer pending.
pub fn fill_order(
    portfolio: &mut Portfolio,
    id: OrderId,
    price: Decimal,
    at: DateTime<Utc>,
    enforce_guard: bool,
) -> Result<FillOutcome, OrderError> {
    let order = portfolio
        .orders
        .get(id)
        .cloned()
        .ok_or(OrderError::OrderNotFound(id))?;
    if order.status != OrderStatus::Pending {
        return Err(OrderError::OrderNotPending {
            id,
            status: order.status,
        });
    }

    if enforce_guard {
        if let Err(reason) =
            check_affordability(portfolio, order.side, &order.symbol, order.quantity, price)
        {
            warn!(
                order_id = %id,
                symbol = %order.symbol,
                %price,
                error = %reason,
                "fill rejected"
            );
            let order = portfolio.orders.close(
                id,
                OrderStatus::Rejected,
                at,
                None,
                &format!("rejected: {reason}"),
            )?;
            return Ok(FillOutcome::Rejected { order, reason });
        }
    }

    let fill = match apply_fill(portfolio, &order, price, at) {
        Ok(fill) => fill,
        Err(reason) => {
            warn!(
                order_id = %id,
                symbol = %order.symbol,
                %price,
                error = %reason,
                "fill rejected"
            );
            let order = portfolio.orders.close(
                id,
                OrderStatus::Rejected,
                at,
                None,
                &format!("rejected: {reason}"),
            )?;
            return Ok(FillOutcome::Rejected { order, reason });
        }
    };
    let order = portfolio
        .orders
        .close(id, OrderStatus::Filled, at, Some(price), "filled")?;
    info!(
        order_id = %id,
        symbol = %order.symbol,
        side = %order.side,
        order_type = %order.order_type(),
        quantity = %order.quantity,
        %price,
        "order filled"
    );
    Ok(FillOutcome::Filled { order, fill })
}
