//! Trigger checking: does a quote fire a given pending order?
//!
//! Each order kind answers two questions against a quote: whether it fires
//! (`is_triggered`) and at what price it would fill (`execution_price`).
//! `check_trigger` first applies the per-tick state updates (trailing
//! watermarks, the one-way stop-limit flip) and then asks those questions.
//!
//! Price selection:
//! - Market: the quoted price.
//! - Limit, and Stop-Limit once triggered: the current price, which may
//!   improve on the limit.
//! - Stop-Loss, Trailing-Stop, and an untriggered Stop-Limit: ask for buys,
//!   bid for sells, not the stop price.

use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{Order, OrderKind, OrderSide, Quote};

/// Result of checking one order against one quote.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerResult {
    /// Order does not fire on this quote.
    NoTrigger,
    /// Order fires and should fill at `fill_price`.
    Fill { fill_price: Decimal },
    /// Stop-Limit crossed its stop on this quote; it now rests as a limit.
    StopTriggeredLimitPending,
}

impl Order {
    /// Whether the order's current parameters fire on `quote`.
    ///
    /// Pure: does not move watermarks or flip the stop-limit flag.
    pub fn is_triggered(&self, quote: &Quote) -> bool {
        match &self.kind {
            OrderKind::Market => true,
            OrderKind::Limit { limit_price } => limit_reached(self.side, *limit_price, quote),
            OrderKind::StopLoss { stop_price } | OrderKind::TrailingStop { stop_price, .. } => {
                stop_crossed(self.side, *stop_price, quote)
            }
            OrderKind::StopLimit {
                stop_price,
                limit_price,
                triggered,
            } => {
                if *triggered {
                    limit_reached(self.side, *limit_price, quote)
                } else {
                    stop_crossed(self.side, *stop_price, quote)
                }
            }
        }
    }

    /// Price this order fills at if it fires on `quote`.
    pub fn execution_price(&self, quote: &Quote) -> Decimal {
        match &self.kind {
            OrderKind::Market | OrderKind::Limit { .. } => quote.price,
            OrderKind::StopLimit { triggered: true, .. } => quote.price,
            OrderKind::StopLoss { .. }
            | OrderKind::StopLimit { .. }
            | OrderKind::TrailingStop { .. } => touch_price(self.side, quote),
        }
    }
}

/// Check whether a pending order fires on `quote`, updating its trigger state.
///
/// Trailing stops ratchet their watermark and stop price first, then run the
/// stop test. An untriggered Stop-Limit that crosses its stop flips to
/// triggered; it is then evaluated as a limit in this same call only when
/// `stop_limit_fill_on_trigger` is set.
pub fn check_trigger(
    order: &mut Order,
    quote: &Quote,
    stop_limit_fill_on_trigger: bool,
) -> TriggerResult {
    if ratchet_trailing_stop(order, quote.price) {
        debug!(
            order_id = %order.id,
            symbol = %order.symbol,
            stop_price = ?order.kind.stop_price(),
            "trailing stop moved"
        );
    }

    let converting = matches!(order.kind, OrderKind::StopLimit { triggered: false, .. });
    if converting {
        if !order.is_triggered(quote) {
            return TriggerResult::NoTrigger;
        }
        // Filling on the crossing tick is still a stop fill.
        let stop_fill_price = order.execution_price(quote);
        if let OrderKind::StopLimit { triggered, .. } = &mut order.kind {
            *triggered = true;
        }
        if !stop_limit_fill_on_trigger || !order.is_triggered(quote) {
            return TriggerResult::StopTriggeredLimitPending;
        }
        return TriggerResult::Fill {
            fill_price: stop_fill_price,
        };
    }

    if order.is_triggered(quote) {
        TriggerResult::Fill {
            fill_price: order.execution_price(quote),
        }
    } else {
        TriggerResult::NoTrigger
    }
}

/// Move a trailing stop's watermark toward the favorable extreme.
///
/// Sell-side: a new high raises `high_water_mark` and the stop. Buy-side: a
/// new low lowers `low_water_mark` and the stop. The stop never moves
/// against the trader. Returns true if anything changed.
pub fn ratchet_trailing_stop(order: &mut Order, price: Decimal) -> bool {
    let side = order.side;
    let OrderKind::TrailingStop {
        trail,
        stop_price,
        high_water_mark,
        low_water_mark,
    } = &mut order.kind
    else {
        return false;
    };

    match side {
        OrderSide::Sell if price > *high_water_mark => {
            *high_water_mark = price;
            *stop_price = (*stop_price).max(trail.stop_from(price, side));
            true
        }
        OrderSide::Buy if price < *low_water_mark => {
            *low_water_mark = price;
            *stop_price = (*stop_price).min(trail.stop_from(price, side));
            true
        }
        _ => false,
    }
}

/// Buy limit: the ask is at or below the limit. Sell limit: the bid is at or
/// above it.
fn limit_reached(side: OrderSide, limit: Decimal, quote: &Quote) -> bool {
    match side {
        OrderSide::Buy => quote.ask <= limit,
        OrderSide::Sell => quote.bid >= limit,
    }
}

/// Sell stop: price falls to or through the stop. Buy stop: price rises to
/// or through it.
fn stop_crossed(side: OrderSide, stop: Decimal, quote: &Quote) -> bool {
    match side {
        OrderSide::Sell => quote.price <= stop,
        OrderSide::Buy => quote.price >= stop,
    }
}

fn touch_price(side: OrderSide, quote: &Quote) -> Decimal {
    match side {
        OrderSide::Buy => quote.ask,
        OrderSide::Sell => quote.bid,
    }
}
