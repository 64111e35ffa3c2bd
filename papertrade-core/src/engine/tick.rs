//! Tick processing: one evaluation pass over a portfolio's pending queue.
//!
//! For every pending order whose symbol is quoted in the snapshot, in queue
//! order:
//! 1. Expiry is checked first; an expired Day order never fills.
//! 2. The trigger check runs (watermark updates, stop-limit flip).
//! 3. A firing order is filled immediately, so later orders in the same pass
//!    see the updated cash and positions.
//!
//! The pass takes `&mut Portfolio`, so two ticks can never interleave on one
//! portfolio.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::execution::{fill_order, FillOutcome};
use super::time_in_force::is_expired;
use super::trigger::{check_trigger, TriggerResult};
use crate::config::SimulatorConfig;
use crate::domain::{Order, OrderId, OrderKind, OrderStatus, Portfolio, PriceSnapshot, Quote};

/// Everything that changed during one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub executed: Vec<Order>,
    pub expired: Vec<Order>,
    /// Orders that fired but failed the fill-time guard.
    pub rejected: Vec<Order>,
    /// Stop-Limit orders that crossed their stop this tick.
    pub triggered: Vec<OrderId>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.executed.is_empty()
            && self.expired.is_empty()
            && self.rejected.is_empty()
            && self.triggered.is_empty()
    }
}

/// Evaluate all pending orders against `snapshot`.
///
/// Orders for symbols without a quote, or with an invalid quote, are left
/// untouched. `snapshot.as_of` is the evaluation time for expiry and fills.
pub fn process_tick(
    portfolio: &mut Portfolio,
    snapshot: &PriceSnapshot,
    config: &SimulatorConfig,
) -> TickReport {
    let now = snapshot.as_of;
    let quotes = usable_quotes(snapshot);
    let mut report = TickReport::default();

    // Fills during the pass mutate the queue; walk a copy of it.
    let queue: Vec<OrderId> = portfolio.orders.pending_ids().to_vec();

    for id in queue {
        let Some(order) = portfolio.orders.get_mut(id) else {
            continue;
        };
        if order.status != OrderStatus::Pending {
            continue;
        }
        let Some(quote) = quotes.get(order.symbol.as_str()).copied() else {
            continue;
        };

        if is_expired(order, now) {
            match portfolio
                .orders
                .close(id, OrderStatus::Expired, now, None, "expired")
            {
                Ok(order) => {
                    info!(order_id = %id, symbol = %order.symbol, "order expired");
                    report.expired.push(order);
                }
                Err(err) => warn!(order_id = %id, error = %err, "could not expire order"),
            }
            continue;
        }

        let was_untriggered = matches!(order.kind, OrderKind::StopLimit { triggered: false, .. });
        let result = check_trigger(order, &quote, config.stop_limit_fill_on_trigger);

        if was_untriggered && order.kind.is_triggered_stop_limit() {
            debug!(
                order_id = %id,
                symbol = %order.symbol,
                price = %quote.price,
                "stop-limit triggered, now resting as limit"
            );
            portfolio.orders.note(id, now, "stop triggered");
            report.triggered.push(id);
        }

        let TriggerResult::Fill { fill_price } = result else {
            continue;
        };
        match fill_order(portfolio, id, fill_price, now, config.enforce_fill_guard) {
            Ok(FillOutcome::Filled { order, .. }) => report.executed.push(order),
            Ok(FillOutcome::Rejected { order, .. }) => report.rejected.push(order),
            Err(err) => warn!(order_id = %id, error = %err, "could not fill order"),
        }
    }

    if !report.is_empty() {
        debug!(
            as_of = %now,
            executed = report.executed.len(),
            expired = report.expired.len(),
            rejected = report.rejected.len(),
            triggered = report.triggered.len(),
            "tick processed"
        );
    }
    report
}

/// Quotes that pass validation, keyed by symbol. Invalid ones are logged
/// and skipped.
fn usable_quotes(snapshot: &PriceSnapshot) -> HashMap<&str, Quote> {
    snapshot
        .quotes
        .iter()
        .filter_map(|(symbol, quote)| match quote.validate() {
            Ok(()) => Some((symbol.as_str(), *quote)),
            Err(err) => {
                warn!(%symbol, error = %err, "ignoring invalid quote");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::factory::OrderFactory;
    use crate::domain::{OrderSide, TimeInForce};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap()
    }

    fn setup(cash: rust_decimal::Decimal) -> (Portfolio, OrderFactory, SimulatorConfig) {
        let config = SimulatorConfig::default();
        (Portfolio::new(cash), OrderFactory::from_config(&config), config)
    }

    #[test]
    fn empty_snapshot_changes_nothing() {
        let (mut portfolio, factory, config) = setup(dec!(10000));
        factory
            .create_limit_order(
                &mut portfolio,
                "AAPL",
                dec!(1),
                OrderSide::Buy,
                dec!(100),
                None,
                t0(),
            )
            .unwrap();

        let report = process_tick(&mut portfolio, &PriceSnapshot::new(t0()), &config);
        assert!(report.is_empty());
        assert_eq!(portfolio.order_book().pending_count(), 1);
    }

    #[test]
    fn other_symbols_are_ignored() {
        let (mut portfolio, factory, config) = setup(dec!(10000));
        factory
            .create_limit_order(
                &mut portfolio,
                "AAPL",
                dec!(1),
                OrderSide::Buy,
                dec!(100),
                None,
                t0(),
            )
            .unwrap();

        let snap = PriceSnapshot::new(t0()).with_quote("MSFT", Quote::flat(dec!(1)));
        assert!(process_tick(&mut portfolio, &snap, &config).is_empty());
    }

    #[test]
    fn invalid_quote_is_skipped() {
        let (mut portfolio, factory, config) = setup(dec!(10000));
        factory
            .create_limit_order(
                &mut portfolio,
                "AAPL",
                dec!(1),
                OrderSide::Buy,
                dec!(100),
                None,
                t0(),
            )
            .unwrap();

        let crossed = Quote::new(dec!(90), dec!(95), dec!(89));
        let snap = PriceSnapshot::new(t0()).with_quote("AAPL", crossed);
        assert!(process_tick(&mut portfolio, &snap, &config).is_empty());
        assert_eq!(portfolio.order_book().pending_count(), 1);
    }

    #[test]
    fn expiry_beats_trigger() {
        let (mut portfolio, factory, config) = setup(dec!(10000));
        let order = factory
            .create_limit_order(
                &mut portfolio,
                "AAPL",
                dec!(1),
                OrderSide::Buy,
                dec!(100),
                None,
                t0(),
            )
            .unwrap();
        let expires_at = order.expires_at.unwrap();

        // Trigger condition holds, but the order is past its close.
        let snap = PriceSnapshot::new(expires_at + Duration::minutes(1))
            .with_quote("AAPL", Quote::flat(dec!(90)));
        let report = process_tick(&mut portfolio, &snap, &config);

        assert!(report.executed.is_empty());
        assert_eq!(report.expired.len(), 1);
        assert_eq!(report.expired[0].status, OrderStatus::Expired);
        assert_eq!(portfolio.cash(), dec!(10000));
    }

    #[test]
    fn earlier_fill_starves_later_order() {
        let (mut portfolio, factory, config) = setup(dec!(1000));
        let first = factory
            .create_limit_order(
                &mut portfolio,
                "AAPL",
                dec!(8),
                OrderSide::Buy,
                dec!(100),
                Some(TimeInForce::Gtc),
                t0(),
            )
            .unwrap();
        let second = factory
            .create_limit_order(
                &mut portfolio,
                "AAPL",
                dec!(8),
                OrderSide::Buy,
                dec!(100),
                Some(TimeInForce::Gtc),
                t0(),
            )
            .unwrap();

        let snap = PriceSnapshot::new(t0()).with_quote("AAPL", Quote::flat(dec!(100)));
        let report = process_tick(&mut portfolio, &snap, &config);

        assert_eq!(report.executed.len(), 1);
        assert_eq!(report.executed[0].id, first.id);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].id, second.id);
        assert_eq!(portfolio.cash(), dec!(200));
        assert_eq!(portfolio.order_book().pending_count(), 0);
    }

    #[test]
    fn stop_limit_flip_is_reported_once() {
        let (mut portfolio, factory, config) = setup(dec!(10000));
        let order = factory
            .create_stop_limit_order(
                &mut portfolio,
                "AAPL",
                dec!(1),
                OrderSide::Buy,
                dec!(50),
                dec!(50.5),
                None,
                t0(),
            )
            .unwrap();

        let snap = PriceSnapshot::new(t0()).with_quote("AAPL", Quote::flat(dec!(51)));
        let report = process_tick(&mut portfolio, &snap, &config);
        assert_eq!(report.triggered, vec![order.id]);
        assert!(report.executed.is_empty());

        let report = process_tick(&mut portfolio, &snap, &config);
        assert!(report.triggered.is_empty());
        assert!(report.executed.is_empty());
        assert!(portfolio.order(order.id).unwrap().kind.is_triggered_stop_limit());
    }
}
