//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Cash conservation: a market buy moves cash by exactly price × qty
//! 2. Cost basis: sequential buys average by quantity
//! 3. Full exit: selling the whole holding removes position and basis
//! 4. Trailing monotonicity: a sell-side trailing stop never moves down
//! 5. Stop-limit idempotence: the trigger flag never reverts
//! 6. Expiry precedence: an expired Day order never fills

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use papertrade_core::domain::{
    OrderKind, OrderSide, OrderStatus, Portfolio, PriceSnapshot, Quote, Trail,
};
use papertrade_core::engine::{check_trigger, OrderFactory};
use papertrade_core::SimulatorConfig;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Prices in cents, 1.00 to 999.99.
fn arb_price() -> impl Strategy<Value = Decimal> {
    (100i64..100_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_quantity() -> impl Strategy<Value = Decimal> {
    (1i64..500).prop_map(Decimal::from)
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap()
}

fn factory() -> OrderFactory {
    OrderFactory::from_config(&SimulatorConfig::default())
}

// ── 1-3. Execution accounting ────────────────────────────────────────

proptest! {
    #[test]
    fn market_buy_conserves_cash(price in arb_price(), qty in arb_quantity()) {
        let start = Decimal::from(1_000_000i64);
        let mut portfolio = Portfolio::new(start);
        factory()
            .create_market_order(&mut portfolio, "SPY", qty, OrderSide::Buy, price, t0())
            .unwrap();

        prop_assert_eq!(portfolio.cash(), start - price * qty);
        prop_assert_eq!(portfolio.position("SPY"), qty);
        prop_assert_eq!(portfolio.cost_basis("SPY"), Some(price));
    }

    #[test]
    fn cost_basis_is_weighted_average(
        buys in prop::collection::vec((arb_price(), arb_quantity()), 1..8),
    ) {
        let mut portfolio = Portfolio::new(Decimal::from(1_000_000_000i64));
        let f = factory();
        for (price, qty) in &buys {
            f.create_market_order(&mut portfolio, "SPY", *qty, OrderSide::Buy, *price, t0())
                .unwrap();
        }

        let total_qty: Decimal = buys.iter().map(|(_, q)| *q).sum();
        let total_cost: Decimal = buys.iter().map(|(p, q)| *p * *q).sum();
        let basis = portfolio.cost_basis("SPY").unwrap();
        prop_assert_eq!(portfolio.position("SPY"), total_qty);
        // Sequential averaging rounds at 28 digits; compare to well below a cent.
        prop_assert!((basis - total_cost / total_qty).abs() < Decimal::new(1, 12));
    }

    #[test]
    fn selling_everything_clears_position(
        buy_price in arb_price(),
        sell_price in arb_price(),
        qty in arb_quantity(),
    ) {
        let mut portfolio = Portfolio::new(Decimal::from(1_000_000i64));
        let f = factory();
        f.create_market_order(&mut portfolio, "SPY", qty, OrderSide::Buy, buy_price, t0())
            .unwrap();
        f.create_market_order(&mut portfolio, "SPY", qty, OrderSide::Sell, sell_price, t0())
            .unwrap();

        prop_assert!(!portfolio.has_position("SPY"));
        prop_assert_eq!(portfolio.cost_basis("SPY"), None);
        prop_assert_eq!(portfolio.realized_pnl(), (sell_price - buy_price) * qty);
    }
}

// ── 4. Trailing monotonicity ─────────────────────────────────────────

proptest! {
    #[test]
    fn trailing_sell_stop_never_decreases(
        start in arb_price(),
        percent in (1i64..50).prop_map(Decimal::from),
        path in prop::collection::vec(arb_price(), 1..40),
    ) {
        let mut portfolio = Portfolio::new(Decimal::ONE);
        let mut order = factory()
            .create_trailing_stop_order(
                &mut portfolio,
                "SPY",
                Decimal::ONE,
                OrderSide::Sell,
                Trail::Percent(percent),
                start,
                None,
                t0(),
            )
            .unwrap();

        let mut last_stop = order.kind.stop_price().unwrap();
        for price in path {
            check_trigger(&mut order, &Quote::flat(price), false);
            let stop = order.kind.stop_price().unwrap();
            prop_assert!(stop >= last_stop, "stop fell from {} to {}", last_stop, stop);
            last_stop = stop;
        }
    }
}

// ── 5. Stop-limit idempotence ────────────────────────────────────────

proptest! {
    #[test]
    fn stop_limit_flag_never_reverts(
        stop in arb_price(),
        path in prop::collection::vec(arb_price(), 1..40),
    ) {
        let mut portfolio = Portfolio::new(Decimal::ONE);
        let mut order = factory()
            .create_stop_limit_order(
                &mut portfolio,
                "SPY",
                Decimal::ONE,
                OrderSide::Buy,
                stop,
                stop + Decimal::ONE,
                None,
                t0(),
            )
            .unwrap();

        let mut seen_trigger = false;
        for price in path {
            check_trigger(&mut order, &Quote::flat(price), false);
            let triggered = order.kind.is_triggered_stop_limit();
            prop_assert!(triggered || !seen_trigger);
            seen_trigger = triggered;
            if let OrderKind::StopLimit { limit_price, stop_price, .. } = order.kind {
                prop_assert_eq!(stop_price, stop);
                prop_assert_eq!(limit_price, stop + Decimal::ONE);
            }
        }
    }
}

// ── 6. Expiry precedence ─────────────────────────────────────────────

proptest! {
    #[test]
    fn expired_day_order_never_fills(
        limit in arb_price(),
        minutes_late in 1i64..10_000,
    ) {
        let config = SimulatorConfig::default();
        let mut portfolio = Portfolio::new(Decimal::from(1_000_000_000i64));
        let order = OrderFactory::from_config(&config)
            .create_limit_order(
                &mut portfolio,
                "SPY",
                Decimal::ONE,
                OrderSide::Buy,
                limit,
                None,
                t0(),
            )
            .unwrap();
        let expires_at = order.expires_at.unwrap();

        // Ask well under the limit: the trigger would fire.
        let snap = PriceSnapshot::new(expires_at + Duration::minutes(minutes_late))
            .with_quote("SPY", Quote::flat(limit / Decimal::TWO));
        let report = papertrade_core::engine::process_tick(&mut portfolio, &snap, &config);

        prop_assert!(report.executed.is_empty());
        prop_assert_eq!(report.expired.len(), 1);
        prop_assert_eq!(portfolio.order(order.id).unwrap().status, OrderStatus::Expired);
        prop_assert!(portfolio.history().is_empty());
    }
}
