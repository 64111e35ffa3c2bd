//! Portfolio: cash, holdings, orders and fill history of one account.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::fill::Fill;
use super::ids::{IdGen, OrderId};
use super::order::Order;
use super::quote::PriceSnapshot;
use crate::engine::order_book::OrderBook;

/// Aggregate account state.
///
/// Holdings are long-only quantities. A symbol has a `positions` entry iff it
/// has a `cost_basis` entry; both are removed together when the quantity
/// reaches zero. The order book is owned exclusively by the portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub(crate) cash: Decimal,
    initial_cash: Decimal,
    pub(crate) positions: HashMap<String, Decimal>,
    pub(crate) cost_basis: HashMap<String, Decimal>,
    pub(crate) orders: OrderBook,
    pub(crate) history: Vec<Fill>,
    pub(crate) realized_pnl: Decimal,
    pub(crate) ids: IdGen,
}

impl Portfolio {
    pub fn new(initial_cash: Decimal) -> Self {
        Self {
            cash: initial_cash,
            initial_cash,
            positions: HashMap::new(),
            cost_basis: HashMap::new(),
            orders: OrderBook::new(),
            history: Vec::new(),
            realized_pnl: Decimal::ZERO,
            ids: IdGen::new(),
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn initial_cash(&self) -> Decimal {
        self.initial_cash
    }

    /// Held quantity, zero when flat.
    pub fn position(&self, symbol: &str) -> Decimal {
        self.positions.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn positions(&self) -> &HashMap<String, Decimal> {
        &self.positions
    }

    /// Weighted-average purchase price of the open position.
    pub fn cost_basis(&self, symbol: &str) -> Option<Decimal> {
        self.cost_basis.get(symbol).copied()
    }

    pub fn cost_bases(&self) -> &HashMap<String, Decimal> {
        &self.cost_basis
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn history(&self) -> &[Fill] {
        &self.history
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    pub fn order_book(&self) -> &OrderBook {
        &self.orders
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    /// Every order ever submitted, terminal ones included, in id order.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.orders()
    }

    pub fn pending_orders(&self) -> Vec<&Order> {
        self.orders.pending_orders()
    }

    /// Total equity = cash + market value of holdings.
    ///
    /// Symbols missing from the snapshot are valued at cost basis. Saturates
    /// at the `Decimal` range.
    pub fn equity(&self, prices: &PriceSnapshot) -> Decimal {
        let holdings: Decimal = self
            .positions
            .iter()
            .map(|(symbol, qty)| {
                let price = prices
                    .get(symbol)
                    .map(|q| q.price)
                    .or_else(|| self.cost_basis(symbol))
                    .unwrap_or(Decimal::ZERO);
                qty.saturating_mul(price)
            })
            .fold(Decimal::ZERO, Decimal::saturating_add);
        self.cash.saturating_add(holdings)
    }

    pub(crate) fn next_order_id(&mut self) -> OrderId {
        self.ids.next_order_id()
    }
}
