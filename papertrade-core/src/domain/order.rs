//! Order types, price parameters and lifecycle status.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::OrderId;
use super::Symbol;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// Plain order-type label, used in fill records and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
    StopLimit,
    TrailingStop,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "market"),
            OrderType::Limit => write!(f, "limit"),
            OrderType::StopLoss => write!(f, "stop_loss"),
            OrderType::StopLimit => write!(f, "stop_limit"),
            OrderType::TrailingStop => write!(f, "trailing_stop"),
        }
    }
}

/// How long a resting order stays eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInForce {
    /// Expires at the next market close after submission.
    Day,
    /// Good till canceled.
    Gtc,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInForce::Day => write!(f, "day"),
            TimeInForce::Gtc => write!(f, "gtc"),
        }
    }
}

/// Order lifecycle states.
///
/// `Pending` is the only non-terminal state. Market orders never pass
/// through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Filled,
    Canceled,
    Expired,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Filled => write!(f, "filled"),
            OrderStatus::Canceled => write!(f, "canceled"),
            OrderStatus::Expired => write!(f, "expired"),
            OrderStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Trailing distance: a fixed amount or a percentage of the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trail {
    Amount(Decimal),
    /// Percent units: `5` means 5%.
    Percent(Decimal),
}

impl Trail {
    /// Stop level implied by a watermark.
    ///
    /// Sell-side stops sit below the high-water mark, buy-side stops above
    /// the low-water mark. Saturates at the `Decimal` range.
    pub fn stop_from(&self, water_mark: Decimal, side: OrderSide) -> Decimal {
        let distance = match self {
            Trail::Amount(amount) => *amount,
            Trail::Percent(percent) => {
                (*percent / Decimal::ONE_HUNDRED).saturating_mul(water_mark)
            }
        };
        match side {
            OrderSide::Sell => water_mark.saturating_sub(distance),
            OrderSide::Buy => water_mark.saturating_add(distance),
        }
    }
}

/// Order kind with its type-specific price parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderKind {
    /// Fills immediately at the quoted price.
    Market,
    /// Fills at the current price once the book reaches the limit.
    Limit { limit_price: Decimal },
    /// Fills at bid/ask once price crosses the stop.
    StopLoss { stop_price: Decimal },
    /// Crosses the stop once (`triggered` flips to true and stays there),
    /// then rests as a limit order at `limit_price`.
    StopLimit {
        stop_price: Decimal,
        limit_price: Decimal,
        triggered: bool,
    },
    /// Stop that follows the best price seen since placement.
    TrailingStop {
        trail: Trail,
        stop_price: Decimal,
        high_water_mark: Decimal,
        low_water_mark: Decimal,
    },
}

impl OrderKind {
    pub fn order_type(&self) -> OrderType {
        match self {
            OrderKind::Market => OrderType::Market,
            OrderKind::Limit { .. } => OrderType::Limit,
            OrderKind::StopLoss { .. } => OrderType::StopLoss,
            OrderKind::StopLimit { .. } => OrderType::StopLimit,
            OrderKind::TrailingStop { .. } => OrderType::TrailingStop,
        }
    }

    pub fn limit_price(&self) -> Option<Decimal> {
        match self {
            OrderKind::Limit { limit_price } | OrderKind::StopLimit { limit_price, .. } => {
                Some(*limit_price)
            }
            _ => None,
        }
    }

    pub fn stop_price(&self) -> Option<Decimal> {
        match self {
            OrderKind::StopLoss { stop_price }
            | OrderKind::StopLimit { stop_price, .. }
            | OrderKind::TrailingStop { stop_price, .. } => Some(*stop_price),
            _ => None,
        }
    }

    /// Whether a Stop-Limit has crossed its stop. Always false for other kinds.
    pub fn is_triggered_stop_limit(&self) -> bool {
        matches!(self, OrderKind::StopLimit { triggered: true, .. })
    }
}

/// A single order. Kept in the portfolio's order book for its whole life,
/// including after it reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub kind: OrderKind,
    pub time_in_force: TimeInForce,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    /// Set for Day orders only.
    pub expires_at: Option<DateTime<Utc>>,
    pub execution_price: Option<Decimal>,
    /// When the order was filled, canceled, expired or rejected.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn order_type(&self) -> OrderType {
        self.kind.order_type()
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Gross value at a given price; `None` if it overflows.
    pub fn notional(&self, price: Decimal) -> Option<Decimal> {
        price.checked_mul(self.quantity)
    }
}
