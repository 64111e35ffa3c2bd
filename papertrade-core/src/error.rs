//! Error types for order operations and configuration loading.

use rust_decimal::Decimal;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{OrderId, OrderStatus};

/// Per-call order rejection. Every variant is scoped to one order; the
/// portfolio is left consistent.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrderError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("insufficient shares of {symbol}: requested {requested}, held {held}")]
    InsufficientShares {
        symbol: String,
        requested: Decimal,
        held: Decimal,
    },

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order {id} is not pending (status: {status})")]
    OrderNotPending { id: OrderId, status: OrderStatus },

    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(Decimal),

    #[error("{field} must be positive, got {value}")]
    InvalidPrice { field: &'static str, value: Decimal },

    #[error("amount out of range for {symbol}: {quantity} @ {price}")]
    AmountOverflow {
        symbol: String,
        quantity: Decimal,
        price: Decimal,
    },
}

/// Errors from loading or validating a [`SimulatorConfig`](crate::config::SimulatorConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
