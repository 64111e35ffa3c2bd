//! Price quotes and per-tick snapshots delivered by the price feed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use super::Symbol;

/// Errors from quote validation.
#[derive(Debug, Error, PartialEq)]
pub enum QuoteError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: Decimal },

    #[error("crossed quote: bid {bid} > ask {ask}")]
    Crossed { bid: Decimal, ask: Decimal },
}

/// One symbol's prices at a point in time.
///
/// `price` is the last trade, `bid` what a buyer pays out to a seller, `ask`
/// what a seller asks of a buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub price: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
}

impl Quote {
    pub fn new(price: Decimal, bid: Decimal, ask: Decimal) -> Self {
        Self { price, bid, ask }
    }

    /// A quote with no spread.
    pub fn flat(price: Decimal) -> Self {
        Self {
            price,
            bid: price,
            ask: price,
        }
    }

    /// Validate that every price is positive and the book is not crossed.
    pub fn validate(&self) -> Result<(), QuoteError> {
        for (field, value) in [("price", self.price), ("bid", self.bid), ("ask", self.ask)] {
            if value <= Decimal::ZERO {
                return Err(QuoteError::NonPositive { field, value });
            }
        }
        if self.bid > self.ask {
            return Err(QuoteError::Crossed {
                bid: self.bid,
                ask: self.ask,
            });
        }
        Ok(())
    }
}

/// All quotes delivered in one price-update event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// Evaluation time for expiration checks and fill timestamps.
    pub as_of: DateTime<Utc>,
    pub quotes: HashMap<Symbol, Quote>,
}

impl PriceSnapshot {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            as_of,
            quotes: HashMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with_quote(mut self, symbol: impl Into<Symbol>, quote: Quote) -> Self {
        self.quotes.insert(symbol.into(), quote);
        self
    }

    pub fn insert(&mut self, symbol: impl Into<Symbol>, quote: Quote) {
        self.quotes.insert(symbol.into(), quote);
    }

    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}
