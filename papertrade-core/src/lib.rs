//! Papertrade Core: order lifecycle and execution for a simulated brokerage.
//!
//! This crate contains:
//! - Domain types (orders, quotes, fills, portfolio)
//! - Order factory for market, limit, stop-loss, stop-limit and trailing-stop orders
//! - Trigger evaluation against bid/ask/last quotes
//! - Execution against cash, positions and weighted-average cost basis
//! - Day / GTC expiration
//! - Cancellation, statistics and a per-portfolio worker thread

pub mod clock;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SimulatorConfig;
pub use error::{ConfigError, OrderError};
