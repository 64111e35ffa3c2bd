//! Order engine: placement, per-tick evaluation, fills and reporting.
//!
//! A tick runs one pass over a portfolio's pending queue:
//!
//! 1. Expiry: Day orders past their market close become `Expired`
//! 2. Trigger: per-kind conditions, trailing watermarks, stop-limit flip
//! 3. Execution: firing orders fill against cash and positions in queue order

pub mod execution;
pub mod factory;
pub mod order_book;
pub mod reporting;
pub mod simulator;
pub mod tick;
pub mod time_in_force;
pub mod trigger;
pub mod worker;

pub use execution::{check_affordability, fill_order, FillOutcome};
pub use factory::{OrderFactory, OrderRequest};
pub use order_book::{OrderAuditEntry, OrderBook};
pub use reporting::{cancel_order, order_statistics, OrderStatistics};
pub use simulator::{process_tick_all, Simulator};
pub use tick::{process_tick, TickReport};
pub use time_in_force::{is_expired, MarketHours};
pub use trigger::{check_trigger, ratchet_trailing_stop, TriggerResult};
pub use worker::{PortfolioWorker, WorkerCommand, WorkerError};
