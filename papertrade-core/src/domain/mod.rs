//! Domain types for the trading simulator

pub mod fill;
pub mod ids;
pub mod order;
pub mod portfolio;
pub mod quote;

pub use fill::Fill;
pub use ids::{IdGen, OrderId};
pub use order::{Order, OrderKind, OrderSide, OrderStatus, OrderType, TimeInForce, Trail};
pub use portfolio::Portfolio;
pub use quote::{PriceSnapshot, Quote, QuoteError};

/// Symbol type alias
pub type Symbol = String;
