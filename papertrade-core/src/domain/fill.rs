use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ids::OrderId;
use crate::domain::order::{OrderSide, OrderType};

/// Executed trade, appended to portfolio history and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub symbol: String,
    pub quantity: Decimal,
    pub price: Decimal,
    /// `price × quantity`
    pub total: Decimal,
    pub timestamp: DateTime<Utc>,
    /// Gain or loss against cost basis. Sells only.
    pub realized_pnl: Option<Decimal>,
}
