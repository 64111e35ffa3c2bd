//! Order factory: validates requests and builds orders.
//!
//! Market orders resolve on the spot: they are funds/shares checked, filled
//! and recorded in one call. Resting orders are only shape-checked (positive
//! quantity and prices) and queued; affordability is left to fill time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::execution::{apply_fill, check_affordability};
use super::time_in_force::MarketHours;
use crate::config::{DefaultTimeInForce, SimulatorConfig};
use crate::domain::{
    Order, OrderKind, OrderSide, OrderStatus, OrderType, Portfolio, Symbol, TimeInForce, Trail,
};
use crate::error::OrderError;

/// A typed order request, the input to [`OrderFactory::submit`].
///
/// `time_in_force` is optional on resting orders; the configured default
/// for the order type applies when it is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderRequest {
    Market {
        symbol: Symbol,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    },
    Limit {
        symbol: Symbol,
        side: OrderSide,
        quantity: Decimal,
        limit_price: Decimal,
        #[serde(default)]
        time_in_force: Option<TimeInForce>,
    },
    StopLoss {
        symbol: Symbol,
        side: OrderSide,
        quantity: Decimal,
        stop_price: Decimal,
        #[serde(default)]
        time_in_force: Option<TimeInForce>,
    },
    StopLimit {
        symbol: Symbol,
        side: OrderSide,
        quantity: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
        #[serde(default)]
        time_in_force: Option<TimeInForce>,
    },
    TrailingStop {
        symbol: Symbol,
        side: OrderSide,
        quantity: Decimal,
        trail: Trail,
        /// Current price; seeds both watermarks and the initial stop.
        current_price: Decimal,
        #[serde(default)]
        time_in_force: Option<TimeInForce>,
    },
}

impl OrderRequest {
    pub fn symbol(&self) -> &str {
        match self {
            OrderRequest::Market { symbol, .. }
            | OrderRequest::Limit { symbol, .. }
            | OrderRequest::StopLoss { symbol, .. }
            | OrderRequest::StopLimit { symbol, .. }
            | OrderRequest::TrailingStop { symbol, .. } => symbol,
        }
    }
}

/// Builds orders for a portfolio using a market calendar and per-type
/// time-in-force defaults.
#[derive(Debug, Clone, Copy)]
pub struct OrderFactory {
    hours: MarketHours,
    defaults: DefaultTimeInForce,
}

impl OrderFactory {
    pub fn new(hours: MarketHours, defaults: DefaultTimeInForce) -> Self {
        Self { hours, defaults }
    }

    pub fn from_config(config: &SimulatorConfig) -> Self {
        Self::new(MarketHours::from_config(config), config.default_time_in_force)
    }

    pub fn market_hours(&self) -> &MarketHours {
        &self.hours
    }

    /// Dispatch a typed request to the matching constructor.
    pub fn submit(
        &self,
        portfolio: &mut Portfolio,
        request: OrderRequest,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        match request {
            OrderRequest::Market {
                symbol,
                side,
                quantity,
                price,
            } => self.create_market_order(portfolio, &symbol, quantity, side, price, now),
            OrderRequest::Limit {
                symbol,
                side,
                quantity,
                limit_price,
                time_in_force,
            } => self.create_limit_order(
                portfolio,
                &symbol,
                quantity,
                side,
                limit_price,
                time_in_force,
                now,
            ),
            OrderRequest::StopLoss {
                symbol,
                side,
                quantity,
                stop_price,
                time_in_force,
            } => self.create_stop_loss_order(
                portfolio,
                &symbol,
                quantity,
                side,
                stop_price,
                time_in_force,
                now,
            ),
            OrderRequest::StopLimit {
                symbol,
                side,
                quantity,
                stop_price,
                limit_price,
                time_in_force,
            } => self.create_stop_limit_order(
                portfolio,
                &symbol,
                quantity,
                side,
                stop_price,
                limit_price,
                time_in_force,
                now,
            ),
            OrderRequest::TrailingStop {
                symbol,
                side,
                quantity,
                trail,
                current_price,
                time_in_force,
            } => self.create_trailing_stop_order(
                portfolio,
                &symbol,
                quantity,
                side,
                trail,
                current_price,
                time_in_force,
                now,
            ),
        }
    }

    /// Execute immediately at `price`.
    ///
    /// An unaffordable buy or oversized sell is recorded as `Rejected` in the
    /// order book and returned as an error; the portfolio is otherwise
    /// unchanged.
    pub fn create_market_order(
        &self,
        portfolio: &mut Portfolio,
        symbol: &str,
        quantity: Decimal,
        side: OrderSide,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        validate_quantity(quantity)?;
        validate_price("price", price)?;

        let mut order = Order {
            id: portfolio.next_order_id(),
            symbol: symbol.to_string(),
            side,
            quantity,
            kind: OrderKind::Market,
            time_in_force: self.defaults.for_type(OrderType::Market),
            status: OrderStatus::Pending,
            created_at: now,
            expires_at: None,
            execution_price: None,
            closed_at: Some(now),
        };

        if let Err(err) = check_affordability(portfolio, side, symbol, quantity, price) {
            warn!(order_id = %order.id, %symbol, %side, error = %err, "market order rejected");
            order.status = OrderStatus::Rejected;
            portfolio.orders.submit(order);
            return Err(err);
        }

        if let Err(err) = apply_fill(portfolio, &order, price, now) {
            warn!(order_id = %order.id, %symbol, %side, error = %err, "market order rejected");
            order.status = OrderStatus::Rejected;
            portfolio.orders.submit(order);
            return Err(err);
        }
        order.status = OrderStatus::Filled;
        order.execution_price = Some(price);
        portfolio.orders.submit(order.clone());
        info!(
            order_id = %order.id,
            %symbol,
            %side,
            %quantity,
            %price,
            "market order filled"
        );
        Ok(order)
    }

    /// Queue a limit order.
    #[allow(clippy::too_many_arguments)]
    pub fn create_limit_order(
        &self,
        portfolio: &mut Portfolio,
        symbol: &str,
        quantity: Decimal,
        side: OrderSide,
        limit_price: Decimal,
        time_in_force: Option<TimeInForce>,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        validate_quantity(quantity)?;
        validate_price("limit_price", limit_price)?;
        let kind = OrderKind::Limit { limit_price };
        Ok(self.enqueue(portfolio, symbol, quantity, side, kind, time_in_force, now))
    }

    /// Queue a stop-loss order.
    #[allow(clippy::too_many_arguments)]
    pub fn create_stop_loss_order(
        &self,
        portfolio: &mut Portfolio,
        symbol: &str,
        quantity: Decimal,
        side: OrderSide,
        stop_price: Decimal,
        time_in_force: Option<TimeInForce>,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        validate_quantity(quantity)?;
        validate_price("stop_price", stop_price)?;
        let kind = OrderKind::StopLoss { stop_price };
        Ok(self.enqueue(portfolio, symbol, quantity, side, kind, time_in_force, now))
    }

    /// Queue a stop-limit order, untriggered.
    #[allow(clippy::too_many_arguments)]
    pub fn create_stop_limit_order(
        &self,
        portfolio: &mut Portfolio,
        symbol: &str,
        quantity: Decimal,
        side: OrderSide,
        stop_price: Decimal,
        limit_price: Decimal,
        time_in_force: Option<TimeInForce>,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        validate_quantity(quantity)?;
        validate_price("stop_price", stop_price)?;
        validate_price("limit_price", limit_price)?;
        let kind = OrderKind::StopLimit {
            stop_price,
            limit_price,
            triggered: false,
        };
        Ok(self.enqueue(portfolio, symbol, quantity, side, kind, time_in_force, now))
    }

    /// Queue a trailing stop with both watermarks at `current_price` and the
    /// stop one trail away from it.
    #[allow(clippy::too_many_arguments)]
    pub fn create_trailing_stop_order(
        &self,
        portfolio: &mut Portfolio,
        symbol: &str,
        quantity: Decimal,
        side: OrderSide,
        trail: Trail,
        current_price: Decimal,
        time_in_force: Option<TimeInForce>,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        validate_quantity(quantity)?;
        validate_price("current_price", current_price)?;
        match trail {
            Trail::Amount(amount) => validate_price("trail_amount", amount)?,
            Trail::Percent(percent) => {
                validate_price("trail_percent", percent)?;
                if percent >= Decimal::ONE_HUNDRED {
                    return Err(OrderError::InvalidPrice {
                        field: "trail_percent",
                        value: percent,
                    });
                }
            }
        }
        let stop_price = trail.stop_from(current_price, side);
        validate_price("stop_price", stop_price)?;

        let kind = OrderKind::TrailingStop {
            trail,
            stop_price,
            high_water_mark: current_price,
            low_water_mark: current_price,
        };
        Ok(self.enqueue(portfolio, symbol, quantity, side, kind, time_in_force, now))
    }

    #[allow(clippy::too_many_arguments)]
    fn enqueue(
        &self,
        portfolio: &mut Portfolio,
        symbol: &str,
        quantity: Decimal,
        side: OrderSide,
        kind: OrderKind,
        time_in_force: Option<TimeInForce>,
        now: DateTime<Utc>,
    ) -> Order {
        let time_in_force =
            time_in_force.unwrap_or_else(|| self.defaults.for_type(kind.order_type()));
        let order = Order {
            id: portfolio.next_order_id(),
            symbol: symbol.to_string(),
            side,
            quantity,
            kind,
            time_in_force,
            status: OrderStatus::Pending,
            created_at: now,
            expires_at: self.hours.expiry_for(time_in_force, now),
            execution_price: None,
            closed_at: None,
        };
        portfolio.orders.submit(order.clone());
        info!(
            order_id = %order.id,
            %symbol,
            %side,
            order_type = %order.order_type(),
            %quantity,
            %time_in_force,
            "order placed"
        );
        order
    }
}

fn validate_quantity(quantity: Decimal) -> Result<(), OrderError> {
    if quantity <= Decimal::ZERO {
        return Err(OrderError::InvalidQuantity(quantity));
    }
    Ok(())
}

fn validate_price(field: &'static str, value: Decimal) -> Result<(), OrderError> {
    if value <= Decimal::ZERO {
        return Err(OrderError::InvalidPrice { field, value });
    }
    Ok(())
}
