//! Simulator: the entry point higher layers call.
//!
//! Holds configuration, the order factory and a clock, and exposes order
//! submission, tick processing, cancellation and statistics over any
//! portfolio handed to it. The simulator itself is stateless between calls;
//! all state lives in the portfolio.

use rayon::prelude::*;
use std::sync::Arc;

use super::factory::{OrderFactory, OrderRequest};
use super::reporting::{self, OrderStatistics};
use super::tick::{self, TickReport};
use crate::clock::{Clock, SystemClock};
use crate::config::SimulatorConfig;
use crate::domain::{Order, OrderId, Portfolio, PriceSnapshot};
use crate::error::OrderError;

#[derive(Clone)]
pub struct Simulator {
    config: SimulatorConfig,
    factory: OrderFactory,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl Simulator {
    /// Simulator on wall-clock time.
    pub fn new(config: SimulatorConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: SimulatorConfig, clock: Arc<dyn Clock>) -> Self {
        let factory = OrderFactory::from_config(&config);
        Self {
            config,
            factory,
            clock,
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn factory(&self) -> &OrderFactory {
        &self.factory
    }

    /// Place an order, stamped with the clock's current time.
    ///
    /// Market orders come back `Filled`; everything else comes back `Pending`.
    pub fn submit_order(
        &self,
        portfolio: &mut Portfolio,
        request: OrderRequest,
    ) -> Result<Order, OrderError> {
        self.factory.submit(portfolio, request, self.clock.now())
    }

    pub fn process_tick(&self, portfolio: &mut Portfolio, snapshot: &PriceSnapshot) -> TickReport {
        tick::process_tick(portfolio, snapshot, &self.config)
    }

    pub fn cancel_order(
        &self,
        portfolio: &mut Portfolio,
        id: OrderId,
    ) -> Result<Order, OrderError> {
        reporting::cancel_order(portfolio, id, self.clock.now())
    }

    pub fn order_statistics(&self, portfolio: &Portfolio) -> OrderStatistics {
        reporting::order_statistics(portfolio)
    }
}

/// Run one snapshot against many independent portfolios in parallel.
///
/// Reports come back in the same order as `portfolios`.
pub fn process_tick_all(
    simulator: &Simulator,
    portfolios: &mut [Portfolio],
    snapshot: &PriceSnapshot,
) -> Vec<TickReport> {
    portfolios
        .par_iter_mut()
        .map(|portfolio| simulator.process_tick(portfolio, snapshot))
        .collect()
}
