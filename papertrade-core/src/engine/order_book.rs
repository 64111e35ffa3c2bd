//! Order book: the portfolio's registry of every order it has seen.
//!
//! The book manages:
//! - Order storage and lookup by id (arena, never hard-deleted)
//! - The pending queue, in submission order
//! - Terminal transitions (Pending → Filled / Canceled / Expired / Rejected)
//! - Audit trail for every transition
//!
//! The book does NOT decide when an order fires or at what price; that is
//! the trigger evaluator's and execution engine's job.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{Order, OrderId, OrderStatus};
use crate::error::OrderError;

/// Audit trail entry for an order state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAuditEntry {
    pub order_id: OrderId,
    pub at: DateTime<Utc>,
    /// `None` for the entry recorded at submission.
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub reason: String,
}

/// Orders keyed by id plus the ordered queue of those still pending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBook {
    orders: BTreeMap<OrderId, Order>,
    /// Pending order ids, oldest first. Evaluation walks this order.
    pending: Vec<OrderId>,
    audit_trail: Vec<OrderAuditEntry>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Public API ─────────────────────────────────────────────────────

    /// Store an order. Pending orders join the back of the queue; orders that
    /// are already terminal (market fills and rejections) are recorded only.
    pub fn submit(&mut self, order: Order) {
        let id = order.id;
        let status = order.status;
        let at = order.closed_at.unwrap_or(order.created_at);
        if status == OrderStatus::Pending {
            self.pending.push(id);
        }
        self.orders.insert(id, order);
        self.record_audit(id, None, status, at, "submitted");
    }

    /// Look up an order by id, live or historical.
    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.orders.get_mut(&id)
    }

    /// All orders in id (submission) order.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// Pending ids in queue order.
    pub fn pending_ids(&self) -> &[OrderId] {
        &self.pending
    }

    /// Pending orders in queue order.
    pub fn pending_orders(&self) -> Vec<&Order> {
        self.pending
            .iter()
            .filter_map(|id| self.orders.get(id))
            .collect()
    }

    /// Pending orders for one symbol, in queue order.
    pub fn pending_for_symbol(&self, symbol: &str) -> Vec<&Order> {
        self.pending_orders()
            .into_iter()
            .filter(|o| o.symbol == symbol)
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: OrderId) -> bool {
        self.pending.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn audit_trail(&self) -> &[OrderAuditEntry] {
        &self.audit_trail
    }

    /// Move a pending order to a terminal status and drop it from the queue.
    ///
    /// `execution_price` is recorded for fills only.
    pub(crate) fn close(
        &mut self,
        id: OrderId,
        to_status: OrderStatus,
        at: DateTime<Utc>,
        execution_price: Option<Decimal>,
        reason: &str,
    ) -> Result<Order, OrderError> {
        debug_assert!(to_status.is_terminal(), "close requires a terminal status");

        let order = self
            .orders
            .get_mut(&id)
            .ok_or(OrderError::OrderNotFound(id))?;
        if order.status != OrderStatus::Pending {
            return Err(OrderError::OrderNotPending {
                id,
                status: order.status,
            });
        }

        order.status = to_status;
        order.closed_at = Some(at);
        if execution_price.is_some() {
            order.execution_price = execution_price;
        }
        let closed = order.clone();

        self.pending.retain(|pending_id| *pending_id != id);
        self.record_audit(id, Some(OrderStatus::Pending), to_status, at, reason);
        Ok(closed)
    }

    /// Record a change inside `Pending` (the stop-limit trigger flip).
    pub(crate) fn note(&mut self, id: OrderId, at: DateTime<Utc>, reason: &str) {
        self.record_audit(
            id,
            Some(OrderStatus::Pending),
            OrderStatus::Pending,
            at,
            reason,
        );
    }

    // ── Internal helpers ───────────────────────────────────────────────

    fn record_audit(
        &mut self,
        order_id: OrderId,
        from_status: Option<OrderStatus>,
        to_status: OrderStatus,
        at: DateTime<Utc>,
        reason: &str,
    ) {
        self.audit_trail.push(OrderAuditEntry {
            order_id,
            at,
            from_status,
            to_status,
            reason: reason.to_string(),
        });
    }
}
