//! Idempotent order materialization.
//!
//! One webhook delivery becomes one upserted order plus a fully rebuilt line
//! item set. Redelivery of the same order converges to the same final state:
//! line items are destroyed and recreated rather than diffed, and allocation
//! re-runs for every item. The trade is simplicity and idempotency against
//! re-running allocation on each redelivery.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use marketsync_core::{DomainError, Entity, EntityId, OpContext};
use marketsync_ledger::{Allocator, InventoryUnitId, LedgerError, UnitStore, VariantStore};

use crate::account::ExternalAccount;
use crate::order::{LineItemId, Order, OrderId, OrderLineItem};
use crate::payload::OrderPayload;
use crate::store::{OrderKey, OrderStore, OrderStoreError};

/// Error from a materialization attempt.
///
/// Per-order isolation: none of these abort sibling orders; the caller (job
/// runner) contains them to the one unit of work.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Store(#[from] OrderStoreError),
}

impl MaterializeError {
    /// Deterministic failures that redelivery cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MaterializeError::Domain(_))
    }
}

/// Result of a materialization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// Payload carried no usable external order id; dropped by design.
    Skipped,
    Materialized {
        order_id: OrderId,
        line_items: usize,
        allocated: usize,
    },
}

/// Serializes line item replacement per order key.
///
/// Two concurrent deliveries of the same order id must not interleave the
/// destroy/create of line items; different orders proceed in parallel.
#[derive(Debug, Clone, Default)]
struct OrderLocks {
    inner: Arc<Mutex<HashMap<OrderKey, Arc<Mutex<()>>>>>,
}

impl OrderLocks {
    fn for_key(&self, key: &OrderKey) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap();
        map.entry(key.clone()).or_default().clone()
    }

    /// Drop the entry for a key no materialization holds anymore, so the map
    /// does not grow with every order ever seen.
    fn prune(&self, key: &OrderKey) {
        let mut map = self.inner.lock().unwrap();
        if map.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            map.remove(key);
        }
    }
}

/// Materializes marketplace orders from raw webhook payloads.
#[derive(Debug, Clone)]
pub struct Materializer<O, V, U> {
    orders: O,
    allocator: Allocator<V, U>,
    locks: OrderLocks,
}

impl<O, V, U> Materializer<O, V, U>
where
    O: OrderStore,
    V: VariantStore,
    U: UnitStore,
{
    pub fn new(orders: O, allocator: Allocator<V, U>) -> Self {
        Self {
            orders,
            allocator,
            locks: OrderLocks::default(),
        }
    }

    /// Ingest one raw order payload for an account.
    ///
    /// Safe to retry in full: the upsert is idempotent and the line item set
    /// is rebuilt wholesale under a per-order lock. Reservations taken while
    /// building the new set are rolled back if the rebuild fails, so a unit
    /// is never left reserved without an owning line item.
    pub fn materialize(
        &self,
        ctx: &OpContext,
        account: &ExternalAccount,
        payload: &serde_json::Value,
    ) -> Result<MaterializeOutcome, MaterializeError> {
        if account.tenant_id() != ctx.tenant_id() {
            return Err(DomainError::invariant("tenant mismatch").into());
        }

        let Some(parsed) = OrderPayload::parse(payload) else {
            debug!(account = %account.id(), "order payload without external id, skipping");
            return Ok(MaterializeOutcome::Skipped);
        };

        let order = Order::new(
            OrderId::new(EntityId::new()),
            ctx.tenant_id(),
            *account.id(),
            parsed.external_id.clone(),
            parsed
                .display_name
                .clone()
                .unwrap_or_else(|| format!("#{}", parsed.external_id)),
            parsed.currency.clone().unwrap_or_else(|| "USD".to_string()),
            parsed.total_price.unwrap_or(0.0),
            parsed.external_created_at.unwrap_or_else(Utc::now),
        )
        .with_statuses(
            parsed.financial_status.clone(),
            parsed.fulfillment_status.clone(),
        );

        // Validation happens before anything is persisted; an invalid order
        // leaves existing state (including line items) untouched.
        order.validate()?;

        let key = OrderKey::new(*account.id(), parsed.external_id.clone());
        let lock = self.locks.for_key(&key);
        let result = {
            let _guard = lock.lock().unwrap();
            self.replace_order(ctx, order, &parsed)
        };
        drop(lock);
        self.locks.prune(&key);
        result
    }

    /// The destroy/create critical section; callers hold the per-key lock.
    fn replace_order(
        &self,
        ctx: &OpContext,
        order: Order,
        parsed: &OrderPayload,
    ) -> Result<MaterializeOutcome, MaterializeError> {
        let order_id = self.orders.upsert(order)?;

        // Full replace: hand back the units held by the outgoing line items
        // first, so redelivery re-selects the same stock instead of consuming
        // more of it. Until the new set persists below, the stored line items
        // may reference units already back in stock; a failed replace leaves
        // that stale set for the next delivery to rebuild. No unit is ever
        // left reserved without an owner.
        for old in self.orders.line_items(&order_id) {
            if let Some(unit_id) = old.unit_id() {
                self.release_quietly(ctx, &unit_id);
            }
        }

        let mut items = Vec::with_capacity(parsed.line_items.len());
        let mut reserved: Vec<InventoryUnitId> = Vec::new();

        for line in &parsed.line_items {
            let unit_id = match self.allocator.allocate(ctx, &line.sku) {
                Ok(unit_id) => unit_id,
                Err(e) => {
                    self.rollback(ctx, &reserved);
                    return Err(e.into());
                }
            };
            if let Some(id) = unit_id {
                reserved.push(id);
            }

            items.push(OrderLineItem::new(
                LineItemId::new(EntityId::new()),
                order_id,
                line.external_id.clone(),
                line.sku.clone(),
                line.title.clone(),
                line.quantity,
                line.unit_price,
                unit_id,
            ));
        }

        let line_count = items.len();
        let allocated = reserved.len();

        if let Err(e) = self.orders.replace_line_items(&order_id, items) {
            // Reserve-on-commit: nothing owns these reservations yet.
            self.rollback(ctx, &reserved);
            return Err(e.into());
        }

        info!(
            tenant_id = %ctx.tenant_id(),
            order_id = %order_id,
            external_id = %parsed.external_id,
            line_items = line_count,
            allocated,
            "order materialized"
        );

        Ok(MaterializeOutcome::Materialized {
            order_id,
            line_items: line_count,
            allocated,
        })
    }

    fn rollback(&self, ctx: &OpContext, reserved: &[InventoryUnitId]) {
        for unit_id in reserved {
            self.release_quietly(ctx, unit_id);
        }
    }

    fn release_quietly(&self, ctx: &OpContext, unit_id: &InventoryUnitId) {
        match self.allocator.release(ctx, unit_id) {
            Ok(_) => {}
            // The ledger no longer knows the unit; nothing left to release.
            Err(LedgerError::UnitNotFound(_)) => {}
            Err(e) => {
                warn!(unit_id = %unit_id, error = %e, "failed to release reservation");
            }
        }
    }
}
