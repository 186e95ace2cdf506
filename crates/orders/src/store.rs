//! Order storage: idempotent upsert keyed by (account, external id).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use marketsync_core::Entity;

use crate::account::ExternalAccountId;
use crate::order::{Order, OrderId, OrderLineItem};

/// The idempotency key: one order per (external account, external order id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderKey {
    pub account_id: ExternalAccountId,
    pub external_id: String,
}

impl OrderKey {
    pub fn new(account_id: ExternalAccountId, external_id: impl Into<String>) -> Self {
        Self {
            account_id,
            external_id: external_id.into(),
        }
    }
}

/// Order store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OrderStoreError {
    #[error("order not found: {0}")]
    NotFound(OrderId),
}

pub trait OrderStore: Send + Sync {
    /// Create-if-absent, update-in-place otherwise.
    ///
    /// On update, the stored order keeps its original [`OrderId`]; all other
    /// fields are taken from the incoming value. Returns the surviving id.
    fn upsert(&self, order: Order) -> Result<OrderId, OrderStoreError>;

    fn find(&self, key: &OrderKey) -> Option<Order>;

    fn get(&self, id: &OrderId) -> Option<Order>;

    /// Replace the full line item set for an order (destroy + recreate).
    fn replace_line_items(
        &self,
        order_id: &OrderId,
        items: Vec<OrderLineItem>,
    ) -> Result<(), OrderStoreError>;

    fn line_items(&self, order_id: &OrderId) -> Vec<OrderLineItem>;
}

impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    fn upsert(&self, order: Order) -> Result<OrderId, OrderStoreError> {
        (**self).upsert(order)
    }

    fn find(&self, key: &OrderKey) -> Option<Order> {
        (**self).find(key)
    }

    fn get(&self, id: &OrderId) -> Option<Order> {
        (**self).get(id)
    }

    fn replace_line_items(
        &self,
        order_id: &OrderId,
        items: Vec<OrderLineItem>,
    ) -> Result<(), OrderStoreError> {
        (**self).replace_line_items(order_id, items)
    }

    fn line_items(&self, order_id: &OrderId) -> Vec<OrderLineItem> {
        (**self).line_items(order_id)
    }
}

/// In-memory order store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderKey, Order>>,
    lines: RwLock<HashMap<OrderId, Vec<OrderLineItem>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn order_count(&self) -> usize {
        self.orders.read().unwrap().len()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn upsert(&self, order: Order) -> Result<OrderId, OrderStoreError> {
        let key = OrderKey::new(order.account_id(), order.external_id());
        let mut map = self.orders.write().unwrap();

        let id = match map.get(&key) {
            // Update in place, preserving the original identity.
            Some(existing) => *existing.id(),
            None => *order.id(),
        };

        let mut order = order;
        if *order.id() != id {
            order = Order::new(
                id,
                order.tenant_id(),
                order.account_id(),
                order.external_id(),
                order.display_name(),
                order.currency(),
                order.total_price(),
                order.external_created_at(),
            )
            .with_statuses(
                order.financial_status().map(str::to_string),
                order.fulfillment_status().map(str::to_string),
            );
        }
        map.insert(key, order);
        Ok(id)
    }

    fn find(&self, key: &OrderKey) -> Option<Order> {
        self.orders.read().unwrap().get(key).cloned()
    }

    fn get(&self, id: &OrderId) -> Option<Order> {
        let map = self.orders.read().unwrap();
        map.values().find(|o| o.id() == id).cloned()
    }

    fn replace_line_items(
        &self,
        order_id: &OrderId,
        items: Vec<OrderLineItem>,
    ) -> Result<(), OrderStoreError> {
        {
            let map = self.orders.read().unwrap();
            if !map.values().any(|o| o.id() == order_id) {
                return Err(OrderStoreError::NotFound(*order_id));
            }
        }
        self.lines.write().unwrap().insert(*order_id, items);
        Ok(())
    }

    fn line_items(&self, order_id: &OrderId) -> Vec<OrderLineItem> {
        self.lines
            .read()
            .unwrap()
            .get(order_id)
            .cloned()
            .unwrap_or_default()
    }
}
