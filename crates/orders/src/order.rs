use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketsync_core::{DomainError, DomainResult, Entity, EntityId, TenantId};
use marketsync_ledger::InventoryUnitId;

use crate::account::ExternalAccountId;

/// Order identifier (internal; the idempotency key is on [`crate::OrderKey`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub EntityId);

impl OrderId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Line item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemId(pub EntityId);

impl LineItemId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

/// A marketplace order, one per (external account, external order id).
///
/// Created on first webhook delivery, updated in place on redelivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    tenant_id: TenantId,
    account_id: ExternalAccountId,
    external_id: String,
    display_name: String,
    currency: String,
    total_price: f64,
    external_created_at: DateTime<Utc>,
    financial_status: Option<String>,
    fulfillment_status: Option<String>,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OrderId,
        tenant_id: TenantId,
        account_id: ExternalAccountId,
        external_id: impl Into<String>,
        display_name: impl Into<String>,
        currency: impl Into<String>,
        total_price: f64,
        external_created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            account_id,
            external_id: external_id.into(),
            display_name: display_name.into(),
            currency: currency.into(),
            total_price,
            external_created_at,
            financial_status: None,
            fulfillment_status: None,
        }
    }

    pub fn with_statuses(
        mut self,
        financial: Option<String>,
        fulfillment: Option<String>,
    ) -> Self {
        self.financial_status = financial;
        self.fulfillment_status = fulfillment;
        self
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn account_id(&self) -> ExternalAccountId {
        self.account_id
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }

    pub fn external_created_at(&self) -> DateTime<Utc> {
        self.external_created_at
    }

    pub fn financial_status(&self) -> Option<&str> {
        self.financial_status.as_deref()
    }

    pub fn fulfillment_status(&self) -> Option<&str> {
        self.fulfillment_status.as_deref()
    }

    /// Domain validation, checked before any line item is touched.
    pub fn validate(&self) -> DomainResult<()> {
        if self.total_price < 0.0 {
            return Err(DomainError::validation("total price cannot be negative"));
        }
        if self.currency.trim().is_empty() {
            return Err(DomainError::validation("currency cannot be empty"));
        }
        Ok(())
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Child of [`Order`]; the full set is destroyed and recreated on every
/// successful re-ingestion, so line items have no identity across re-syncs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    id: LineItemId,
    order_id: OrderId,
    external_id: String,
    sku: String,
    title: String,
    quantity: u32,
    unit_price: f64,
    unit_id: Option<InventoryUnitId>,
}

impl OrderLineItem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: LineItemId,
        order_id: OrderId,
        external_id: impl Into<String>,
        sku: impl Into<String>,
        title: impl Into<String>,
        quantity: u32,
        unit_price: f64,
        unit_id: Option<InventoryUnitId>,
    ) -> Self {
        Self {
            id,
            order_id,
            external_id: external_id.into(),
            sku: sku.into(),
            title: title.into(),
            quantity,
            unit_price,
            unit_id,
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    /// The inventory unit this line item consumed, if allocation found one.
    pub fn unit_id(&self) -> Option<InventoryUnitId> {
        self.unit_id
    }
}

impl Entity for OrderLineItem {
    type Id = LineItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
