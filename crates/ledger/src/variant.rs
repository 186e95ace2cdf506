use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketsync_core::{Entity, EntityId, TenantId};

/// Variant identifier (tenant-scoped via the `tenant_id` field on [`Variant`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(pub EntityId);

impl VariantId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for VariantId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A sellable SKU belonging to a product.
///
/// Many inventory units may reference one variant. SKUs are not required to be
/// unique; lookups resolve duplicates oldest-created-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    id: VariantId,
    tenant_id: TenantId,
    sku: String,
    product_name: String,
    description: Option<String>,
    price: f64,
    created_at: DateTime<Utc>,
}

impl Variant {
    pub fn new(
        id: VariantId,
        tenant_id: TenantId,
        sku: impl Into<String>,
        product_name: impl Into<String>,
        price: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            sku: sku.into(),
            product_name: product_name.into(),
            description: None,
            price,
            created_at,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for Variant {
    type Id = VariantId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
