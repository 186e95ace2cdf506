use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketsync_core::{Entity, EntityId, TenantId};

use crate::variant::VariantId;

/// Inventory unit identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryUnitId(pub EntityId);

impl InventoryUnitId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InventoryUnitId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Lifecycle status of a physical unit.
///
/// `InStock -> Reserved` happens exactly once per order cycle and is guarded
/// by an atomic check-and-set in the store. `Reserved -> InStock` is the
/// release path used when a reservation's owning line item goes away.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    InStock,
    Reserved,
    Sold,
}

/// One physical unit of a [`crate::Variant`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryUnit {
    id: InventoryUnitId,
    tenant_id: TenantId,
    variant_id: VariantId,
    serial: String,
    status: UnitStatus,
    created_at: DateTime<Utc>,
}

impl InventoryUnit {
    /// New unit, in stock.
    pub fn new(
        id: InventoryUnitId,
        tenant_id: TenantId,
        variant_id: VariantId,
        serial: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            variant_id,
            serial: serial.into(),
            status: UnitStatus::InStock,
            created_at,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn variant_id(&self) -> VariantId {
        self.variant_id
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn status(&self) -> UnitStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn set_status(&mut self, status: UnitStatus) {
        self.status = status;
    }
}

impl Entity for InventoryUnit {
    type Id = InventoryUnitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
