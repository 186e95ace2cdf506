//! FIFO inventory allocation.

use marketsync_core::{Entity, OpContext};
use tracing::debug;

use crate::store::{LedgerError, UnitStore, VariantStore};
use crate::unit::InventoryUnitId;

/// Picks and reserves inventory units for ordered line items.
///
/// Allocation is quantity-one: each line item consumes at most one unit.
/// Unknown SKUs and empty stock are normal business conditions, reported as
/// `None` rather than errors, so callers can record an unallocated line item.
#[derive(Debug, Clone)]
pub struct Allocator<V, U> {
    variants: V,
    units: U,
}

impl<V, U> Allocator<V, U>
where
    V: VariantStore,
    U: UnitStore,
{
    pub fn new(variants: V, units: U) -> Self {
        Self { variants, units }
    }

    /// Find and reserve the oldest in-stock unit for a SKU.
    ///
    /// The candidate list is a snapshot; the reservation itself is an atomic
    /// check-and-set in the unit store. Losing a race against a concurrent
    /// allocation moves on to the next-oldest candidate instead of failing.
    pub fn allocate(
        &self,
        ctx: &OpContext,
        sku: &str,
    ) -> Result<Option<InventoryUnitId>, LedgerError> {
        let tenant_id = ctx.tenant_id();

        let Some(variant) = self.variants.find_by_sku(tenant_id, sku) else {
            debug!(%tenant_id, sku, "allocation: unknown sku");
            return Ok(None);
        };

        for candidate in self.units.in_stock_for_variant(tenant_id, variant.id()) {
            let unit_id = *candidate.id();
            if self.units.try_reserve(tenant_id, &unit_id)? {
                debug!(%tenant_id, sku, unit_id = %unit_id, "allocation: reserved unit");
                return Ok(Some(unit_id));
            }
            // Lost the race for this unit; try the next-oldest.
        }

        debug!(%tenant_id, sku, "allocation: no stock");
        Ok(None)
    }

    /// Roll a reservation back to in-stock.
    ///
    /// Returns `false` when the unit was not reserved (already released or
    /// sold); callers treat that as a no-op.
    pub fn release(&self, ctx: &OpContext, unit_id: &InventoryUnitId) -> Result<bool, LedgerError> {
        self.units.release(ctx.tenant_id(), unit_id)
    }
}
