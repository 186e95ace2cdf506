//! Ledger storage abstractions and in-memory implementations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use marketsync_core::{Entity, TenantId};

use crate::unit::{InventoryUnit, InventoryUnitId, UnitStatus};
use crate::variant::{Variant, VariantId};

/// Ledger store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("inventory unit not found: {0}")]
    UnitNotFound(InventoryUnitId),
    #[error("variant not found: {0}")]
    VariantNotFound(VariantId),
    #[error("tenant isolation violation")]
    TenantIsolation,
    #[error("record already exists")]
    AlreadyExists,
}

/// Variant catalog lookups.
pub trait VariantStore: Send + Sync {
    fn insert(&self, variant: Variant) -> Result<(), LedgerError>;

    fn get(&self, tenant_id: TenantId, id: &VariantId) -> Option<Variant>;

    /// Resolve a SKU to a variant.
    ///
    /// SKUs are not unique; the oldest-created variant wins on duplicates.
    fn find_by_sku(&self, tenant_id: TenantId, sku: &str) -> Option<Variant>;
}

/// Inventory unit storage with atomic status transitions.
pub trait UnitStore: Send + Sync {
    fn insert(&self, unit: InventoryUnit) -> Result<(), LedgerError>;

    fn get(&self, tenant_id: TenantId, id: &InventoryUnitId) -> Option<InventoryUnit>;

    /// In-stock units of a variant, oldest `created_at` first.
    fn in_stock_for_variant(&self, tenant_id: TenantId, variant_id: &VariantId)
    -> Vec<InventoryUnit>;

    /// Atomic `InStock -> Reserved` transition.
    ///
    /// Returns `Ok(false)` when the unit is no longer in stock (a concurrent
    /// reservation won the race, or the unit was sold). The check and the set
    /// happen under a single write-lock acquisition, so two concurrent callers
    /// can never both get `Ok(true)` for the same unit.
    fn try_reserve(&self, tenant_id: TenantId, id: &InventoryUnitId) -> Result<bool, LedgerError>;

    /// Atomic `Reserved -> InStock` transition (reservation rollback).
    ///
    /// Returns `Ok(false)` when the unit was not reserved.
    fn release(&self, tenant_id: TenantId, id: &InventoryUnitId) -> Result<bool, LedgerError>;

    /// Atomic `Reserved -> Sold` transition (fulfillment).
    ///
    /// Returns `Ok(false)` when the unit was not reserved.
    fn mark_sold(&self, tenant_id: TenantId, id: &InventoryUnitId) -> Result<bool, LedgerError>;
}

impl<S> VariantStore for Arc<S>
where
    S: VariantStore + ?Sized,
{
    fn insert(&self, variant: Variant) -> Result<(), LedgerError> {
        (**self).insert(variant)
    }

    fn get(&self, tenant_id: TenantId, id: &VariantId) -> Option<Variant> {
        (**self).get(tenant_id, id)
    }

    fn find_by_sku(&self, tenant_id: TenantId, sku: &str) -> Option<Variant> {
        (**self).find_by_sku(tenant_id, sku)
    }
}

impl<S> UnitStore for Arc<S>
where
    S: UnitStore + ?Sized,
{
    fn insert(&self, unit: InventoryUnit) -> Result<(), LedgerError> {
        (**self).insert(unit)
    }

    fn get(&self, tenant_id: TenantId, id: &InventoryUnitId) -> Option<InventoryUnit> {
        (**self).get(tenant_id, id)
    }

    fn in_stock_for_variant(
        &self,
        tenant_id: TenantId,
        variant_id: &VariantId,
    ) -> Vec<InventoryUnit> {
        (**self).in_stock_for_variant(tenant_id, variant_id)
    }

    fn try_reserve(&self, tenant_id: TenantId, id: &InventoryUnitId) -> Result<bool, LedgerError> {
        (**self).try_reserve(tenant_id, id)
    }

    fn release(&self, tenant_id: TenantId, id: &InventoryUnitId) -> Result<bool, LedgerError> {
        (**self).release(tenant_id, id)
    }

    fn mark_sold(&self, tenant_id: TenantId, id: &InventoryUnitId) -> Result<bool, LedgerError> {
        (**self).mark_sold(tenant_id, id)
    }
}

/// In-memory variant store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryVariantStore {
    variants: RwLock<HashMap<VariantId, Variant>>,
}

impl InMemoryVariantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl VariantStore for InMemoryVariantStore {
    fn insert(&self, variant: Variant) -> Result<(), LedgerError> {
        let mut map = self.variants.write().unwrap();
        if map.contains_key(variant.id()) {
            return Err(LedgerError::AlreadyExists);
        }
        map.insert(*variant.id(), variant);
        Ok(())
    }

    fn get(&self, tenant_id: TenantId, id: &VariantId) -> Option<Variant> {
        let map = self.variants.read().unwrap();
        map.get(id)
            .filter(|v| v.tenant_id() == tenant_id)
            .cloned()
    }

    fn find_by_sku(&self, tenant_id: TenantId, sku: &str) -> Option<Variant> {
        let map = self.variants.read().unwrap();
        let mut matches: Vec<_> = map
            .values()
            .filter(|v| v.tenant_id() == tenant_id && v.sku() == sku)
            .collect();

        // Oldest-created variant wins on duplicate SKUs.
        matches.sort_by_key(|v| v.created_at());
        matches.first().map(|v| (*v).clone())
    }
}

/// In-memory unit store for tests/dev.
///
/// All status transitions take the write lock for their full duration, which
/// makes `try_reserve`/`release`/`mark_sold` linearizable across threads.
#[derive(Debug, Default)]
pub struct InMemoryUnitStore {
    units: RwLock<HashMap<InventoryUnitId, InventoryUnit>>,
}

impl InMemoryUnitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn transition(
        &self,
        tenant_id: TenantId,
        id: &InventoryUnitId,
        from: UnitStatus,
        to: UnitStatus,
    ) -> Result<bool, LedgerError> {
        let mut map = self.units.write().unwrap();
        let unit = map.get_mut(id).ok_or(LedgerError::UnitNotFound(*id))?;
        if unit.tenant_id() != tenant_id {
            return Err(LedgerError::TenantIsolation);
        }
        if unit.status() != from {
            return Ok(false);
        }
        unit.set_status(to);
        Ok(true)
    }
}

impl UnitStore for InMemoryUnitStore {
    fn insert(&self, unit: InventoryUnit) -> Result<(), LedgerError> {
        let mut map = self.units.write().unwrap();
        if map.contains_key(unit.id()) {
            return Err(LedgerError::AlreadyExists);
        }
        map.insert(*unit.id(), unit);
        Ok(())
    }

    fn get(&self, tenant_id: TenantId, id: &InventoryUnitId) -> Option<InventoryUnit> {
        let map = self.units.read().unwrap();
        map.get(id)
            .filter(|u| u.tenant_id() == tenant_id)
            .cloned()
    }

    fn in_stock_for_variant(
        &self,
        tenant_id: TenantId,
        variant_id: &VariantId,
    ) -> Vec<InventoryUnit> {
        let map = self.units.read().unwrap();
        let mut units: Vec<_> = map
            .values()
            .filter(|u| {
                u.tenant_id() == tenant_id
                    && u.variant_id() == *variant_id
                    && u.status() == UnitStatus::InStock
            })
            .cloned()
            .collect();

        // FIFO: first-received stock is first-sold.
        units.sort_by_key(|u| u.created_at());
        units
    }

    fn try_reserve(&self, tenant_id: TenantId, id: &InventoryUnitId) -> Result<bool, LedgerError> {
        self.transition(tenant_id, id, UnitStatus::InStock, UnitStatus::Reserved)
    }

    fn release(&self, tenant_id: TenantId, id: &InventoryUnitId) -> Result<bool, LedgerError> {
        self.transition(tenant_id, id, UnitStatus::Reserved, UnitStatus::InStock)
    }

    fn mark_sold(&self, tenant_id: TenantId, id: &InventoryUnitId) -> Result<bool, LedgerError> {
        self.transition(tenant_id, id, UnitStatus::Reserved, UnitStatus::Sold)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use marketsync_core::EntityId;

    use super::*;

    fn tenant() -> TenantId {
        TenantId::new()
    }

    fn variant(tenant_id: TenantId, sku: &str, age_secs: i64) -> Variant {
        Variant::new(
            VariantId::new(EntityId::new()),
            tenant_id,
            sku,
            "Widget",
            10.0,
            Utc::now() - Duration::seconds(age_secs),
        )
    }

    fn unit(tenant_id: TenantId, variant_id: VariantId, age_secs: i64) -> InventoryUnit {
        InventoryUnit::new(
            InventoryUnitId::new(EntityId::new()),
            tenant_id,
            variant_id,
            format!("SER-{age_secs}"),
            Utc::now() - Duration::seconds(age_secs),
        )
    }

    #[test]
    fn duplicate_sku_resolves_to_oldest_variant() {
        let store = InMemoryVariantStore::new();
        let t = tenant();

        let newer = variant(t, "ABC", 10);
        let older = variant(t, "ABC", 100);
        let older_id = *older.id();

        store.insert(newer).unwrap();
        store.insert(older).unwrap();

        let found = store.find_by_sku(t, "ABC").unwrap();
        assert_eq!(*found.id(), older_id);
    }

    #[test]
    fn sku_lookup_is_tenant_scoped() {
        let store = InMemoryVariantStore::new();
        let t1 = tenant();
        let t2 = tenant();

        store.insert(variant(t1, "ABC", 1)).unwrap();

        assert!(store.find_by_sku(t1, "ABC").is_some());
        assert!(store.find_by_sku(t2, "ABC").is_none());
    }

    #[test]
    fn in_stock_units_come_back_oldest_first() {
        let store = InMemoryUnitStore::new();
        let t = tenant();
        let vid = VariantId::new(EntityId::new());

        let newest = unit(t, vid, 1);
        let oldest = unit(t, vid, 100);
        let middle = unit(t, vid, 50);
        let oldest_id = *oldest.id();

        store.insert(newest).unwrap();
        store.insert(oldest).unwrap();
        store.insert(middle).unwrap();

        let in_stock = store.in_stock_for_variant(t, &vid);
        assert_eq!(in_stock.len(), 3);
        assert_eq!(*in_stock[0].id(), oldest_id);
    }

    #[test]
    fn reserve_is_a_one_shot_transition() {
        let store = InMemoryUnitStore::new();
        let t = tenant();
        let u = unit(t, VariantId::new(EntityId::new()), 1);
        let id = *u.id();
        store.insert(u).unwrap();

        assert!(store.try_reserve(t, &id).unwrap());
        // Second attempt loses: unit is no longer in stock.
        assert!(!store.try_reserve(t, &id).unwrap());
        assert_eq!(store.get(t, &id).unwrap().status(), UnitStatus::Reserved);
    }

    #[test]
    fn release_returns_unit_to_stock() {
        let store = InMemoryUnitStore::new();
        let t = tenant();
        let u = unit(t, VariantId::new(EntityId::new()), 1);
        let id = *u.id();
        store.insert(u).unwrap();

        assert!(store.try_reserve(t, &id).unwrap());
        assert!(store.release(t, &id).unwrap());
        assert_eq!(store.get(t, &id).unwrap().status(), UnitStatus::InStock);

        // Releasing an in-stock unit is a no-op.
        assert!(!store.release(t, &id).unwrap());
    }

    #[test]
    fn sold_units_cannot_be_reserved_or_released() {
        let store = InMemoryUnitStore::new();
        let t = tenant();
        let u = unit(t, VariantId::new(EntityId::new()), 1);
        let id = *u.id();
        store.insert(u).unwrap();

        assert!(store.try_reserve(t, &id).unwrap());
        assert!(store.mark_sold(t, &id).unwrap());
        assert!(!store.try_reserve(t, &id).unwrap());
        assert!(!store.release(t, &id).unwrap());
        assert_eq!(store.get(t, &id).unwrap().status(), UnitStatus::Sold);
    }

    #[test]
    fn transitions_enforce_tenant_isolation() {
        let store = InMemoryUnitStore::new();
        let t1 = tenant();
        let t2 = tenant();
        let u = unit(t1, VariantId::new(EntityId::new()), 1);
        let id = *u.id();
        store.insert(u).unwrap();

        assert!(matches!(
            store.try_reserve(t2, &id),
            Err(LedgerError::TenantIsolation)
        ));
    }
}
