//! The local mirror of a remote marketplace listing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketsync_core::{Entity, EntityId, TenantId};
use marketsync_ledger::InventoryUnitId;
use marketsync_orders::ExternalAccountId;

/// Listing record identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingRecordId(pub EntityId);

impl ListingRecordId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ListingRecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Remote listing lifecycle, as far as this system tracks it.
///
/// Drafts are created unpublished; publishing on the marketplace side is out
/// of scope, so `Draft` is currently the only live state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Draft,
}

/// Join between an external account and an inventory unit: "this unit is
/// listed on that marketplace".
///
/// Created only after the remote call succeeds and destroyed only after the
/// remote delete succeeds, so the local mirror never claims a listing the
/// marketplace does not have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    id: ListingRecordId,
    tenant_id: TenantId,
    account_id: ExternalAccountId,
    unit_id: InventoryUnitId,
    offer_id: String,
    listing_id: String,
    status: ListingStatus,
    created_at: DateTime<Utc>,
}

impl ListingRecord {
    pub fn new(
        id: ListingRecordId,
        tenant_id: TenantId,
        account_id: ExternalAccountId,
        unit_id: InventoryUnitId,
        offer_id: impl Into<String>,
        listing_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            account_id,
            unit_id,
            offer_id: offer_id.into(),
            listing_id: listing_id.into(),
            status: ListingStatus::Draft,
            created_at: Utc::now(),
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn account_id(&self) -> ExternalAccountId {
        self.account_id
    }

    pub fn unit_id(&self) -> InventoryUnitId {
        self.unit_id
    }

    pub fn offer_id(&self) -> &str {
        &self.offer_id
    }

    pub fn listing_id(&self) -> &str {
        &self.listing_id
    }

    pub fn status(&self) -> ListingStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for ListingRecord {
    type Id = ListingRecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

pub trait ListingStore: Send + Sync {
    fn insert(&self, record: ListingRecord);

    /// At most one listing per unit.
    fn find_by_unit(&self, tenant_id: TenantId, unit_id: &InventoryUnitId)
    -> Option<ListingRecord>;

    /// Destroy the record for a unit; `false` when none existed.
    fn remove_by_unit(&self, tenant_id: TenantId, unit_id: &InventoryUnitId) -> bool;

    /// All listings for one account, newest first.
    fn list_for_account(
        &self,
        tenant_id: TenantId,
        account_id: &ExternalAccountId,
    ) -> Vec<ListingRecord>;
}

impl<S> ListingStore for Arc<S>
where
    S: ListingStore + ?Sized,
{
    fn insert(&self, record: ListingRecord) {
        (**self).insert(record)
    }

    fn find_by_unit(
        &self,
        tenant_id: TenantId,
        unit_id: &InventoryUnitId,
    ) -> Option<ListingRecord> {
        (**self).find_by_unit(tenant_id, unit_id)
    }

    fn remove_by_unit(&self, tenant_id: TenantId, unit_id: &InventoryUnitId) -> bool {
        (**self).remove_by_unit(tenant_id, unit_id)
    }

    fn list_for_account(
        &self,
        tenant_id: TenantId,
        account_id: &ExternalAccountId,
    ) -> Vec<ListingRecord> {
        (**self).list_for_account(tenant_id, account_id)
    }
}

/// In-memory listing store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryListingStore {
    records: RwLock<HashMap<ListingRecordId, ListingRecord>>,
}

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl ListingStore for InMemoryListingStore {
    fn insert(&self, record: ListingRecord) {
        self.records.write().unwrap().insert(*record.id(), record);
    }

    fn find_by_unit(
        &self,
        tenant_id: TenantId,
        unit_id: &InventoryUnitId,
    ) -> Option<ListingRecord> {
        let map = self.records.read().unwrap();
        map.values()
            .find(|r| r.tenant_id() == tenant_id && r.unit_id() == *unit_id)
            .cloned()
    }

    fn remove_by_unit(&self, tenant_id: TenantId, unit_id: &InventoryUnitId) -> bool {
        let mut map = self.records.write().unwrap();
        let id = map
            .values()
            .find(|r| r.tenant_id() == tenant_id && r.unit_id() == *unit_id)
            .map(|r| *r.id());
        match id {
            Some(id) => {
                map.remove(&id);
                true
            }
            None => false,
        }
    }

    fn list_for_account(
        &self,
        tenant_id: TenantId,
        account_id: &ExternalAccountId,
    ) -> Vec<ListingRecord> {
        let map = self.records.read().unwrap();
        let mut records: Vec<_> = map
            .values()
            .filter(|r| r.tenant_id() == tenant_id && r.account_id() == *account_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| std::cmp::Reverse(r.created_at()));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tenant_id: TenantId, account_id: ExternalAccountId) -> ListingRecord {
        ListingRecord::new(
            ListingRecordId::new(EntityId::new()),
            tenant_id,
            account_id,
            InventoryUnitId::new(EntityId::new()),
            "offer-1",
            "listing-1",
        )
    }

    #[test]
    fn find_and_remove_are_tenant_scoped() {
        let store = InMemoryListingStore::new();
        let tenant = TenantId::new();
        let account = ExternalAccountId::new(EntityId::new());

        let rec = record(tenant, account);
        let unit_id = rec.unit_id();
        store.insert(rec);

        assert!(store.find_by_unit(TenantId::new(), &unit_id).is_none());
        assert!(!store.remove_by_unit(TenantId::new(), &unit_id));

        assert!(store.find_by_unit(tenant, &unit_id).is_some());
        assert!(store.remove_by_unit(tenant, &unit_id));
        assert!(store.find_by_unit(tenant, &unit_id).is_none());
    }

    #[test]
    fn listings_for_account_exclude_other_accounts() {
        let store = InMemoryListingStore::new();
        let tenant = TenantId::new();
        let a = ExternalAccountId::new(EntityId::new());
        let b = ExternalAccountId::new(EntityId::new());

        store.insert(record(tenant, a));
        store.insert(record(tenant, a));
        store.insert(record(tenant, b));

        assert_eq!(store.list_for_account(tenant, &a).len(), 2);
        assert_eq!(store.list_for_account(tenant, &b).len(), 1);
    }
}
