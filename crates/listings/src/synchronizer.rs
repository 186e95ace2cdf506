//! Publish/unpublish inventory units as marketplace listings.

use serde_json::Value;
use tracing::{info, warn};

use marketsync_core::{Entity, EntityId, OpContext};
use marketsync_ledger::{InventoryUnitId, UnitStore, Variant, VariantStore};
use marketsync_orders::{AccountStore, ExternalAccount, MarketplaceKind};

use crate::api::{ApiResponse, ListingDraft, MarketplaceApi};
use crate::record::{ListingRecord, ListingRecordId, ListingStore};

/// Why a publish or unpublish did not happen.
///
/// All remote trouble, whether the marketplace answered with an error status
/// or the request never completed, converges on [`SyncError::Api`]. Callers
/// get a message to show and retry, never a transport fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The tenant has no auction-marketplace connection.
    #[error("no marketplace account connected")]
    NotConnected,
    /// Unpublish asked for a unit that is not listed.
    #[error("unit is not listed, nothing to delete")]
    NothingToDelete,
    /// Publish asked for a unit that is already listed.
    #[error("unit is already listed")]
    AlreadyListed,
    /// The unit id does not exist in the ledger.
    #[error("inventory unit not found")]
    UnitNotFound,
    /// The marketplace rejected the call or was unreachable.
    #[error("marketplace error: {message}")]
    Api { message: String },
}

impl SyncError {
    fn from_response(response: &ApiResponse) -> Self {
        SyncError::Api {
            message: format!("status {}: {}", response.status, response.body),
        }
    }
}

/// Mirrors inventory units onto the tenant's auction marketplace.
#[derive(Debug, Clone)]
pub struct Synchronizer<A, V, U, L, M> {
    accounts: A,
    variants: V,
    units: U,
    listings: L,
    api: M,
}

impl<A, V, U, L, M> Synchronizer<A, V, U, L, M>
where
    A: AccountStore,
    V: VariantStore,
    U: UnitStore,
    L: ListingStore,
    M: MarketplaceApi,
{
    pub fn new(accounts: A, variants: V, units: U, listings: L, api: M) -> Self {
        Self {
            accounts,
            variants,
            units,
            listings,
            api,
        }
    }

    /// Create a draft listing for an inventory unit.
    ///
    /// The local [`ListingRecord`] is written only after the marketplace
    /// accepted the draft; a rejected or failed call persists nothing.
    pub fn publish(&self, ctx: &OpContext, unit_id: &InventoryUnitId) -> Result<ListingRecord, SyncError> {
        let tenant_id = ctx.tenant_id();
        let account = self.connected_account(ctx)?;

        let unit = self
            .units
            .get(tenant_id, unit_id)
            .ok_or(SyncError::UnitNotFound)?;
        if self.listings.find_by_unit(tenant_id, unit_id).is_some() {
            return Err(SyncError::AlreadyListed);
        }

        let variant = self
            .variants
            .get(tenant_id, &unit.variant_id())
            .ok_or(SyncError::UnitNotFound)?;
        let draft = build_draft(&variant);

        let response = self
            .api
            .create_draft(account.credentials(), &draft)
            .map_err(|e| {
                warn!(%tenant_id, unit_id = %unit_id, error = %e, "draft creation failed in transit");
                SyncError::Api {
                    message: e.to_string(),
                }
            })?;

        if !response.is_success() {
            warn!(
                %tenant_id,
                unit_id = %unit_id,
                status = response.status,
                "marketplace rejected draft"
            );
            return Err(SyncError::from_response(&response));
        }

        let offer_id = body_id(&response.body, "offer_id");
        let listing_id = body_id(&response.body, "listing_id");

        let record = ListingRecord::new(
            ListingRecordId::new(EntityId::new()),
            tenant_id,
            *account.id(),
            *unit_id,
            offer_id,
            listing_id,
        );
        self.listings.insert(record.clone());

        info!(
            %tenant_id,
            unit_id = %unit_id,
            sku = draft.sku,
            listing_id = record.listing_id(),
            "unit listed as draft"
        );
        Ok(record)
    }

    /// Remove the listing for an inventory unit.
    ///
    /// The local record survives a failed remote delete, so the mirror keeps
    /// claiming the listing until the marketplace confirms it is gone.
    pub fn unpublish(&self, ctx: &OpContext, unit_id: &InventoryUnitId) -> Result<(), SyncError> {
        let tenant_id = ctx.tenant_id();

        let record = self
            .listings
            .find_by_unit(tenant_id, unit_id)
            .ok_or(SyncError::NothingToDelete)?;
        let account = self.connected_account(ctx)?;

        let unit = self
            .units
            .get(tenant_id, unit_id)
            .ok_or(SyncError::UnitNotFound)?;
        let variant = self
            .variants
            .get(tenant_id, &unit.variant_id())
            .ok_or(SyncError::UnitNotFound)?;

        let response = self
            .api
            .remove_listing(account.credentials(), variant.sku())
            .map_err(|e| SyncError::Api {
                message: e.to_string(),
            })?;

        if !response.is_success() {
            warn!(
                %tenant_id,
                unit_id = %unit_id,
                status = response.status,
                "marketplace refused to remove listing, keeping local record"
            );
            return Err(SyncError::from_response(&response));
        }

        self.listings.remove_by_unit(tenant_id, unit_id);
        info!(
            %tenant_id,
            unit_id = %unit_id,
            listing_id = record.listing_id(),
            "listing removed"
        );
        Ok(())
    }

    fn connected_account(&self, ctx: &OpContext) -> Result<ExternalAccount, SyncError> {
        self.accounts
            .find_for_tenant(ctx.tenant_id(), MarketplaceKind::AuctionMarketplace)
            .ok_or(SyncError::NotConnected)
    }
}

fn build_draft(variant: &Variant) -> ListingDraft {
    ListingDraft {
        sku: variant.sku().to_string(),
        title: variant.product_name().to_string(),
        // Sparse catalogs are common; fall back to the product name.
        description: variant
            .description()
            .unwrap_or(variant.product_name())
            .to_string(),
        price: variant.price(),
        currency: "USD".to_string(),
    }
}

/// Remote ids arrive as strings or numbers depending on the endpoint version.
fn body_id(body: &Value, key: &str) -> String {
    match body.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
