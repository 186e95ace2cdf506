//! Request/response DTOs and mapping helpers.

use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use marketsync_core::{Entity, TenantId};
use marketsync_listings::{ListingRecord, ListingStatus};
use marketsync_orders::{ExternalAccount, MarketplaceKind};

use super::errors::json_error;

/// Inbound webhook, normalized by the edge proxy into a JSON envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub topic: String,
    pub domain: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
pub struct ConnectAccountRequest {
    pub kind: String,
    pub domain: String,
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RotateCredentialsRequest {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: String,
    pub tenant_id: String,
    pub kind: MarketplaceKind,
    pub domain: String,
}

impl From<&ExternalAccount> for AccountResponse {
    fn from(account: &ExternalAccount) -> Self {
        Self {
            id: account.id().to_string(),
            tenant_id: account.tenant_id().to_string(),
            kind: account.kind(),
            domain: account.domain().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub id: String,
    pub account_id: String,
    pub unit_id: String,
    pub offer_id: String,
    pub listing_id: String,
    pub status: ListingStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&ListingRecord> for ListingResponse {
    fn from(record: &ListingRecord) -> Self {
        Self {
            id: record.id().to_string(),
            account_id: record.account_id().to_string(),
            unit_id: record.unit_id().to_string(),
            offer_id: record.offer_id().to_string(),
            listing_id: record.listing_id().to_string(),
            status: record.status(),
            created_at: record.created_at(),
        }
    }
}

/// Tenant scoping comes from the `x-tenant-id` header (auth happens upstream;
/// by the time a request reaches this service the tenant is established).
pub fn tenant_from_headers(headers: &HeaderMap) -> Result<TenantId, axum::response::Response> {
    headers
        .get("x-tenant-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<TenantId>().ok())
        .ok_or_else(|| {
            json_error(
                StatusCode::BAD_REQUEST,
                "missing_tenant",
                "x-tenant-id header must carry a tenant uuid",
            )
        })
}
