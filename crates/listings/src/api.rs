//! The marketplace API seam.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use marketsync_orders::Credentials;

/// The draft listing payload sent to the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub sku: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
}

/// What the marketplace answered: an HTTP-shaped status plus a JSON body.
///
/// Non-2xx responses come back through here too; only failures to get any
/// response at all are [`ApiTransportError`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never completed (connect failure, timeout, broken pipe).
#[derive(Debug, Clone, thiserror::Error)]
#[error("marketplace transport failure: {0}")]
pub struct ApiTransportError(pub String);

/// Calls the remote marketplace on behalf of a connected account.
///
/// Implementations are synchronous from the worker's perspective; timeouts
/// must surface as [`ApiTransportError`], not hang the caller.
pub trait MarketplaceApi: Send + Sync {
    /// Create an unpublished draft listing. Success bodies carry the remote
    /// `offer_id` and `listing_id`.
    fn create_draft(
        &self,
        credentials: &Credentials,
        draft: &ListingDraft,
    ) -> Result<ApiResponse, ApiTransportError>;

    /// Remove the listing for a SKU.
    fn remove_listing(
        &self,
        credentials: &Credentials,
        sku: &str,
    ) -> Result<ApiResponse, ApiTransportError>;
}

impl<A> MarketplaceApi for Arc<A>
where
    A: MarketplaceApi + ?Sized,
{
    fn create_draft(
        &self,
        credentials: &Credentials,
        draft: &ListingDraft,
    ) -> Result<ApiResponse, ApiTransportError> {
        (**self).create_draft(credentials, draft)
    }

    fn remove_listing(
        &self,
        credentials: &Credentials,
        sku: &str,
    ) -> Result<ApiResponse, ApiTransportError> {
        (**self).remove_listing(credentials, sku)
    }
}

/// Always-accepting marketplace stand-in for dev wiring and tests.
///
/// Assigns sequential offer/listing ids and remembers which SKUs are listed
/// so `remove_listing` can answer 404 for unknown ones.
#[derive(Debug, Default)]
pub struct InMemoryMarketplaceApi {
    listed: Mutex<Vec<String>>,
    next_id: Mutex<u64>,
}

impl InMemoryMarketplaceApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn listed_skus(&self) -> Vec<String> {
        self.listed.lock().unwrap().clone()
    }
}

impl MarketplaceApi for InMemoryMarketplaceApi {
    fn create_draft(
        &self,
        _credentials: &Credentials,
        draft: &ListingDraft,
    ) -> Result<ApiResponse, ApiTransportError> {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let id = *next;
        self.listed.lock().unwrap().push(draft.sku.clone());

        Ok(ApiResponse::new(
            201,
            json!({
                "offer_id": format!("offer-{id}"),
                "listing_id": format!("listing-{id}"),
            }),
        ))
    }

    fn remove_listing(
        &self,
        _credentials: &Credentials,
        sku: &str,
    ) -> Result<ApiResponse, ApiTransportError> {
        let mut listed = self.listed.lock().unwrap();
        match listed.iter().position(|s| s == sku) {
            Some(idx) => {
                listed.remove(idx);
                Ok(ApiResponse::new(200, json!({"deleted": sku})))
            }
            None => Ok(ApiResponse::new(404, json!({"error": "not listed"}))),
        }
    }
}
