//! Listing publish/unpublish and operator visibility.

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router, extract::Path};
use uuid::Uuid;

use marketsync_core::{EntityId, OpContext};
use marketsync_ledger::InventoryUnitId;
use marketsync_listings::ListingStore;
use marketsync_orders::ExternalAccountId;

use crate::app::dto::{ListingResponse, tenant_from_headers};
use crate::app::errors::sync_error_to_response;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route(
            "/units/:unit_id",
            post(publish).delete(unpublish),
        )
        .route("/accounts/:account_id", get(for_account))
}

pub async fn publish(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Path(unit_id): Path<Uuid>,
) -> axum::response::Response {
    let tenant_id = match tenant_from_headers(&headers) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let ctx = OpContext::system(tenant_id);
    let unit_id = InventoryUnitId::new(EntityId::from(unit_id));

    match services.synchronizer.publish(&ctx, &unit_id) {
        Ok(record) => {
            (StatusCode::CREATED, Json(ListingResponse::from(&record))).into_response()
        }
        Err(e) => sync_error_to_response(e),
    }
}

pub async fn unpublish(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Path(unit_id): Path<Uuid>,
) -> axum::response::Response {
    let tenant_id = match tenant_from_headers(&headers) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let ctx = OpContext::system(tenant_id);
    let unit_id = InventoryUnitId::new(EntityId::from(unit_id));

    match services.synchronizer.unpublish(&ctx, &unit_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => sync_error_to_response(e),
    }
}

pub async fn for_account(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Path(account_id): Path<Uuid>,
) -> axum::response::Response {
    let tenant_id = match tenant_from_headers(&headers) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let account_id = ExternalAccountId::new(EntityId::from(account_id));

    let listings: Vec<ListingResponse> = services
        .listings
        .list_for_account(tenant_id, &account_id)
        .iter()
        .map(ListingResponse::from)
        .collect();
    Json(listings).into_response()
}
