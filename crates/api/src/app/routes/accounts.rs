//! Marketplace connection management.

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Extension, Json, Router, extract::Path};
use uuid::Uuid;

use marketsync_core::EntityId;
use marketsync_orders::{
    AccountStore, AccountStoreError, Credentials, ExternalAccount, ExternalAccountId,
};

use crate::app::dto::{
    AccountResponse, ConnectAccountRequest, RotateCredentialsRequest, tenant_from_headers,
};
use crate::app::errors::{json_error, parse_marketplace_kind};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(connect))
        .route("/:account_id/credentials", post(rotate_credentials))
}

pub async fn connect(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(req): Json<ConnectAccountRequest>,
) -> axum::response::Response {
    let tenant_id = match tenant_from_headers(&headers) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let kind = match parse_marketplace_kind(&req.kind) {
        Ok(k) => k,
        Err(resp) => return resp,
    };

    let account = ExternalAccount::new(
        ExternalAccountId::new(EntityId::new()),
        tenant_id,
        kind,
        req.domain,
        Credentials::new(req.access_token),
    );
    let response = AccountResponse::from(&account);

    match services.accounts.insert(account) {
        Ok(()) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e @ AccountStoreError::AlreadyConnected) => {
            json_error(StatusCode::CONFLICT, "already_connected", e.to_string())
        }
        Err(e @ AccountStoreError::DomainTaken(_)) => {
            json_error(StatusCode::CONFLICT, "domain_taken", e.to_string())
        }
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string()),
    }
}

pub async fn rotate_credentials(
    Extension(services): Extension<Arc<AppServices>>,
    Path(account_id): Path<Uuid>,
    Json(req): Json<RotateCredentialsRequest>,
) -> axum::response::Response {
    let id = ExternalAccountId::new(EntityId::from(account_id));

    match services
        .accounts
        .rotate_credentials(&id, Credentials::new(req.access_token))
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e @ AccountStoreError::NotFound(_)) => {
            json_error(StatusCode::NOT_FOUND, "account_not_found", e.to_string())
        }
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string()),
    }
}
