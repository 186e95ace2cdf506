use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use marketsync_listings::SyncError;
use marketsync_orders::MarketplaceKind;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn sync_error_to_response(err: SyncError) -> axum::response::Response {
    match err {
        SyncError::NotConnected => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "not_connected", err.to_string())
        }
        SyncError::NothingToDelete => {
            json_error(StatusCode::NOT_FOUND, "nothing_to_delete", err.to_string())
        }
        SyncError::AlreadyListed => {
            json_error(StatusCode::CONFLICT, "already_listed", err.to_string())
        }
        SyncError::UnitNotFound => {
            json_error(StatusCode::NOT_FOUND, "unit_not_found", err.to_string())
        }
        SyncError::Api { message } => {
            json_error(StatusCode::BAD_GATEWAY, "marketplace_error", message)
        }
    }
}

pub fn parse_marketplace_kind(s: &str) -> Result<MarketplaceKind, axum::response::Response> {
    match s.to_lowercase().as_str() {
        "storefront" => Ok(MarketplaceKind::Storefront),
        "auction_marketplace" => Ok(MarketplaceKind::AuctionMarketplace),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_marketplace_kind",
            "kind must be one of: storefront, auction_marketplace",
        )),
    }
}
