//! Black-box tests: HTTP in, store state out.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use marketsync_api::app::{build_app, services};
use marketsync_core::{Entity, EntityId, TenantId};
use marketsync_ingest::JobStore;
use marketsync_ledger::{
    InventoryUnit, InventoryUnitId, UnitStatus, UnitStore, Variant, VariantId, VariantStore,
};
use marketsync_orders::{
    AccountStore, Credentials, ExternalAccount, ExternalAccountId, MarketplaceKind, OrderKey,
    OrderStore,
};

struct TestApp {
    app: Router,
    services: Arc<services::AppServices>,
    tenant_id: TenantId,
    account_id: ExternalAccountId,
}

fn test_app(kind: MarketplaceKind) -> TestApp {
    let services = Arc::new(services::build_services());
    let app = build_app(services.clone());

    let tenant_id = TenantId::new();
    let account_id = ExternalAccountId::new(EntityId::new());
    services
        .accounts
        .insert(ExternalAccount::new(
            account_id,
            tenant_id,
            kind,
            "shop-1",
            Credentials::new("tok"),
        ))
        .unwrap();

    TestApp {
        app,
        services,
        tenant_id,
        account_id,
    }
}

impl TestApp {
    fn seed_unit(&self, sku: &str) -> InventoryUnitId {
        let variant_id = VariantId::new(EntityId::new());
        self.services
            .variants
            .insert(Variant::new(
                variant_id,
                self.tenant_id,
                sku,
                "Widget",
                25.0,
                Utc::now(),
            ))
            .unwrap();

        let unit_id = InventoryUnitId::new(EntityId::new());
        self.services
            .units
            .insert(InventoryUnit::new(
                unit_id,
                self.tenant_id,
                variant_id,
                "SER-1",
                Utc::now(),
            ))
            .unwrap();
        unit_id
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-tenant-id", self.tenant_id.to_string())
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn drain_jobs(&self) -> usize {
        self.services.runner.run_pending(None)
    }
}

fn order_webhook(external_id: u64, sku: &str) -> Value {
    json!({
        "topic": "orders/create",
        "domain": "shop-1",
        "payload": {
            "id": external_id,
            "currency": "USD",
            "total_price": "49.99",
            "line_items": [{"id": 1, "sku": sku, "quantity": 1, "price": "49.99"}],
        },
    })
}

#[tokio::test]
async fn health_answers_ok() {
    let t = test_app(MarketplaceKind::Storefront);
    let (status, _) = t
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_order_webhook_converges_on_one_reserved_unit() {
    let t = test_app(MarketplaceKind::Storefront);
    let unit_id = t.seed_unit("ABC");

    for _ in 0..2 {
        let (status, body) = t.post_json("/webhooks", order_webhook(1001, "ABC")).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "accepted");
    }
    assert_eq!(t.drain_jobs(), 2);

    let order = t
        .services
        .orders
        .find(&OrderKey::new(t.account_id, "1001"))
        .unwrap();
    assert_eq!(t.services.orders.order_count(), 1);

    let items = t.services.orders.line_items(order.id());
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].unit_id(), Some(unit_id));
    assert_eq!(
        t.services.units.get(t.tenant_id, &unit_id).unwrap().status(),
        UnitStatus::Reserved
    );
}

#[tokio::test]
async fn webhook_from_unknown_shop_is_acknowledged_and_ignored() {
    let t = test_app(MarketplaceKind::Storefront);

    let (status, body) = t
        .post_json(
            "/webhooks",
            json!({"topic": "orders/create", "domain": "shop-9", "payload": {"id": 1}}),
        )
        .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "ignored");
    assert_eq!(body["reason"], "unknown_account");
    assert_eq!(t.drain_jobs(), 0);
}

#[tokio::test]
async fn unhandled_topic_is_acknowledged_and_ignored() {
    let t = test_app(MarketplaceKind::Storefront);

    let (status, body) = t
        .post_json(
            "/webhooks",
            json!({"topic": "customers/create", "domain": "shop-1", "payload": {}}),
        )
        .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["reason"], "unknown_topic");
}

#[tokio::test]
async fn invalid_order_payload_dead_letters_without_partial_state() {
    let t = test_app(MarketplaceKind::Storefront);
    t.seed_unit("ABC");

    let (status, _) = t
        .post_json(
            "/webhooks",
            json!({
                "topic": "orders/create",
                "domain": "shop-1",
                "payload": {"id": 1001, "total_price": "-5.00"},
            }),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(t.drain_jobs(), 1);

    assert_eq!(t.services.orders.order_count(), 0);
    let dead = t
        .services
        .jobs
        .list_dead_letters(t.tenant_id, 10)
        .unwrap();
    assert_eq!(dead.len(), 1);
}

#[tokio::test]
async fn inventory_level_webhook_is_routed_and_completes() {
    let t = test_app(MarketplaceKind::Storefront);

    let (status, body) = t
        .post_json(
            "/webhooks",
            json!({"topic": "inventory_levels/update", "domain": "shop-1", "payload": {}}),
        )
        .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "accepted");
    assert_eq!(t.drain_jobs(), 1);
    assert!(t
        .services
        .jobs
        .list_dead_letters(t.tenant_id, 10)
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn listing_publish_list_unpublish_round_trip() {
    let t = test_app(MarketplaceKind::AuctionMarketplace);
    let unit_id = t.seed_unit("ABC");
    let uri = format!("/listings/units/{unit_id}");

    let (status, body) = t.post_json(&uri, json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "draft");
    assert!(!body["listing_id"].as_str().unwrap().is_empty());

    let (status, listed) = t
        .send(
            Request::get(format!("/listings/accounts/{}", t.account_id))
                .header("x-tenant-id", t.tenant_id.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = t
        .send(
            Request::delete(uri.as_str())
                .header("x-tenant-id", t.tenant_id.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn publish_without_connection_is_unprocessable() {
    let t = test_app(MarketplaceKind::Storefront);
    let unit_id = t.seed_unit("ABC");

    let (status, body) = t
        .post_json(&format!("/listings/units/{unit_id}"), json!({}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "not_connected");
}

#[tokio::test]
async fn connect_account_over_http_enables_dispatch() {
    let services = Arc::new(services::build_services());
    let app = build_app(services.clone());
    let tenant_id = TenantId::new();

    let request = Request::post("/accounts")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-tenant-id", tenant_id.to_string())
        .body(Body::from(
            json!({"kind": "storefront", "domain": "shop-2", "access_token": "tok"}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    let account = services.accounts.find_by_domain("shop-2").unwrap();
    assert_eq!(account.tenant_id(), tenant_id);
    assert_eq!(body["id"], account.id().to_string());
}
