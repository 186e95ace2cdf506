//! Webhook ingress.
//!
//! Always answers fast: 202 for accepted *and* deliberately dropped
//! deliveries (so the marketplace stops redelivering noise), 503 only when
//! the job could not be queued and a redelivery is actually wanted.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Extension, Json, Router};
use serde_json::json;

use marketsync_ingest::{DispatchError, DispatchOutcome, DropReason, WebhookEvent};

use crate::app::dto::WebhookRequest;
use crate::app::errors::json_error;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/", post(receive))
}

pub async fn receive(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<WebhookRequest>,
) -> axum::response::Response {
    let event = WebhookEvent::new(req.topic, req.domain, req.payload);

    match services.dispatcher.dispatch(&event) {
        Ok(DispatchOutcome::Enqueued { job_id, kind }) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "accepted",
                "job_id": job_id.to_string(),
                "kind": kind,
            })),
        )
            .into_response(),
        Ok(DispatchOutcome::Dropped(reason)) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "ignored",
                "reason": drop_reason_code(reason),
            })),
        )
            .into_response(),
        Err(e @ DispatchError::Enqueue(_)) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "enqueue_failed", e.to_string())
        }
    }
}

fn drop_reason_code(reason: DropReason) -> &'static str {
    match reason {
        DropReason::UnknownAccount => "unknown_account",
        DropReason::UnknownTopic => "unknown_topic",
    }
}
