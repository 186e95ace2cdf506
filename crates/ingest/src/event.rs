//! Normalized inbound webhook shape and topic routing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::job::JobKind;

/// A marketplace webhook after HTTP unwrapping.
///
/// `domain` is the marketplace-assigned sender identifier (header-sourced at
/// the edge) and is the only routing key back to a tenant; the payload body
/// is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub topic: String,
    pub domain: String,
    pub payload: Value,
}

impl WebhookEvent {
    pub fn new(topic: impl Into<String>, domain: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            domain: domain.into(),
            payload,
        }
    }
}

/// The webhook topics this system consumes.
///
/// Marketplaces emit many more; anything not listed here is dropped at the
/// dispatcher as expected noise.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookTopic {
    OrdersCreate,
    OrdersUpdated,
    InventoryLevelsUpdate,
}

impl WebhookTopic {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "orders/create" => Some(Self::OrdersCreate),
            "orders/updated" => Some(Self::OrdersUpdated),
            "inventory_levels/update" => Some(Self::InventoryLevelsUpdate),
            _ => None,
        }
    }

    /// Which sync job services this topic.
    ///
    /// Create and update share one kind: materialization is an upsert, so
    /// both deliveries take the same path.
    pub fn job_kind(self) -> JobKind {
        match self {
            Self::OrdersCreate | Self::OrdersUpdated => JobKind::OrderSync,
            Self::InventoryLevelsUpdate => JobKind::InventorySync,
        }
    }
}
